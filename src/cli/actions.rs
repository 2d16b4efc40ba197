//! Actions command implementation

use anyhow::Result;
use std::path::Path;

use daneel::action::ActionDiscovery;
use daneel::config::Config;
use daneel::workflow::WorkflowRegistry;

/// List relay actions and built-in workflows
pub fn actions_command(work_dir: &Path) -> Result<()> {
    let config = Config::load(work_dir)?;
    let discovery = ActionDiscovery::new(work_dir, &config);
    let actions = discovery.discover();

    if actions.is_empty() {
        println!("No actions available.");
    } else {
        println!("Available actions:");
        for (i, name) in actions.names().enumerate() {
            println!("{}. {}", i + 1, name);
        }
    }

    let sources = discovery.existing_sources();
    if !sources.is_empty() {
        println!("\nSearched:");
        for dir in sources {
            println!("  {}", dir.display());
        }
    }

    println!("\nWorkflows (daneel run <name>):");
    for workflow in WorkflowRegistry::with_defaults().iter() {
        println!("  {:<12} {}", workflow.name(), workflow.description());
    }

    Ok(())
}
