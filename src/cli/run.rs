//! Run command implementation

use anyhow::{bail, Result};
use std::path::Path;

use daneel::config::Config;
use daneel::workflow::{WorkflowContext, WorkflowRegistry};

/// Whether a bare `daneel <words...>` invocation names a workflow rather
/// than a command to relay.
pub fn names_workflow(command: &[String]) -> bool {
    WorkflowRegistry::with_defaults()
        .for_invocation(command)
        .is_some()
}

/// Run the built-in workflow `name`.
pub async fn run_command(work_dir: &Path, name: &str) -> Result<()> {
    let registry = WorkflowRegistry::with_defaults();
    let Some(workflow) = registry.get(name) else {
        bail!("{}", registry.not_found_message(name));
    };

    let config = Config::load(work_dir)?;
    let ctx = WorkflowContext::new(work_dir, &config);
    workflow.run(&ctx).await?;

    println!("Workflow '{}' finished.", name);
    Ok(())
}
