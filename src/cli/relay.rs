//! Relay command implementation

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use daneel::action::ActionDiscovery;
use daneel::config::Config;
use daneel::pty::{run_relay, RelayOptions};

/// Relay `command` with the discovered actions. Returns the child's exit code.
pub fn relay_command(work_dir: &Path, command: &[String]) -> Result<i32> {
    let config = Config::load(work_dir)?;
    let options = RelayOptions::from_settings(&config.relay)
        .context("Invalid [relay] trigger in configuration")?;
    let actions = ActionDiscovery::new(work_dir, &config).discover();
    info!("Relaying {:?} with {} action(s)", command, actions.len());

    let status = run_relay(command, work_dir, &actions, &options)?;
    Ok(i32::try_from(status.exit_code()).unwrap_or(1))
}
