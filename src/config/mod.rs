//! Configuration loading and management
//!
//! Settings are read from `~/.daneel/config.toml` and then from
//! `daneel.toml` at the repository root, the latter overriding the former
//! section by section. `DANEEL_ACTIONS` adds one more action directory.

mod io;
mod settings;
mod trigger;

pub use settings::{AssistantSettings, RelaySettings, ValidateSettings};
pub use trigger::parse_trigger;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable naming an extra action discovery directory.
pub const ACTIONS_ENV_VAR: &str = "DANEEL_ACTIONS";

/// Project-level config file name, looked up at the git root.
pub const PROJECT_CONFIG_FILE: &str = "daneel.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Interactive relay settings
    #[serde(default)]
    pub relay: RelaySettings,

    /// Coding-assistant invocation settings
    #[serde(default)]
    pub assistant: AssistantSettings,

    /// Validation command settings used by workflows
    #[serde(default)]
    pub validate: ValidateSettings,

    /// Extra action directories, searched after the built-in sources
    #[serde(default)]
    pub action_dirs: Vec<PathBuf>,
}
