//! Settings sections of `daneel.toml`

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Interactive relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Key that opens the action menu (`"ctrl-a"`, `"^A"`, or a single character)
    #[serde(default = "default_trigger")]
    pub trigger: String,

    /// How long one readiness poll waits before re-checking the child
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on bytes read from the child per readiness event
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Coding-assistant invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSettings {
    /// Assistant executable
    #[serde(default = "default_assistant_binary")]
    pub binary: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_assistant_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Base delay of the exponential backoff, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

/// Validation command settings used by workflows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateSettings {
    /// Shell command whose success means the work is done
    #[serde(default = "default_validate_command")]
    pub command: String,

    #[serde(default = "default_validate_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_trigger() -> String {
    "ctrl-a".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_chunk_size() -> usize {
    1000
}

fn default_assistant_binary() -> String {
    "claude".to_string()
}

fn default_assistant_timeout_secs() -> u64 {
    600
}

fn default_validate_command() -> String {
    "./test.sh".to_string()
}

fn default_validate_timeout_secs() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            poll_interval_ms: default_poll_interval_ms(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl RelaySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            binary: default_assistant_binary(),
            timeout_secs: default_assistant_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl Default for ValidateSettings {
    fn default() -> Self {
        Self {
            command: default_validate_command(),
            timeout_secs: default_validate_timeout_secs(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}
