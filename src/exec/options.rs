//! Knobs of the command runners

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{AssistantSettings, ValidateSettings};
use crate::git::find_git_root;

/// Timeout, retry and location settings shared by both runners.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Deadline of a single attempt
    pub timeout: Duration,
    /// Attempts after the first one
    pub retries: u32,
    /// Working directory; the git root (or the current directory) if unset
    pub cwd: Option<PathBuf>,
    /// Delay before the first retry, doubled for each one after
    pub backoff: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retries: 3,
            cwd: None,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RunOptions {
    pub fn from_validate_settings(settings: &ValidateSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            retries: settings.retries,
            cwd: None,
            backoff: Duration::from_millis(settings.backoff_ms),
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Directory the command runs in.
    pub fn working_dir(&self) -> PathBuf {
        if let Some(cwd) = &self.cwd {
            return cwd.clone();
        }
        let current = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        find_git_root(&current).unwrap_or(current)
    }

    /// Backoff before retry number `attempt + 1` (0-based attempt).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Options of [`claude_code`](super::claude_code).
#[derive(Debug, Clone)]
pub struct AssistantOptions {
    /// Executable to run
    pub binary: String,
    /// Ask for JSON output and parse it
    pub structured: bool,
    pub run: RunOptions,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            structured: false,
            run: RunOptions {
                timeout: Duration::from_secs(600),
                ..RunOptions::default()
            },
        }
    }
}

impl AssistantOptions {
    pub fn from_settings(settings: &AssistantSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            structured: false,
            run: RunOptions {
                timeout: Duration::from_secs(settings.timeout_secs),
                retries: settings.retries,
                cwd: None,
                backoff: Duration::from_millis(settings.backoff_ms),
            },
        }
    }

    /// Command-line arguments for a non-interactive run with `prompt`.
    pub fn args(&self, prompt: &str) -> Vec<String> {
        let mut args = vec!["-p".to_string(), "--verbose".to_string()];
        if self.structured {
            args.push("--output-format".to_string());
            args.push("json".to_string());
        }
        args.push(prompt.to_string());
        args
    }
}
