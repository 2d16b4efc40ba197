//! Error taxonomy shared by the library operations.

use std::path::PathBuf;
use std::time::Duration;

use super::output::Output;

/// Convenience alias used by every library operation.
pub type Result<T, E = DaneelError> = std::result::Result<T, E>;

/// Errors surfaced by daneel operations.
///
/// Only the retry loops recover locally; everything else is returned to the
/// caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum DaneelError {
    /// A file, directory or executable does not exist.
    #[error("{what} not found: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// A document could not be parsed.
    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// A field address such as `a.b[2].c` is malformed or cannot be applied.
    #[error("Invalid field query '{query}': {reason}")]
    PathQuery { query: String, reason: String },

    /// A command kept failing after every retry.
    #[error("Command failed after {attempts} attempts: {command}")]
    CommandFailed {
        command: String,
        attempts: u32,
        output: Box<Output>,
    },

    /// The final attempt of a command ran past its deadline.
    #[error("Command '{command}' timed out after {} seconds", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },

    /// Output that should have been structured was not.
    #[error("Failed to parse JSON output: {message}")]
    Decode { message: String, stdout: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DaneelError {
    pub(crate) fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    pub(crate) fn path_query(query: &str, reason: impl Into<String>) -> Self {
        Self::PathQuery {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    /// The captured output of the last failed attempt, if any.
    pub fn output(&self) -> Option<&Output> {
        match self {
            Self::CommandFailed { output, .. } => Some(output),
            _ => None,
        }
    }
}
