//! Running commands with a retry and repair loop
//!
//! [`validate`] runs a shell command, [`claude_code`] runs the coding
//! assistant. Both retry a failing command, handing the failure's output to
//! a [`Repair`] hook before each new attempt.

mod options;
mod runner;

pub use options::{AssistantOptions, RunOptions};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Output, Result};
use runner::{run_with_retries, Invocation};

/// Hook invoked with a failed attempt's output before the next attempt.
///
/// The returned output is logged and otherwise unused; an error aborts the
/// retry loop and is returned to the caller.
#[async_trait]
pub trait Repair: Send {
    async fn repair(&mut self, failure: &Output) -> Result<Output>;
}

/// A repair hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepair;

#[async_trait]
impl Repair for NoRepair {
    async fn repair(&mut self, _failure: &Output) -> Result<Output> {
        Ok(Output::default())
    }
}

/// Run `command` through `sh -c` until it exits successfully.
///
/// Returns the output of the successful attempt.
pub async fn validate(
    command: &str,
    repair: &mut dyn Repair,
    options: &RunOptions,
) -> Result<Output> {
    debug!("Validating with '{}'", command);
    let invocation = Invocation {
        program: "sh",
        args: vec!["-c".to_string(), command.to_string()],
        label: command.to_string(),
        echo: false,
        missing: "Shell",
    };
    run_with_retries(&invocation, options, repair).await
}

/// Run the coding assistant non-interactively with `prompt`.
///
/// Its output is streamed to this process's stdout and stderr while it is
/// captured. With `options.structured` the final stdout must be a JSON
/// object, which becomes [`Output::structured`].
pub async fn claude_code(prompt: &str, options: &AssistantOptions) -> Result<Output> {
    let invocation = Invocation {
        program: &options.binary,
        args: options.args(prompt),
        label: options.binary.clone(),
        echo: true,
        missing: "Claude command",
    };
    let output = run_with_retries(&invocation, &options.run, &mut NoRepair).await?;

    if options.structured {
        output.parse_structured()
    } else {
        Ok(output)
    }
}
