//! Child process plumbing behind the public runners

use std::io::{self, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::{Repair, RunOptions};
use crate::domain::{DaneelError, Output, Result};

/// What to run and how to present it.
pub(crate) struct Invocation<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    /// Name used in logs and errors
    pub label: String,
    /// Mirror the child's output on our own stdout/stderr as it arrives
    pub echo: bool,
    /// Reported in the `NotFound` error when `program` cannot be spawned
    pub missing: &'static str,
}

const CHUNK_SIZE: usize = 4096;

enum Attempt {
    Exited { status: ExitStatus, output: Output },
    TimedOut { output: Output },
}

/// Run `invocation` until it succeeds, repairing between attempts.
pub(crate) async fn run_with_retries(
    invocation: &Invocation<'_>,
    options: &RunOptions,
    repair: &mut dyn Repair,
) -> Result<Output> {
    let cwd = options.working_dir();
    let attempts = options.retries.saturating_add(1);
    let mut attempt = 0;

    loop {
        let (output, timed_out) = match run_once(invocation, &cwd, options.timeout).await? {
            Attempt::Exited { status, output } if status.success() => {
                debug!("'{}' succeeded on attempt {}", invocation.label, attempt + 1);
                return Ok(output);
            }
            Attempt::Exited { status, output } => {
                warn!(
                    "'{}' failed on attempt {}/{}: {}",
                    invocation.label,
                    attempt + 1,
                    attempts,
                    status
                );
                (output, false)
            }
            Attempt::TimedOut { output } => {
                warn!(
                    "'{}' timed out on attempt {}/{}",
                    invocation.label,
                    attempt + 1,
                    attempts
                );
                (output, true)
            }
        };

        if attempt + 1 >= attempts {
            return Err(if timed_out {
                DaneelError::Timeout {
                    command: invocation.label.clone(),
                    timeout: options.timeout,
                }
            } else {
                DaneelError::CommandFailed {
                    command: invocation.label.clone(),
                    attempts,
                    output: Box::new(output),
                }
            });
        }

        let repaired = repair.repair(&output).await?;
        debug!(
            "Repair after attempt {} produced {} bytes of output",
            attempt + 1,
            repaired.stdout().len() + repaired.stderr().len()
        );

        tokio::time::sleep(options.backoff_for(attempt)).await;
        attempt += 1;
    }
}

async fn run_once(invocation: &Invocation<'_>, cwd: &Path, timeout: Duration) -> Result<Attempt> {
    let mut child = Command::new(invocation.program)
        .args(&invocation.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DaneelError::not_found(invocation.missing, invocation.program),
            _ => DaneelError::Io(e),
        })?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let collected = tokio::time::timeout(
        timeout,
        collect(&mut child, &mut stdout, &mut stderr, invocation.echo),
    )
    .await;

    match collected {
        Ok(status) => Ok(Attempt::Exited {
            status: status?,
            output: captured(&stdout, &stderr),
        }),
        Err(_) => {
            child.kill().await?;
            Ok(Attempt::TimedOut {
                output: captured(&stdout, &stderr),
            })
        }
    }
}

fn captured(stdout: &[u8], stderr: &[u8]) -> Output {
    Output::new(
        String::from_utf8_lossy(stdout).into_owned(),
        String::from_utf8_lossy(stderr).into_owned(),
    )
}

/// Read both pipes to the end, then reap the child.
///
/// Bytes are kept exactly as the child wrote them; decoding happens once the
/// streams are complete so multi-byte characters split across reads survive.
async fn collect(
    child: &mut Child,
    stdout: &mut Vec<u8>,
    stderr: &mut Vec<u8>,
    echo: bool,
) -> Result<ExitStatus> {
    let mut out_pipe = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;
    let mut err_pipe = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("child stderr was not captured"))?;

    let mut out_buf = [0u8; CHUNK_SIZE];
    let mut err_buf = [0u8; CHUNK_SIZE];
    let (mut out_done, mut err_done) = (false, false);

    while !(out_done && err_done) {
        tokio::select! {
            read = out_pipe.read(&mut out_buf), if !out_done => match read? {
                0 => out_done = true,
                n => append_chunk(stdout, &out_buf[..n], echo.then(io::stdout)),
            },
            read = err_pipe.read(&mut err_buf), if !err_done => match read? {
                0 => err_done = true,
                n => append_chunk(stderr, &err_buf[..n], echo.then(io::stderr)),
            },
        }
    }

    Ok(child.wait().await?)
}

fn append_chunk(captured: &mut Vec<u8>, chunk: &[u8], echo: Option<impl Write>) {
    if let Some(mut stream) = echo {
        let _ = stream.write_all(chunk);
        let _ = stream.flush();
    }
    captured.extend_from_slice(chunk);
}
