//! TOML action manifests
//!
//! ```toml
//! [[action]]
//! name = "List Files"
//! kind = "send"
//! message = "Listing files in current directory..."
//! input = "ls -la\n"
//!
//! [[action]]
//! name = "Branch"
//! kind = "shell"
//! command = "git branch --show-current"
//! forward_output = true
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Action;
use crate::pty::ProcessHandle;

/// One manifest file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionManifest {
    #[serde(default, rename = "action")]
    pub actions: Vec<ActionSpec>,
}

/// A declared action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,

    /// Printed before the action runs
    #[serde(default)]
    pub message: Option<String>,

    #[serde(flatten)]
    pub kind: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    /// Type `input` into the child, optionally waiting for `expect` to
    /// show up in its output.
    Send {
        input: String,
        #[serde(default)]
        expect: Option<String>,
        #[serde(default = "default_expect_timeout_secs")]
        timeout_secs: u64,
    },
    /// Run a shell command on the host. With `forward_output` its stdout is
    /// typed into the child instead of shown.
    Shell {
        command: String,
        #[serde(default)]
        forward_output: bool,
    },
}

fn default_expect_timeout_secs() -> u64 {
    30
}

/// Parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<ActionManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read action manifest: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse action manifest: {}", path.display()))
}

/// An action backed by a manifest entry.
#[derive(Debug, Clone)]
pub struct ManifestAction {
    spec: ActionSpec,
    source: PathBuf,
}

impl ManifestAction {
    pub fn new(spec: ActionSpec, source: impl Into<PathBuf>) -> Result<Self> {
        if spec.name.trim().is_empty() {
            bail!("Action has an empty name");
        }
        match &spec.kind {
            ActionKind::Send { input, .. } if input.is_empty() => {
                bail!("Action '{}' has nothing to send", spec.name)
            }
            ActionKind::Shell { command, .. } if command.trim().is_empty() => {
                bail!("Action '{}' has an empty command", spec.name)
            }
            _ => {}
        }
        Ok(Self {
            spec,
            source: source.into(),
        })
    }

    pub fn spec(&self) -> &ActionSpec {
        &self.spec
    }

    /// Manifest file this action was declared in.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Action for ManifestAction {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn execute(&self, process: &mut dyn ProcessHandle) -> Result<()> {
        if let Some(message) = &self.spec.message {
            println!("{}", message);
        }

        match &self.spec.kind {
            ActionKind::Send {
                input,
                expect,
                timeout_secs,
            } => {
                process.send_input(input)?;
                if let Some(expected) = expect {
                    let timeout = Duration::from_secs(*timeout_secs);
                    if !process.wait_for_output(expected, timeout, &mut io::stdout())? {
                        bail!(
                            "'{}' did not appear within {} seconds",
                            expected,
                            timeout_secs
                        );
                    }
                }
            }
            ActionKind::Shell {
                command,
                forward_output,
            } => {
                debug!("Running action command: {}", command);
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command);

                if *forward_output {
                    let output = cmd
                        .output()
                        .with_context(|| format!("Failed to run '{}'", command))?;
                    if !output.status.success() {
                        bail!(
                            "'{}' exited with {}: {}",
                            command,
                            output.status,
                            String::from_utf8_lossy(&output.stderr).trim()
                        );
                    }
                    process.send(&output.stdout)?;
                } else {
                    let status = cmd
                        .status()
                        .with_context(|| format!("Failed to run '{}'", command))?;
                    if !status.success() {
                        bail!("'{}' exited with {}", command, status);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::ReadOutcome;

    #[derive(Default)]
    struct Sink {
        sent: Vec<u8>,
        output: Vec<u8>,
    }

    impl ProcessHandle for Sink {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent.extend_from_slice(data);
            Ok(())
        }
        fn interrupt(&mut self) -> Result<()> {
            Ok(())
        }
        fn send_eof(&mut self) -> Result<()> {
            Ok(())
        }
        fn suspend(&mut self) -> Result<()> {
            Ok(())
        }
        fn is_alive(&mut self) -> bool {
            true
        }
        fn read_output(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<ReadOutcome> {
            if self.output.is_empty() {
                return Ok(ReadOutcome::Eof);
            }
            let n = buf.len().min(self.output.len());
            buf[..n].copy_from_slice(&self.output[..n]);
            self.output.drain(..n);
            Ok(ReadOutcome::Data(n))
        }
    }

    fn parse(text: &str) -> ActionManifest {
        toml::from_str(text).expect("manifest")
    }

    #[test]
    fn parses_both_kinds() {
        let manifest = parse(
            r#"
[[action]]
name = "List Files"
kind = "send"
input = "ls -la\n"

[[action]]
name = "Branch"
kind = "shell"
command = "git branch"
forward_output = true
"#,
        );

        assert_eq!(manifest.actions.len(), 2);
        assert_eq!(
            manifest.actions[0].kind,
            ActionKind::Send {
                input: "ls -la\n".to_string(),
                expect: None,
                timeout_secs: 30,
            }
        );
        assert_eq!(
            manifest.actions[1].kind,
            ActionKind::Shell {
                command: "git branch".to_string(),
                forward_output: true,
            }
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result: Result<ActionManifest, _> = toml::from_str(
            r#"
[[action]]
name = "Bad"
kind = "script"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_send_is_rejected() {
        let spec = ActionSpec {
            name: "Nothing".to_string(),
            message: None,
            kind: ActionKind::Send {
                input: String::new(),
                expect: None,
                timeout_secs: 1,
            },
        };
        assert!(ManifestAction::new(spec, "a.toml").is_err());
    }

    #[test]
    fn send_types_input() {
        let spec = ActionSpec {
            name: "Help".to_string(),
            message: None,
            kind: ActionKind::Send {
                input: "help\n".to_string(),
                expect: None,
                timeout_secs: 1,
            },
        };
        let action = ManifestAction::new(spec, "a.toml").expect("action");
        let mut process = Sink::default();
        action.execute(&mut process).expect("execute");
        assert_eq!(process.sent, b"help\n");
    }

    #[test]
    fn send_fails_when_expected_text_never_shows() {
        let spec = ActionSpec {
            name: "Wait".to_string(),
            message: None,
            kind: ActionKind::Send {
                input: "go\n".to_string(),
                expect: Some("ready".to_string()),
                timeout_secs: 1,
            },
        };
        let action = ManifestAction::new(spec, "a.toml").expect("action");
        let mut process = Sink {
            output: b"still booting".to_vec(),
            ..Default::default()
        };
        assert!(action.execute(&mut process).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn shell_output_is_forwarded() {
        let spec = ActionSpec {
            name: "Echo".to_string(),
            message: None,
            kind: ActionKind::Shell {
                command: "printf hello".to_string(),
                forward_output: true,
            },
        };
        let action = ManifestAction::new(spec, "a.toml").expect("action");
        let mut process = Sink::default();
        action.execute(&mut process).expect("execute");
        assert_eq!(process.sent, b"hello");
    }
}
