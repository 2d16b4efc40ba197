//! The interactive relay loop

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use portable_pty::ExitStatus;
use tracing::debug;

use super::decoder::OutputDecoder;
use super::handle::ProcessHandle;
use super::process::{PtyProcess, TerminalSize};
use super::{DEFAULT_TRIGGER, KEY_EOT, KEY_INTERRUPT, KEY_SUSPEND};
use crate::action::{show_action_menu, ActionRegistry, MenuOutcome};
use crate::config::{parse_trigger, RelaySettings};

/// How a byte typed at the terminal is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    /// Open the action menu
    Trigger,
    /// Ctrl-C: SIGINT to the child
    Interrupt,
    /// Ctrl-D: EOF through the child's terminal
    EndOfTransmission,
    /// Ctrl-Z: SIGTSTP to the child
    Suspend,
    /// Anything else, forwarded verbatim
    Data(u8),
}

impl InputKey {
    /// The trigger takes precedence, so it may be bound to a control key.
    pub fn classify(byte: u8, trigger: u8) -> Self {
        match byte {
            b if b == trigger => Self::Trigger,
            KEY_INTERRUPT => Self::Interrupt,
            KEY_EOT => Self::EndOfTransmission,
            KEY_SUSPEND => Self::Suspend,
            other => Self::Data(other),
        }
    }
}

/// Relay tuning knobs.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub trigger: u8,
    pub poll_interval: Duration,
    pub chunk_size: usize,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            trigger: DEFAULT_TRIGGER,
            poll_interval: Duration::from_millis(100),
            chunk_size: 1000,
        }
    }
}

impl RelayOptions {
    pub fn from_settings(settings: &RelaySettings) -> Result<Self> {
        Ok(Self {
            trigger: parse_trigger(&settings.trigger)?,
            poll_interval: settings.poll_interval(),
            chunk_size: settings.chunk_size.max(1),
        })
    }
}

/// Something that can show the action menu while the relay is paused.
pub trait MenuHost {
    fn open_menu(
        &mut self,
        actions: &ActionRegistry,
        process: &mut dyn ProcessHandle,
    ) -> Result<MenuOutcome>;
}

/// Menu over arbitrary line input and text output.
pub struct StreamMenu<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StreamMenu<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}

impl<R: BufRead, W: Write> MenuHost for StreamMenu<R, W> {
    fn open_menu(
        &mut self,
        actions: &ActionRegistry,
        process: &mut dyn ProcessHandle,
    ) -> Result<MenuOutcome> {
        Ok(show_action_menu(
            actions,
            process,
            &mut self.input,
            &mut self.output,
        )?)
    }
}

/// Per-byte input dispatch of the relay.
pub struct Relay<'a> {
    actions: &'a ActionRegistry,
    trigger: u8,
}

impl<'a> Relay<'a> {
    pub fn new(actions: &'a ActionRegistry, trigger: u8) -> Self {
        Self { actions, trigger }
    }

    /// Handle one byte typed at the terminal. The menu, when opened, runs to
    /// completion before this returns.
    pub fn handle_input(
        &self,
        byte: u8,
        process: &mut dyn ProcessHandle,
        menu: &mut dyn MenuHost,
    ) -> Result<InputKey> {
        let key = InputKey::classify(byte, self.trigger);
        match key {
            InputKey::Trigger => {
                let outcome = menu.open_menu(self.actions, process)?;
                debug!("Action menu closed: {:?}", outcome);
            }
            InputKey::Interrupt => process.interrupt()?,
            InputKey::EndOfTransmission => process.send_eof()?,
            InputKey::Suspend => process.suspend()?,
            InputKey::Data(b) => process.send(&[b])?,
        }
        Ok(key)
    }
}

/// Why a relay loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayEnd {
    ChildExited,
    OutputClosed,
    InputClosed,
}

/// Spawn `command` in a PTY inside `cwd` and relay the controlling terminal
/// to it until it exits. Returns the child's exit status.
///
/// Without a terminal on stdin the relay is a plain pass-through with no
/// key interception.
pub fn run_relay(
    command: &[String],
    cwd: &Path,
    actions: &ActionRegistry,
    options: &RelayOptions,
) -> Result<ExitStatus> {
    let mut process = PtyProcess::spawn(command, cwd, TerminalSize::current())?;
    let interactive = io::stdin().is_terminal();

    #[cfg(unix)]
    let end = if interactive {
        relay_interactive(&mut process, actions, options)?
    } else {
        relay_passthrough(&mut process, io::stdin(), &mut io::stdout())?
    };
    #[cfg(not(unix))]
    let end = {
        let _ = (interactive, actions, options);
        relay_passthrough(&mut process, io::stdin(), &mut io::stdout())?
    };

    debug!("Relay for '{}' ended: {:?}", process.command(), end);
    settle(&mut process, end)
}

/// How long a child that closed its terminal gets to exit on its own.
const EXIT_GRACE: Duration = Duration::from_secs(1);

/// Collect the exit status, killing the child if it outlives the relay.
fn settle(process: &mut PtyProcess, end: RelayEnd) -> Result<ExitStatus> {
    if end != RelayEnd::InputClosed {
        let deadline = Instant::now() + EXIT_GRACE;
        while Instant::now() < deadline {
            if let Some(status) = process.try_wait()? {
                return Ok(status);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
    process.terminate()
}

fn write_output(stdout: &mut impl Write, text: &str) -> io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

/// Run `command` in a PTY with `input` copied to it and its output decoded
/// onto `output`, with no key interception. An end-of-file is sent once
/// `input` runs dry. Returns the child's exit status.
pub fn relay_streams(
    command: &[String],
    cwd: &Path,
    input: impl Read + Send + 'static,
    output: &mut impl Write,
) -> Result<ExitStatus> {
    let mut process = PtyProcess::spawn(command, cwd, TerminalSize::current())?;
    let end = relay_passthrough(&mut process, input, output)?;
    debug!("Relay for '{}' ended: {:?}", process.command(), end);
    settle(&mut process, end)
}

fn relay_passthrough(
    process: &mut PtyProcess,
    mut input: impl Read + Send + 'static,
    output: &mut impl Write,
) -> Result<RelayEnd> {
    if let Some(mut writer) = process.detach_input() {
        std::thread::spawn(move || match io::copy(&mut input, &mut writer) {
            Ok(_) => {
                let _ = writer.write_all(&[KEY_EOT]);
                let _ = writer.flush();
            }
            Err(e) => debug!("Input pass-through stopped: {}", e),
        });
    }

    let mut decoder = OutputDecoder::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = process.read_chunk(&mut buf)?;
        if n == 0 {
            break;
        }
        write_output(output, &decoder.decode(&buf[..n]))?;
    }
    write_output(output, &decoder.finish())?;

    Ok(RelayEnd::OutputClosed)
}

#[cfg(unix)]
use unix_relay::relay_interactive;

#[cfg(unix)]
mod unix_relay {
    use std::io::{self, BufReader, Write};
    use std::os::unix::io::RawFd;

    use anyhow::{Context, Result};
    use tracing::{debug, warn};

    use super::super::terminal::{self, FdReader, RawModeGuard};
    use super::{write_output, MenuHost, Relay, RelayEnd, RelayOptions};
    use crate::action::{show_action_menu, ActionRegistry, MenuOutcome};
    use crate::pty::{OutputDecoder, ProcessHandle, PtyProcess, TerminalSize};

    /// Menu on the controlling terminal: leaves raw mode for the duration.
    struct TerminalMenu<'g> {
        guard: &'g mut RawModeGuard,
        input_fd: RawFd,
    }

    impl MenuHost for TerminalMenu<'_> {
        fn open_menu(
            &mut self,
            actions: &ActionRegistry,
            process: &mut dyn ProcessHandle,
        ) -> Result<MenuOutcome> {
            let mut stdout = io::stdout();
            stdout.flush()?;
            self.guard
                .enter_menu_mode()
                .context("Failed to leave raw mode for the action menu")?;

            let shown = (|| -> Result<MenuOutcome> {
                writeln!(stdout)?;
                let mut input = BufReader::new(FdReader(self.input_fd));
                Ok(show_action_menu(actions, process, &mut input, &mut stdout)?)
            })();

            let resumed = self.guard.resume_raw().context("Failed to re-enter raw mode");
            let outcome = shown?;
            resumed?;
            Ok(outcome)
        }
    }

    pub(super) fn relay_interactive(
        process: &mut PtyProcess,
        actions: &ActionRegistry,
        options: &RelayOptions,
    ) -> Result<RelayEnd> {
        let input_fd = libc::STDIN_FILENO;
        let output_fd = process.output_fd().context("PTY has no file descriptor")?;
        let mut guard = RawModeGuard::enter(input_fd).context("Failed to enter raw mode")?;

        let relay = Relay::new(actions, options.trigger);
        let mut decoder = OutputDecoder::new();
        let mut stdout = io::stdout();
        let mut buf = vec![0u8; options.chunk_size.max(1)];
        let mut size = TerminalSize::current();

        let end = loop {
            if !process.is_alive() {
                break RelayEnd::ChildExited;
            }

            let current = TerminalSize::current();
            if current != size {
                size = current;
                if let Err(e) = process.resize(size) {
                    debug!("{:#}", e);
                }
            }

            let ready = terminal::poll_pair(input_fd, output_fd, options.poll_interval)?;

            if ready.input {
                match terminal::read_byte(input_fd)? {
                    None => break RelayEnd::InputClosed,
                    Some(byte) => {
                        let mut menu = TerminalMenu {
                            guard: &mut guard,
                            input_fd,
                        };
                        if let Err(e) = relay.handle_input(byte, process, &mut menu) {
                            warn!("{:#}", e);
                        }
                    }
                }
            }

            if ready.output {
                let n = process.read_chunk(&mut buf)?;
                if n == 0 {
                    break RelayEnd::OutputClosed;
                }
                write_output(&mut stdout, &decoder.decode(&buf[..n]))?;
            }
        };

        // Output the child wrote right before exiting is still buffered
        if end == RelayEnd::ChildExited {
            while terminal::poll_readable(output_fd, std::time::Duration::ZERO)? {
                let n = process.read_chunk(&mut buf)?;
                if n == 0 {
                    break;
                }
                write_output(&mut stdout, &decoder.decode(&buf[..n]))?;
            }
        }
        write_output(&mut stdout, &decoder.finish())?;

        drop(guard);
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionRegistry};
    use crate::pty::ReadOutcome;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingProcess {
        sent: Vec<u8>,
        interrupts: usize,
        eofs: usize,
        suspends: usize,
    }

    impl ProcessHandle for RecordingProcess {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent.extend_from_slice(data);
            Ok(())
        }
        fn interrupt(&mut self) -> Result<()> {
            self.interrupts += 1;
            Ok(())
        }
        fn send_eof(&mut self) -> Result<()> {
            self.eofs += 1;
            Ok(())
        }
        fn suspend(&mut self) -> Result<()> {
            self.suspends += 1;
            Ok(())
        }
        fn is_alive(&mut self) -> bool {
            true
        }
        fn read_output(&mut self, _buf: &mut [u8], _timeout: Duration) -> Result<ReadOutcome> {
            Ok(ReadOutcome::Eof)
        }
    }

    struct CountingAction {
        runs: Arc<AtomicUsize>,
    }

    impl Action for CountingAction {
        fn name(&self) -> &str {
            "Count"
        }
        fn execute(&self, process: &mut dyn ProcessHandle) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            process.send_input("counted\n")
        }
    }

    fn registry(runs: &Arc<AtomicUsize>) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(CountingAction { runs: runs.clone() }));
        registry
    }

    fn feed(relay: &Relay<'_>, bytes: &[u8], process: &mut RecordingProcess, menu: &mut dyn MenuHost) {
        for &b in bytes {
            relay.handle_input(b, process, menu).expect("handle input");
        }
    }

    #[test]
    fn classify_control_keys() {
        assert_eq!(InputKey::classify(0x01, 0x01), InputKey::Trigger);
        assert_eq!(InputKey::classify(0x03, 0x01), InputKey::Interrupt);
        assert_eq!(InputKey::classify(0x04, 0x01), InputKey::EndOfTransmission);
        assert_eq!(InputKey::classify(0x1a, 0x01), InputKey::Suspend);
        assert_eq!(InputKey::classify(b'a', 0x01), InputKey::Data(b'a'));
        // A trigger bound to Ctrl-C wins over the interrupt
        assert_eq!(InputKey::classify(0x03, 0x03), InputKey::Trigger);
    }

    #[test]
    fn plain_bytes_are_forwarded() {
        let runs = Arc::new(AtomicUsize::new(0));
        let actions = registry(&runs);
        let relay = Relay::new(&actions, DEFAULT_TRIGGER);
        let mut process = RecordingProcess::default();
        let mut menu = StreamMenu::new(Cursor::new(Vec::new()), Vec::new());

        feed(&relay, b"ls -la\r", &mut process, &mut menu);

        assert_eq!(process.sent, b"ls -la\r");
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn control_keys_become_signals() {
        let runs = Arc::new(AtomicUsize::new(0));
        let actions = registry(&runs);
        let relay = Relay::new(&actions, DEFAULT_TRIGGER);
        let mut process = RecordingProcess::default();
        let mut menu = StreamMenu::new(Cursor::new(Vec::new()), Vec::new());

        feed(&relay, &[KEY_INTERRUPT, KEY_EOT, KEY_SUSPEND], &mut process, &mut menu);

        assert!(process.sent.is_empty());
        assert_eq!((process.interrupts, process.eofs, process.suspends), (1, 1, 1));
    }

    #[test]
    fn out_of_range_selection_resumes_relay() {
        let runs = Arc::new(AtomicUsize::new(0));
        let actions = registry(&runs);
        let relay = Relay::new(&actions, DEFAULT_TRIGGER);
        let mut process = RecordingProcess::default();
        let mut menu = StreamMenu::new(Cursor::new(b"5\n".to_vec()), Vec::new());

        feed(&relay, &[DEFAULT_TRIGGER, b'x', b'y'], &mut process, &mut menu);

        let shown = String::from_utf8_lossy(menu.output()).to_string();
        assert!(shown.contains("1. Count"));
        assert!(shown.contains("Invalid selection."));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(process.sent, b"xy");
    }

    #[test]
    fn valid_selection_runs_the_action_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let actions = registry(&runs);
        let relay = Relay::new(&actions, DEFAULT_TRIGGER);
        let mut process = RecordingProcess::default();
        let mut menu = StreamMenu::new(Cursor::new(b"1\n".to_vec()), Vec::new());

        feed(&relay, &[DEFAULT_TRIGGER, b'z'], &mut process, &mut menu);

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(process.sent, b"counted\nz");
    }

    #[test]
    fn options_from_settings() {
        let settings = RelaySettings {
            trigger: "ctrl-b".to_string(),
            poll_interval_ms: 50,
            chunk_size: 0,
        };
        let options = RelayOptions::from_settings(&settings).expect("options");
        assert_eq!(options.trigger, 0x02);
        assert_eq!(options.poll_interval, Duration::from_millis(50));
        assert_eq!(options.chunk_size, 1);
    }
}
