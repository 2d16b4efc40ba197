//! A child process running inside a pseudo-terminal

use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use portable_pty::{native_pty_system, Child, CommandBuilder, ExitStatus, MasterPty, PtySize};
use tracing::debug;

use super::handle::{ProcessHandle, ReadOutcome};

/// Rows and columns of a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

impl TerminalSize {
    /// Size of the controlling terminal, falling back to 24x80.
    pub fn current() -> Self {
        #[cfg(unix)]
        {
            if let Some(size) = super::terminal::terminal_size() {
                return size;
            }
        }
        Self::default()
    }

    fn to_pty_size(self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

/// An interactive program bound to a PTY, owned by whoever relays it.
pub struct PtyProcess {
    command: String,
    master: Box<dyn MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: Option<Box<dyn Write + Send>>,
    child: Box<dyn Child + Send + Sync>,
    status: Option<ExitStatus>,
}

impl PtyProcess {
    /// Spawn `command` (program followed by its arguments) in a new PTY.
    pub fn spawn(command: &[String], cwd: &Path, size: TerminalSize) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("No command given");
        };
        let command_line = command.join(" ");

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(size.to_pty_size())
            .context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.cwd(cwd);

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to start command {}", command_line))?;
        // Only the child keeps the slave open, so its exit shows up as EOF
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        debug!("Spawned '{}' (pid {:?})", command_line, child.process_id());

        Ok(Self {
            command: command_line,
            master: pair.master,
            reader,
            writer: Some(writer),
            child,
            status: None,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Descriptor that becomes readable when the child writes output.
    #[cfg(unix)]
    pub fn output_fd(&self) -> Option<std::os::unix::io::RawFd> {
        self.master.as_raw_fd()
    }

    pub fn resize(&self, size: TerminalSize) -> Result<()> {
        self.master
            .resize(size.to_pty_size())
            .context("Failed to resize PTY")
    }

    /// Read whatever output is available into `buf`. Returns 0 once the
    /// child side of the terminal is gone.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if is_pty_closed(&e) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Hand the input side to the caller, e.g. for a copy thread. Later
    /// [`ProcessHandle::send`] calls fail.
    pub fn detach_input(&mut self) -> Option<Box<dyn Write + Send>> {
        self.writer.take()
    }

    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait().context("Failed to poll child")?;
        }
        Ok(self.status.clone())
    }

    pub fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = &self.status {
            return Ok(status.clone());
        }
        let status = self.child.wait().context("Failed to wait for child")?;
        self.status = Some(status.clone());
        Ok(status)
    }

    /// Kill the child if it is still running and reap it.
    pub fn terminate(&mut self) -> Result<ExitStatus> {
        if self.try_wait()?.is_none() {
            debug!("Killing '{}'", self.command);
            if let Err(e) = self.child.kill() {
                debug!("Kill failed (child may have exited): {}", e);
            }
        }
        self.wait()
    }

    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> Result<()> {
        super::terminal::signal_process(self.master.process_group_leader(), self.pid(), signal)
            .with_context(|| format!("Failed to signal '{}'", self.command))
    }

    fn eof_byte(&self) -> u8 {
        #[cfg(unix)]
        {
            if let Some(c) = self.output_fd().and_then(super::terminal::eof_char) {
                return c;
            }
        }
        super::KEY_EOT
    }
}

impl ProcessHandle for PtyProcess {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            bail!("Input of '{}' is detached", self.command);
        };
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    fn interrupt(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            return self.signal(libc::SIGINT);
        }

        #[cfg(not(unix))]
        {
            self.send(&[super::KEY_INTERRUPT])
        }
    }

    fn send_eof(&mut self) -> Result<()> {
        let eof = self.eof_byte();
        self.send(&[eof])
    }

    fn suspend(&mut self) -> Result<()> {
        #[cfg(unix)]
        {
            return self.signal(libc::SIGTSTP);
        }

        #[cfg(not(unix))]
        {
            bail!("Suspending is not supported on this platform")
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }

    fn read_output(&mut self, buf: &mut [u8], timeout: Duration) -> Result<ReadOutcome> {
        #[cfg(unix)]
        {
            let fd = self.output_fd().context("PTY has no file descriptor")?;
            if !super::terminal::poll_readable(fd, timeout)? {
                return Ok(ReadOutcome::Timeout);
            }
        }
        #[cfg(not(unix))]
        let _ = timeout;

        match self.read_chunk(buf)? {
            0 => Ok(ReadOutcome::Eof),
            n => Ok(ReadOutcome::Data(n)),
        }
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.try_wait() {
            let _ = self.terminate();
        }
    }
}

fn is_pty_closed(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        // Linux reports EIO on the master once the slave side is closed
        if err.raw_os_error() == Some(libc::EIO) {
            return true;
        }
    }
    err.kind() == io::ErrorKind::BrokenPipe
}
