//! The view of a relayed process that actions operate on

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::decoder::OutputDecoder;

/// Result of one bounded read from the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were placed in the buffer.
    Data(usize),
    /// Nothing arrived before the timeout.
    Timeout,
    /// The child closed its side of the terminal.
    Eof,
}

/// A running interactive process that input can be sent to.
pub trait ProcessHandle {
    /// Write raw bytes to the child's terminal.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Deliver an interrupt (SIGINT) to the child's foreground job.
    fn interrupt(&mut self) -> Result<()>;

    /// Deliver end-of-file through the child's terminal.
    fn send_eof(&mut self) -> Result<()>;

    /// Deliver a suspend (SIGTSTP) to the child's foreground job.
    fn suspend(&mut self) -> Result<()>;

    fn is_alive(&mut self) -> bool;

    /// Read at most `buf.len()` bytes of output, waiting up to `timeout`.
    fn read_output(&mut self, buf: &mut [u8], timeout: Duration) -> Result<ReadOutcome>;

    fn send_input(&mut self, input: &str) -> Result<()> {
        self.send(input.as_bytes())
            .with_context(|| format!("Failed to send input '{}'", input.escape_debug()))
    }

    fn send_line(&mut self, input: &str) -> Result<()> {
        self.send_input(&format!("{}\n", input))
    }

    /// Read output until `expected` shows up or `timeout` elapses, echoing
    /// what was read to `echo`. Returns whether the text was seen.
    fn wait_for_output(
        &mut self,
        expected: &str,
        timeout: Duration,
        echo: &mut dyn Write,
    ) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut decoder = OutputDecoder::new();
        let mut seen = String::new();
        let mut buf = [0u8; 1024];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }

            match self.read_output(&mut buf, remaining)? {
                ReadOutcome::Data(n) => {
                    let text = decoder.decode(&buf[..n]);
                    echo.write_all(text.as_bytes())?;
                    echo.flush()?;
                    seen.push_str(&text);
                    if seen.contains(expected) {
                        return Ok(true);
                    }
                }
                ReadOutcome::Timeout | ReadOutcome::Eof => return Ok(false),
            }
        }
    }
}
