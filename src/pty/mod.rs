//! Pseudo-terminal sessions and the interactive relay
//!
//! A command is spawned inside a PTY ([`PtyProcess`]) and its terminal I/O is
//! proxied to the controlling terminal by [`run_relay`]. One reserved byte
//! (Ctrl-A by default) diverts control to the action menu; the interrupt,
//! end-of-transmission and suspend keys are turned into signals or EOF for
//! the child instead of being forwarded.
//!
//! Actions only ever see the child through the [`ProcessHandle`] trait.

mod decoder;
mod handle;
mod process;
mod relay;
#[cfg(unix)]
mod terminal;

pub use decoder::OutputDecoder;
pub use handle::{ProcessHandle, ReadOutcome};
pub use process::{PtyProcess, TerminalSize};
pub use relay::{relay_streams, run_relay, InputKey, MenuHost, Relay, RelayOptions, StreamMenu};

/// Interrupt (Ctrl-C)
pub const KEY_INTERRUPT: u8 = 0x03;
/// End of transmission (Ctrl-D)
pub const KEY_EOT: u8 = 0x04;
/// Suspend (Ctrl-Z)
pub const KEY_SUSPEND: u8 = 0x1a;
/// Default action menu trigger (Ctrl-A)
pub const DEFAULT_TRIGGER: u8 = 0x01;
