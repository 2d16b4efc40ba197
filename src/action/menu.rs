//! The numbered action menu

use std::io::{self, BufRead, Write};

use tracing::{debug, warn};

use super::ActionRegistry;
use crate::pty::{ProcessHandle, KEY_INTERRUPT};

/// What happened while the menu was open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    /// The named action ran to completion.
    Executed(String),
    /// The named action returned an error, which was reported.
    Failed(String),
    /// A number outside the list was entered.
    Invalid,
    /// Non-numeric input, end of input or Ctrl-C.
    Cancelled,
    NoActions,
}

/// Print the menu to `output`, read one selection line from `input` and run
/// the chosen action against `process`.
///
/// Action failures are reported on `output` rather than returned; only I/O
/// errors on the menu streams are.
pub fn show_action_menu(
    actions: &ActionRegistry,
    process: &mut dyn ProcessHandle,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<MenuOutcome> {
    if actions.is_empty() {
        writeln!(output, "\nNo actions available.")?;
        output.flush()?;
        return Ok(MenuOutcome::NoActions);
    }

    writeln!(output, "\nAvailable actions:")?;
    for (i, name) in actions.names().enumerate() {
        writeln!(output, "{}. {}", i + 1, name)?;
    }
    write!(output, "\nSelect an action (number): ")?;
    output.flush()?;

    let selection = match read_selection(input) {
        Ok(Some(line)) if line.last() != Some(&KEY_INTERRUPT) => String::from_utf8(line)
            .ok()
            .and_then(|text| text.trim().parse::<i64>().ok()),
        Ok(_) => None,
        Err(e) if e.kind() == io::ErrorKind::Interrupted => None,
        Err(e) => return Err(e),
    };

    let Some(selection) = selection else {
        writeln!(output, "\nAction cancelled.")?;
        output.flush()?;
        return Ok(MenuOutcome::Cancelled);
    };

    let action = usize::try_from(selection)
        .ok()
        .and_then(|position| actions.get(position));
    let Some(action) = action else {
        debug!("Selection {} is out of range", selection);
        writeln!(output, "Invalid selection.")?;
        output.flush()?;
        return Ok(MenuOutcome::Invalid);
    };

    let name = action.name().to_string();
    debug!("Running action '{}'", name);
    let outcome = match action.execute(process) {
        Ok(()) => MenuOutcome::Executed(name),
        Err(e) => {
            warn!("Action '{}' failed: {:#}", name, e);
            writeln!(output, "Action '{}' failed: {:#}", name, e)?;
            MenuOutcome::Failed(name)
        }
    };
    output.flush()?;
    Ok(outcome)
}

/// Read bytes up to and including the first newline or Ctrl-C.
///
/// A terminal in menu mode hands back `1^C` without a newline, so the read
/// has to stop at the interrupt byte instead of asking for another line.
/// Returns `None` at end of input with nothing read.
fn read_selection(input: &mut impl BufRead) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    loop {
        let buf = input.fill_buf()?;
        if buf.is_empty() {
            return Ok((!line.is_empty()).then_some(line));
        }
        match buf.iter().position(|&b| b == b'\n' || b == KEY_INTERRUPT) {
            Some(end) => {
                line.extend_from_slice(&buf[..=end]);
                input.consume(end + 1);
                return Ok(Some(line));
            }
            None => {
                let taken = buf.len();
                line.extend_from_slice(buf);
                input.consume(taken);
            }
        }
    }
}
