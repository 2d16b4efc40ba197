//! Markdown checklist progress

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{DaneelError, Result};

/// `- [ ]`, `* [x]`, `  - [ X ]` ... anchored at the start of a line.
static CHECKBOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[ \t]*[-*][ \t]+\[[ \t]*(x)?[ \t]*\]").expect("checkbox pattern is valid")
});

/// Completed and total checkbox counts of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckboxCounts {
    pub completed: usize,
    pub total: usize,
}

impl CheckboxCounts {
    /// `completed / total`, or 0.0 for a document without checkboxes.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Count checkboxes in markdown text, skipping fenced code blocks.
pub fn count_checkboxes(markdown: &str) -> CheckboxCounts {
    let mut counts = CheckboxCounts::default();
    // Opening fence marker and its length while inside a fenced block
    let mut fence: Option<(char, usize)> = None;

    for line in markdown.lines() {
        if let Some(marker) = fence_marker(line) {
            match fence {
                None => fence = Some(marker),
                Some((ch, len)) if marker.0 == ch && marker.1 >= len && is_bare_fence(line) => {
                    fence = None;
                }
                Some(_) => {}
            }
            continue;
        }
        if fence.is_some() {
            continue;
        }

        if let Some(caps) = CHECKBOX.captures(line) {
            counts.total += 1;
            if caps.get(1).is_some() {
                counts.completed += 1;
            }
        }
    }

    counts
}

/// A line opening or closing a fenced block: up to three spaces of indent,
/// then at least three backticks or tildes.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let ch = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Closing fences carry no info string.
fn is_bare_fence(line: &str) -> bool {
    line.trim().chars().all(|c| c == '`' || c == '~')
}

/// Completed and total checkboxes of the markdown file at `path`.
pub fn checkbox_counts(path: &Path) -> Result<CheckboxCounts> {
    if !path.is_file() {
        return Err(DaneelError::not_found("Markdown file", path));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(count_checkboxes(&content))
}

/// Fraction of checked checkboxes in the markdown file at `path`, in `[0, 1]`.
pub fn checkbox_progress(path: &Path) -> Result<f64> {
    checkbox_counts(path).map(|counts| counts.ratio())
}
