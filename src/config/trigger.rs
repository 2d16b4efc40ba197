//! Parsing of the action menu trigger key

use anyhow::{bail, Result};

/// Convert a key description into the byte the terminal sends for it.
///
/// Accepts `ctrl-<letter>` / `c-<letter>`, caret notation (`^A`), a hex byte
/// (`0x01`) or a single ASCII character.
pub fn parse_trigger(spec: &str) -> Result<u8> {
    let trimmed = spec.trim();
    let lower = trimmed.to_ascii_lowercase();

    let ctrl_letter = lower
        .strip_prefix("ctrl-")
        .or_else(|| lower.strip_prefix("ctrl+"))
        .or_else(|| lower.strip_prefix("c-"))
        .or_else(|| lower.strip_prefix('^'));

    if let Some(letter) = ctrl_letter {
        let mut chars = letter.chars();
        return match (chars.next(), chars.next()) {
            (Some(c @ 'a'..='z'), None) => Ok(c as u8 - b'a' + 1),
            _ => bail!("Unsupported control key: {}", spec),
        };
    }

    if let Some(hex) = lower.strip_prefix("0x") {
        return u8::from_str_radix(hex, 16)
            .map_err(|e| anyhow::anyhow!("Invalid trigger byte {}: {}", spec, e));
    }

    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => bail!("Trigger must be a single ASCII key, got: {:?}", spec),
    }
}
