//! Document command implementations

use anyhow::Result;
use std::path::Path;

use daneel::document::{checkbox_counts, update_yaml};

/// Print checkbox progress of a markdown file
pub fn progress_command(file: &Path) -> Result<()> {
    let counts = checkbox_counts(file)?;
    println!(
        "{}/{} complete ({:.0}%)",
        counts.completed,
        counts.total,
        counts.ratio() * 100.0
    );
    Ok(())
}

/// Set one YAML field. The value is read as YAML so `true` and `3` keep
/// their types; anything unparseable is stored as text.
pub fn set_command(file: &Path, query: &str, value: &str) -> Result<()> {
    let parsed = serde_yaml::from_str::<serde_yaml::Value>(value)
        .unwrap_or_else(|_| serde_yaml::Value::String(value.to_string()));
    update_yaml(file, query, parsed)?;
    println!("Set {} in {}", query, file.display());
    Ok(())
}
