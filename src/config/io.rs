//! Configuration file I/O operations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::{Config, PROJECT_CONFIG_FILE};
use crate::git::find_git_root;

impl Config {
    /// Get the global config directory path (~/.daneel/)
    pub fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".daneel")
    }

    /// Get the global config file path (~/.daneel/config.toml)
    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    /// Path of the project config for `work_dir`: `daneel.toml` at the git
    /// root, or in `work_dir` itself outside a repository.
    pub fn project_config_path(work_dir: &Path) -> PathBuf {
        find_git_root(work_dir)
            .unwrap_or_else(|| work_dir.to_path_buf())
            .join(PROJECT_CONFIG_FILE)
    }

    /// Load configuration from a single file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let table = read_table(path)?;
        toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load the effective configuration for `work_dir`.
    ///
    /// Missing files are skipped. Keys in the project file override the same
    /// keys in the global file.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let candidates = [
            Self::global_config_path(),
            Self::project_config_path(work_dir),
        ];

        let mut merged = toml::Table::new();
        for path in candidates.iter().filter(|p| p.is_file()) {
            debug!("Loading config from {}", path.display());
            merge_tables(&mut merged, read_table(path)?);
        }

        toml::Value::Table(merged)
            .try_into()
            .context("Failed to parse merged configuration")
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Recursively overlay `overlay` onto `base`. Tables merge, everything else
/// is replaced.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
