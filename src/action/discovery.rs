//! Action discovery from the filesystem
//!
//! Manifests are collected from, in order:
//! 1. `./actions` in the working directory
//! 2. `daneel/` at the git repository root
//! 3. the directory named by `DANEEL_ACTIONS`
//! 4. `action_dirs` from the configuration

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::manifest::{load_manifest, ManifestAction};
use super::ActionRegistry;
use crate::config::{Config, ACTIONS_ENV_VAR};
use crate::git::find_git_root;

/// Directories searched for action manifests
#[derive(Debug, Clone, Default)]
pub struct ActionDiscovery {
    sources: Vec<PathBuf>,
}

impl ActionDiscovery {
    /// Standard sources for `work_dir`.
    pub fn new(work_dir: &Path, config: &Config) -> Self {
        let mut sources = vec![work_dir.join("actions")];

        if let Some(root) = find_git_root(work_dir) {
            sources.push(root.join("daneel"));
        }

        if let Some(dir) = std::env::var_os(ACTIONS_ENV_VAR).filter(|v| !v.is_empty()) {
            sources.push(PathBuf::from(dir));
        }

        sources.extend(config.action_dirs.iter().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                work_dir.join(dir)
            }
        }));

        Self::with_sources(sources)
    }

    /// Explicit source list, searched in order.
    pub fn with_sources(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }

    /// Existing source directories, each once.
    pub fn existing_sources(&self) -> Vec<PathBuf> {
        let mut seen: Vec<PathBuf> = Vec::new();
        let mut dirs = Vec::new();

        for source in &self.sources {
            if !source.is_dir() {
                debug!("Action directory does not exist: {:?}", source);
                continue;
            }
            let key = source.canonicalize().unwrap_or_else(|_| source.clone());
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            dirs.push(source.clone());
        }

        dirs
    }

    /// Load every action from every source into a registry.
    pub fn discover(&self) -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        for dir in self.existing_sources() {
            for action in load_actions_from_dir(&dir) {
                registry.register(Box::new(action));
            }
        }
        registry
    }
}

fn report_skipped(what: &Path, error: &anyhow::Error) {
    warn!("Skipping {:?}: {:#}", what, error);
    eprintln!("Warning: Failed to load actions from {}: {:#}", what.display(), error);
}

/// Manifest files of one directory, private (`_`-prefixed) files excluded.
fn manifest_files(dir: &Path) -> Vec<PathBuf> {
    let Some(dir_str) = dir.to_str() else {
        warn!("Skipping action directory with a non UTF-8 path: {:?}", dir);
        return Vec::new();
    };
    let pattern = format!("{}/*.toml", glob::Pattern::escape(dir_str));

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Invalid action directory pattern {:?}: {}", pattern, e);
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to read action directory entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('_'))
        })
        .collect()
}

fn load_actions_from_dir(dir: &Path) -> Vec<ManifestAction> {
    let mut actions = Vec::new();

    for path in manifest_files(dir) {
        let manifest = match load_manifest(&path) {
            Ok(manifest) => manifest,
            Err(e) => {
                report_skipped(&path, &e);
                continue;
            }
        };

        for spec in manifest.actions {
            match ManifestAction::new(spec, &path) {
                Ok(action) => {
                    debug!(
                        "Loaded action '{}' from {:?}",
                        action.spec().name,
                        action.source()
                    );
                    actions.push(action);
                }
                Err(e) => report_skipped(&path, &e),
            }
        }
    }

    actions
}
