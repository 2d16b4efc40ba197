use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Find the git repository root for a given path.
/// Returns None if the path is not inside a git repository.
pub fn find_git_root(path: &Path) -> Option<PathBuf> {
    let start_dir = if path.is_file() { path.parent()? } else { path };

    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(start_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// Files with uncommitted changes in the repository at `root`, relative to
/// the root: modified, staged, renamed (new name) and untracked files.
pub fn changed_files(root: &Path) -> Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=all"])
        .current_dir(root)
        .output()
        .context("Failed to run git status")?;

    if !output.status.success() {
        bail!(
            "git status failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `git status --porcelain` (v1) output into paths.
///
/// Deleted files are left out since there is nothing left to read.
pub fn parse_porcelain(output: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for line in output.lines() {
        if line.len() < 4 {
            continue;
        }
        let (status, rest) = line.split_at(2);
        if status.contains('D') {
            continue;
        }

        let path = rest.trim_start();
        // Renames are reported as "old -> new"
        let path = path.rsplit(" -> ").next().unwrap_or(path);
        let path = path.trim_matches('"');

        if !path.is_empty() {
            files.push(PathBuf::from(path));
        }
    }

    files
}
