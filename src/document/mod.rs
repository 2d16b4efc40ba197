//! In-place editing and inspection of user documents
//!
//! - [`update_yaml`] sets one field of a YAML file addressed by a dotted
//!   query such as `project.tasks[0].status`.
//! - [`checkbox_progress`] reports how much of a markdown checklist is done.

mod checkbox;
mod yaml;

pub use checkbox::{checkbox_counts, checkbox_progress, count_checkboxes, CheckboxCounts};
pub use yaml::{parse_query, set_field, update_yaml, QueryStep};

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use tracing::debug;

/// Replace `path` with `content` via a sibling temp file and a rename, so a
/// crash never leaves a half-written document behind.
///
/// The replacement keeps the original file's permissions. An exclusive lock
/// on the existing file is held until the rename is done, and the temp file
/// is removed again if any step fails.
fn write_atomically(path: &Path, content: &str) -> std::io::Result<()> {
    let existing = File::open(path)?;
    existing.lock_exclusive()?;
    let permissions = existing.metadata()?.permissions();

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let replaced = (|| -> std::io::Result<()> {
        let mut temp_file = File::create(&temp_path)?;
        temp_file.set_permissions(permissions)?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.sync_all()?;
        drop(temp_file);
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = replaced {
        if let Err(cleanup) = fs::remove_file(&temp_path) {
            debug!("Failed to remove {:?}: {}", temp_path, cleanup);
        }
        return Err(e);
    }
    FileExt::unlock(&existing)
}
