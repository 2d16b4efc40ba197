//! Git helpers: repository root resolution and changed-file listing

mod status;

pub use status::{changed_files, find_git_root, parse_porcelain};
