//! Candidate discovery from a directory listing

use crate::error::MaudeResult;
use crate::excel::validator::has_xlsx_extension;
use crate::writer::is_backup_name;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `.xlsx` files in `dir` whose name contains `marker` (case-insensitive),
/// sorted by name. Excel lock files and backups written by earlier runs are
/// left out.
pub fn find_candidates(dir: &Path, marker: &str) -> MaudeResult<Vec<PathBuf>> {
    let marker = marker.to_uppercase();
    let mut found = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !has_xlsx_extension(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("~$") || is_backup_name(name) {
            debug!(file = %name, "skipping lock or backup file");
            continue;
        }
        if name.to_uppercase().contains(&marker) {
            found.push(path);
        }
    }

    found.sort();
    Ok(found)
}
