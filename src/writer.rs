use crate::error::MaudeResult;
use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Timestamp format inserted into backup names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `report.xlsx` → `report_backup_20250101_120000.xlsx`, next to the original
pub fn backup_path(path: &Path, timestamp: &DateTime<Local>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = timestamp.format(BACKUP_TIMESTAMP_FORMAT);
    let name = match path.extension() {
        Some(ext) => format!("{}_backup_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_backup_{}", stem, stamp),
    };
    path.with_file_name(name)
}

/// True for names produced by [`backup_path`]
pub fn is_backup_name(file_name: &str) -> bool {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    let Some((_, stamp)) = stem.rsplit_once("_backup_") else {
        return false;
    };
    stamp.len() == 15
        && stamp
            .char_indices()
            .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() })
}

/// Write the backup copy, then atomically replace `path` with `bytes`.
///
/// The replacement is written to a temporary file in the same directory and
/// renamed over the original, so the original is either untouched or fully
/// replaced. Returns the backup location.
pub fn persist_with_backup(
    path: &Path,
    bytes: &[u8],
    timestamp: &DateTime<Local>,
) -> MaudeResult<PathBuf> {
    let backup = backup_path(path, timestamp);
    fs::write(&backup, bytes)?;

    replace_atomically(path, bytes)?;
    Ok(backup)
}

pub fn replace_atomically(path: &Path, bytes: &[u8]) -> MaudeResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
