//! Read-only checks run before a file is processed

use super::importer;
use crate::error::ValidationFailure;
use std::path::Path;

/// Confirm `path` is an .xlsx workbook with a `sheet` worksheet that has at
/// least one column matching one of `patterns`.
pub fn validate_file(path: &Path, sheet: &str, patterns: &[&str]) -> Result<(), ValidationFailure> {
    if !path.exists() {
        return Err(ValidationFailure::NotFound(path.to_path_buf()));
    }

    if !has_xlsx_extension(path) {
        return Err(ValidationFailure::WrongExtension(path.to_path_buf()));
    }

    let unreadable = |e: crate::error::MaudeError| ValidationFailure::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let sheets = importer::sheet_names(path).map_err(unreadable)?;
    if !sheets.iter().any(|s| s == sheet) {
        return Err(ValidationFailure::MissingSheet {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        });
    }

    let columns = importer::header_names(path, sheet).map_err(unreadable)?;
    let matched = columns
        .iter()
        .any(|column| patterns.iter().any(|pattern| column.contains(pattern)));
    if !matched {
        return Err(ValidationFailure::NoCategoryColumns(path.to_path_buf()));
    }

    Ok(())
}

pub fn has_xlsx_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}
