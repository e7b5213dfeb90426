use std::path::PathBuf;
use thiserror::Error;

pub type MaudeResult<T> = Result<T, MaudeError>;

#[derive(Error, Debug)]
pub enum MaudeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel read error: {0}")]
    Excel(#[from] calamine::XlsxError),

    #[error("Excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(#[from] ValidationFailure),

    #[error("Style capture error: {0}")]
    Style(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Nothing to do: {0}")]
    NoValues(String),
}

/// Why a candidate file was rejected before processing.
///
/// Each variant renders the reason shown to the user; none of them stops the
/// batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Not an Excel file: {}", .0.display())]
    WrongExtension(PathBuf),

    #[error("Cannot open {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("No '{sheet}' sheet found in {}", .path.display())]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("No problem/outcome columns found in {}", .0.display())]
    NoCategoryColumns(PathBuf),
}
