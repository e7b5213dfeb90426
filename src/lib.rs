//! MAUDE indicator columns
//!
//! Adds binary indicator columns to FDA MAUDE adverse-event exports: one
//! column per distinct device problem, patient problem and patient outcome,
//! holding 1 when the event reports that value and 0 otherwise. The workbook
//! is rebuilt with the original cell formatting, row heights and column
//! widths, a timestamped backup is written, and the original is replaced
//! atomically.
//!
//! # Example
//!
//! ```no_run
//! use maude_indicators::config::Config;
//! use maude_indicators::core::Pipeline;
//! use std::path::Path;
//!
//! let config = Config::default();
//! let report = Pipeline::new(&config).process(Path::new("MAUDE_2024.xlsx"))?;
//!
//! println!("Added {} columns", report.added_columns.len());
//! # Ok::<(), maude_indicators::error::MaudeError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use config::Config;
pub use error::{MaudeError, MaudeResult, ValidationFailure};
pub use types::{Category, CellValue, Dataset, IndicatorColumn};
