//! Indicator derivation and the per-file pipeline

pub mod extractor;
pub mod indicators;
pub mod pipeline;

pub use extractor::{distinct_values, Extraction};
pub use indicators::{existing_indicator_columns, sanitize_value, IndicatorBuilder};
pub use pipeline::{derive_indicators, FileReport, FileStatus, Pipeline};
