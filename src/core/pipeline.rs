//! Per-file processing: validate, load, derive, rebuild, persist

use super::extractor::{distinct_values, Extraction};
use super::indicators::{existing_indicator_columns, IndicatorBuilder};
use crate::config::Config;
use crate::error::{MaudeError, MaudeResult, ValidationFailure};
use crate::excel::{validate_file, IndicatorPalette, WorkbookExporter, WorkbookImporter};
use crate::types::{Category, Dataset, IndicatorColumn};
use crate::writer;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Distinct values found for one category
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub columns: usize,
    pub values: usize,
}

/// What happened to one file
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// New columns written, backup saved
    Updated,
    /// Every indicator already present; nothing written
    UpToDate,
    /// New columns computed but not written (dry run)
    DryRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub rows: usize,
    pub original_columns: usize,
    pub categories: Vec<CategoryCount>,
    pub existing_indicators: Vec<String>,
    pub added_columns: Vec<String>,
    pub backup: Option<PathBuf>,
}

impl FileReport {
    pub fn total_columns(&self) -> usize {
        self.original_columns + self.added_columns.len()
    }
}

/// Columns derived for a dataset, before anything is written
#[derive(Debug, Clone)]
pub struct Derivation {
    pub extractions: Vec<Extraction>,
    pub existing: Vec<String>,
    pub indicators: Vec<IndicatorColumn>,
}

/// Extract every category and build the indicator columns that are missing
pub fn derive_indicators(dataset: &Dataset, categories: &[Category]) -> Derivation {
    let extractions: Vec<Extraction> = categories
        .iter()
        .map(|category| distinct_values(dataset, &[category.pattern.as_str()]))
        .collect();
    let existing = existing_indicator_columns(dataset, categories);
    let indicators = IndicatorBuilder::new(dataset, &existing).build_all(categories, &extractions);

    Derivation {
        extractions,
        existing,
        indicators,
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    dry_run: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the whole transformation for one file. Any error leaves the file
    /// on disk untouched.
    pub fn process(&self, path: &Path) -> MaudeResult<FileReport> {
        let config = self.config;
        validate_file(path, &config.sheet, &config.patterns())?;
        debug!(path = %path.display(), "file validated");

        let workbook = WorkbookImporter::new(path).import()?;
        let sheet = workbook.sheet(&config.sheet).ok_or_else(|| {
            MaudeError::Validation(ValidationFailure::MissingSheet {
                path: path.to_path_buf(),
                sheet: config.sheet.clone(),
            })
        })?;
        let dataset = Dataset::from_sheet(sheet);
        info!(
            path = %path.display(),
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            "loaded events"
        );

        let derivation = derive_indicators(&dataset, &config.categories);
        let categories = config
            .categories
            .iter()
            .zip(&derivation.extractions)
            .map(|(category, extraction)| CategoryCount {
                category: category.name.clone(),
                columns: extraction.columns.len(),
                values: extraction.values.len(),
            })
            .collect();

        if derivation.extractions.iter().all(Extraction::is_empty) {
            return Err(MaudeError::NoValues(
                "no problems or outcomes found to create binary columns for".into(),
            ));
        }

        let mut report = FileReport {
            path: path.to_path_buf(),
            status: FileStatus::UpToDate,
            rows: dataset.row_count(),
            original_columns: dataset.column_count(),
            categories,
            existing_indicators: derivation.existing.clone(),
            added_columns: derivation.indicators.iter().map(|c| c.name.clone()).collect(),
            backup: None,
        };

        if derivation.indicators.is_empty() {
            info!(path = %path.display(), "all indicator columns already present");
            return Ok(report);
        }

        let palette = IndicatorPalette {
            affirmative: config.affirmative_rgb()?,
            negative: config.negative_rgb()?,
        };
        let bytes =
            WorkbookExporter::new(&workbook, &config.sheet, &derivation.indicators, palette)
                .to_buffer()?;

        if self.dry_run {
            report.status = FileStatus::DryRun;
            return Ok(report);
        }

        let backup = writer::persist_with_backup(path, &bytes, &Local::now())?;
        info!(
            path = %path.display(),
            backup = %backup.display(),
            added = report.added_columns.len(),
            "file updated"
        );
        report.backup = Some(backup);
        report.status = FileStatus::Updated;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_derive_indicators_scenario() {
        let dataset = Dataset::new(
            vec!["Device Problem 1".into()],
            vec![vec![text("Fracture")], vec![text("Corrosion")]],
        );
        let derivation = derive_indicators(&dataset, &Category::defaults());

        let columns: Vec<(&str, &[u8])> = derivation
            .indicators
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
            .collect();
        assert_eq!(
            columns,
            vec![
                ("Device_Corrosion", &[0u8, 1][..]),
                ("Device_Fracture", &[1u8, 0][..]),
            ]
        );
        assert!(derivation.existing.is_empty());
    }

    #[test]
    fn test_derive_indicators_is_idempotent() {
        let dataset = Dataset::new(
            vec!["Patient Outcome".into(), "Outcome_Death".into()],
            vec![vec![text("Death"), CellValue::Number(1.0)]],
        );
        let derivation = derive_indicators(&dataset, &Category::defaults());
        assert!(derivation.indicators.is_empty());
        assert_eq!(derivation.existing, vec!["Outcome_Death".to_string()]);
    }
}
