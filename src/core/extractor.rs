//! Distinct-value extraction over pattern-matched columns

use crate::types::{CellValue, Dataset};

/// Result of scanning one category's columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Distinct non-null values, naturally ordered
    pub values: Vec<CellValue>,
    /// Columns whose name contains one of the patterns
    pub columns: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Columns whose name contains any of `patterns`, grouped by pattern
pub fn matching_columns(dataset: &Dataset, patterns: &[&str]) -> Vec<String> {
    let mut matched = Vec::new();
    for pattern in patterns {
        for column in &dataset.columns {
            if column.contains(pattern) {
                matched.push(column.clone());
            }
        }
    }
    matched
}

/// Collect the sorted distinct non-null values found in every column whose
/// name contains one of `patterns`.
pub fn distinct_values(dataset: &Dataset, patterns: &[&str]) -> Extraction {
    let columns = matching_columns(dataset, patterns);

    let mut values: Vec<CellValue> = Vec::new();
    for column in &columns {
        let Some(idx) = dataset.column_index(column) else {
            continue;
        };
        for row in &dataset.rows {
            if let Some(value) = row.get(idx) {
                if !value.is_null() {
                    values.push(value.clone());
                }
            }
        }
    }

    values.sort_by(|a, b| a.natural_cmp(b));
    values.dedup();

    Extraction { values, columns }
}
