//! One-hot indicator columns built from categorical columns

use super::extractor::Extraction;
use crate::types::{Category, CellValue, Dataset, IndicatorColumn};
use std::collections::HashSet;
use tracing::debug;

/// Column-name suffix for a categorical value: spaces become underscores,
/// parentheses, commas and slashes are dropped.
pub fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            '(' | ')' | ',' | '/' => None,
            other => Some(other),
        })
        .collect()
}

/// `<prefix>_<sanitized value>`
pub fn indicator_name(prefix: &str, value: &CellValue) -> String {
    format!("{}_{}", prefix, sanitize_value(&value.to_string()))
}

/// Columns that look like indicators from an earlier run: they carry one of
/// the category prefixes and are not themselves a source column.
pub fn existing_indicator_columns(dataset: &Dataset, categories: &[Category]) -> Vec<String> {
    dataset
        .columns
        .iter()
        .filter(|column| {
            let is_source = categories.iter().any(|c| column.contains(&c.pattern));
            let has_prefix = categories
                .iter()
                .any(|c| column.starts_with(&format!("{}_", c.prefix)));
            has_prefix && !is_source
        })
        .cloned()
        .collect()
}

/// 1 for every row where any of `columns` holds `value`, else 0
pub fn flag_rows(dataset: &Dataset, columns: &[String], value: &CellValue) -> Vec<u8> {
    let indices: Vec<usize> = columns
        .iter()
        .filter_map(|name| dataset.column_index(name))
        .collect();

    dataset
        .rows
        .iter()
        .map(|row| {
            let hit = indices
                .iter()
                .any(|&idx| row.get(idx).is_some_and(|cell| cell == value));
            u8::from(hit)
        })
        .collect()
}

/// Builds indicator columns for every category, skipping names that already
/// exist in the sheet.
pub struct IndicatorBuilder<'a> {
    dataset: &'a Dataset,
    existing: HashSet<String>,
}

impl<'a> IndicatorBuilder<'a> {
    pub fn new(dataset: &'a Dataset, existing: &[String]) -> Self {
        Self {
            dataset,
            existing: existing.iter().cloned().collect(),
        }
    }

    /// Build the new columns for one category. Names are claimed in value
    /// order, so when two values sanitize to the same name only the first
    /// gets a column.
    pub fn build_category(
        &mut self,
        category: &Category,
        extraction: &Extraction,
    ) -> Vec<IndicatorColumn> {
        let mut built = Vec::new();
        for value in &extraction.values {
            let name = indicator_name(&category.prefix, value);
            if self.existing.contains(&name) {
                debug!(column = %name, value = %value, "indicator already present, skipping");
                continue;
            }
            let values = flag_rows(self.dataset, &extraction.columns, value);
            self.existing.insert(name.clone());
            built.push(IndicatorColumn {
                name,
                category: category.name.clone(),
                source_value: value.clone(),
                values,
            });
        }
        built
    }

    pub fn build_all(
        mut self,
        categories: &[Category],
        extractions: &[Extraction],
    ) -> Vec<IndicatorColumn> {
        categories
            .iter()
            .zip(extractions)
            .flat_map(|(category, extraction)| self.build_category(category, extraction))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::distinct_values;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_sanitize_value() {
        assert_eq!(sanitize_value("Fracture"), "Fracture");
        assert_eq!(sanitize_value("Break (Material)"), "Break_Material");
        assert_eq!(sanitize_value("Leak/Splash"), "LeakSplash");
        assert_eq!(sanitize_value("Pain, Chronic"), "Pain_Chronic");
    }

    #[test]
    fn test_indicator_name_numeric_value() {
        assert_eq!(indicator_name("Device", &CellValue::Number(2003.0)), "Device_2003");
    }

    #[test]
    fn test_any_of_rule_across_columns() {
        let dataset = Dataset::new(
            vec!["Patient Problem 1".into(), "Patient Problem 2".into()],
            vec![
                vec![text("Pain"), CellValue::Empty],
                vec![text("Fever"), text("Pain")],
                vec![text("Fever"), CellValue::Empty],
            ],
        );
        let columns = vec!["Patient Problem 1".to_string(), "Patient Problem 2".to_string()];
        assert_eq!(flag_rows(&dataset, &columns, &text("Pain")), vec![1, 1, 0]);
        assert_eq!(flag_rows(&dataset, &columns, &text("Fever")), vec![0, 1, 1]);
    }

    #[test]
    fn test_existing_indicator_detection() {
        let dataset = Dataset::new(
            vec![
                "Device Problem".into(),
                "Device_Fracture".into(),
                "Outcome_Death".into(),
                "Device_Problem_Notes".into(),
                "Manufacturer".into(),
            ],
            vec![],
        );
        let existing = existing_indicator_columns(&dataset, &Category::defaults());
        assert_eq!(
            existing,
            vec![
                "Device_Fracture".to_string(),
                "Outcome_Death".to_string(),
                "Device_Problem_Notes".to_string(),
            ]
        );
    }

    #[test]
    fn test_skips_existing_names() {
        let dataset = Dataset::new(
            vec!["Device Problem 1".into(), "Device_Fracture".into()],
            vec![vec![text("Fracture"), CellValue::Number(1.0)], vec![text("Corrosion"), CellValue::Number(0.0)]],
        );
        let category = Category::device_problem();
        let extraction = distinct_values(&dataset, &[category.pattern.as_str()]);
        let existing = existing_indicator_columns(&dataset, &[category.clone()]);

        let built = IndicatorBuilder::new(&dataset, &existing).build_category(&category, &extraction);
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].name, "Device_Corrosion");
        assert_eq!(built[0].values, vec![0, 1]);
    }

    // Known gap: values that sanitize to the same name share one column and
    // the later value is dropped without notice.
    #[test]
    fn test_sanitization_collision_skips_second_value() {
        let dataset = Dataset::new(
            vec!["Device Problem 1".into()],
            vec![vec![text("A,B")], vec![text("AB")], vec![text("C")]],
        );
        let category = Category::device_problem();
        let extraction = distinct_values(&dataset, &[category.pattern.as_str()]);
        assert_eq!(extraction.values, vec![text("A,B"), text("AB"), text("C")]);

        let built = IndicatorBuilder::new(&dataset, &[]).build_category(&category, &extraction);
        let names: Vec<&str> = built.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Device_AB", "Device_C"]);
        assert_eq!(built[0].source_value, text("A,B"));
        assert_eq!(built[0].values, vec![1, 0, 0]);
    }

    #[test]
    fn test_build_all_keeps_category_order() {
        let dataset = Dataset::new(
            vec!["Device Problem".into(), "Patient Problem".into(), "Patient Outcome".into()],
            vec![vec![text("Leak"), text("Burn"), text("Injury")]],
        );
        let categories = Category::defaults();
        let extractions: Vec<Extraction> = categories
            .iter()
            .map(|c| distinct_values(&dataset, &[c.pattern.as_str()]))
            .collect();

        let built = IndicatorBuilder::new(&dataset, &[]).build_all(&categories, &extractions);
        let names: Vec<&str> = built.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Device_Leak", "Patient_Burn", "Outcome_Injury"]);
        assert!(built.iter().all(|c| c.flagged_rows() == 1));
    }
}
