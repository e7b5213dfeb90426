//! Workbook importer - .xlsx → sheets + style snapshot

use super::styles::{capture_workbook_styles, SheetStyles, WorkbookStyles};
use crate::error::{MaudeError, MaudeResult};
use crate::types::{Cell, CellValue, Sheet};
use calamine::{Data, Range, Reader, Xlsx};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every worksheet of a workbook with its captured formatting
#[derive(Debug, Clone, Default)]
pub struct LoadedWorkbook {
    pub sheets: Vec<Sheet>,
    pub styles: WorkbookStyles,
}

impl LoadedWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Styles for a sheet; sheets without a worksheet part get an empty set
    pub fn sheet_styles(&self, name: &str) -> SheetStyles {
        self.styles.sheet(name).cloned().unwrap_or_default()
    }
}

/// Reads an .xlsx file once and decodes both values and styles from it
pub struct WorkbookImporter {
    path: PathBuf,
}

impl WorkbookImporter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn import(&self) -> MaudeResult<LoadedWorkbook> {
        let bytes = fs::read(&self.path)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> MaudeResult<LoadedWorkbook> {
        let styles = capture_workbook_styles(&bytes)?;

        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let values = workbook.worksheet_range(&name)?;
            let formulas = match workbook.worksheet_formula(&name) {
                Ok(range) => Some(range),
                Err(e) => {
                    debug!(sheet = %name, error = %e, "formulas unavailable");
                    None
                }
            };
            let sheet = build_sheet(&name, &values, formulas.as_ref());
            debug!(
                sheet = %name,
                rows = sheet.height(),
                columns = sheet.width(),
                "loaded sheet"
            );
            sheets.push(sheet);
        }

        Ok(LoadedWorkbook { sheets, styles })
    }
}

/// Sheet names of a workbook without reading any cells
pub fn sheet_names(path: &Path) -> MaudeResult<Vec<String>> {
    let workbook: Xlsx<_> = calamine::open_workbook(path).map_err(MaudeError::Excel)?;
    Ok(workbook.sheet_names())
}

/// Header row of one sheet, with the same unique naming as the full import
pub fn header_names(path: &Path, sheet: &str) -> MaudeResult<Vec<String>> {
    let mut workbook: Xlsx<_> = calamine::open_workbook(path).map_err(MaudeError::Excel)?;
    let values = workbook.worksheet_range(sheet)?;
    let mut grid = build_sheet(sheet, &values, None);
    grid.rows.truncate(1);
    Ok(grid.column_names())
}

/// Dense grid anchored at A1; calamine ranges start at the first used cell
fn build_sheet(name: &str, values: &Range<Data>, formulas: Option<&Range<String>>) -> Sheet {
    let mut sheet = Sheet::new(name);

    let end = [values.end(), formulas.and_then(|f| f.end())]
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<(u32, u32)>, (r, c)| match acc {
            Some((ar, ac)) => Some((ar.max(r), ac.max(c))),
            None => Some((r, c)),
        });
    let Some((last_row, last_col)) = end else {
        return sheet;
    };

    for r in 0..=last_row {
        let mut row = Vec::with_capacity(last_col as usize + 1);
        for c in 0..=last_col {
            let value = values
                .get_value((r, c))
                .map(convert_data)
                .unwrap_or_default();
            let formula = formulas
                .and_then(|f| f.get_value((r, c)))
                .filter(|f| !f.is_empty())
                .cloned();
            row.push(Cell { value, formula });
        }
        while row.last().is_some_and(|cell| *cell == Cell::default()) {
            row.pop();
        }
        sheet.rows.push(row);
    }

    sheet
}

fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}
