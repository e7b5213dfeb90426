//! Workbook exporter - rebuilds the whole workbook with indicator columns
//!
//! The source workbook is never edited in place: a new workbook is assembled
//! from the loaded sheets and only serialized once it is complete.

use super::importer::LoadedWorkbook;
use super::styles::{column_index, SheetStyles};
use crate::error::MaudeResult;
use crate::types::{Cell, CellValue, IndicatorColumn, Sheet};
use rust_xlsxwriter::{Color, Format, FormatPattern, Formula, Workbook, Worksheet};
use tracing::debug;

/// Fills used for indicator cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPalette {
    pub affirmative: u32,
    pub negative: u32,
}

impl Default for IndicatorPalette {
    fn default() -> Self {
        Self {
            affirmative: 0x90EE90,
            negative: 0xFFB6C1,
        }
    }
}

impl IndicatorPalette {
    fn fill(rgb: u32) -> Format {
        Format::new()
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(rgb))
    }

    pub fn affirmative_format(&self) -> Format {
        Self::fill(self.affirmative)
    }

    pub fn negative_format(&self) -> Format {
        Self::fill(self.negative)
    }

    pub fn header_format(&self) -> Format {
        Format::new().set_bold()
    }
}

/// Builds the output workbook for one run
pub struct WorkbookExporter<'a> {
    source: &'a LoadedWorkbook,
    target_sheet: &'a str,
    indicators: &'a [IndicatorColumn],
    palette: IndicatorPalette,
}

impl<'a> WorkbookExporter<'a> {
    pub fn new(
        source: &'a LoadedWorkbook,
        target_sheet: &'a str,
        indicators: &'a [IndicatorColumn],
        palette: IndicatorPalette,
    ) -> Self {
        Self {
            source,
            target_sheet,
            indicators,
            palette,
        }
    }

    /// Assemble every sheet, in the original order
    pub fn build(&self) -> MaudeResult<Workbook> {
        let mut workbook = Workbook::new();

        for sheet in &self.source.sheets {
            let styles = self.source.sheet_styles(&sheet.name);
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&sheet.name)?;

            let is_target = sheet.name == self.target_sheet;
            // Only the target sheet grows; other sheets keep every styled cell
            let style_limit = if is_target { sheet.width() } else { usize::MAX };
            restore_merges(worksheet, &styles)?;
            write_original(worksheet, sheet, &styles, style_limit)?;
            restore_dimensions(worksheet, &styles)?;
            restore_view(worksheet, &styles)?;

            if is_target {
                self.write_indicators(worksheet, sheet.width(), sheet.height().saturating_sub(1))?;
            }
        }

        Ok(workbook)
    }

    /// Serialized .xlsx bytes
    pub fn to_buffer(&self) -> MaudeResult<Vec<u8>> {
        let mut workbook = self.build()?;
        Ok(workbook.save_to_buffer()?)
    }

    fn write_indicators(
        &self,
        worksheet: &mut Worksheet,
        first_col: usize,
        data_rows: usize,
    ) -> MaudeResult<()> {
        let header = self.palette.header_format();
        let affirmative = self.palette.affirmative_format();
        let negative = self.palette.negative_format();

        for (offset, indicator) in self.indicators.iter().enumerate() {
            let col = (first_col + offset) as u16;
            worksheet.write_string_with_format(0, col, &indicator.name, &header)?;

            for (row_idx, &value) in indicator.values.iter().take(data_rows).enumerate() {
                let row = (row_idx + 1) as u32;
                match value {
                    1 => worksheet.write_number_with_format(row, col, 1, &affirmative)?,
                    0 => worksheet.write_number_with_format(row, col, 0, &negative)?,
                    other => worksheet.write_number(row, col, other)?,
                };
            }
        }

        debug!(
            sheet = %self.target_sheet,
            columns = self.indicators.len(),
            first_col,
            "wrote indicator columns"
        );
        Ok(())
    }
}

/// Write every original cell, reapplying the captured style of every
/// position inside the original column range.
fn write_original(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    styles: &SheetStyles,
    original_width: usize,
) -> MaudeResult<()> {
    for (r, row) in sheet.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let format = styles
                .get(r as u32, c as u16)
                .map(|style| style.to_format())
                .unwrap_or_else(Format::new);
            write_cell(worksheet, r as u32, c as u16, cell, &format)?;
        }
    }

    // Styled cells that hold no value
    for (&(row, col), style) in &styles.cells {
        if (col as usize) >= original_width {
            continue;
        }
        let has_value = sheet
            .rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .is_some_and(|cell| cell.formula.is_some() || !matches!(cell.value, CellValue::Empty));
        if !has_value {
            worksheet.write_blank(row, col, &style.to_format())?;
        }
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    format: &Format,
) -> MaudeResult<()> {
    if let Some(formula) = &cell.formula {
        let formula = Formula::new(formula).set_result(cell.value.to_string());
        worksheet.write_formula_with_format(row, col, formula, format)?;
        return Ok(());
    }

    match &cell.value {
        CellValue::Empty => {}
        CellValue::Text(text) | CellValue::Error(text) => {
            worksheet.write_string_with_format(row, col, text, format)?;
        }
        CellValue::Number(n) | CellValue::DateTime(n) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
    }
    Ok(())
}

/// Reapply row heights and column widths; zero or missing entries are skipped
fn restore_dimensions(worksheet: &mut Worksheet, styles: &SheetStyles) -> MaudeResult<()> {
    for (&row, &height) in &styles.row_heights {
        if height > 0.0 {
            worksheet.set_row_height(row, height)?;
        }
    }

    for (letter, &width) in &styles.column_widths {
        let Some(col) = column_index(letter) else {
            continue;
        };
        if width > 0.0 {
            worksheet.set_column_width_pixels(col, width_to_pixels(width))?;
        }
    }
    Ok(())
}

/// Merged ranges go in before the cells so that the original values and
/// edge styles overwrite the merge placeholders
fn restore_merges(worksheet: &mut Worksheet, styles: &SheetStyles) -> MaudeResult<()> {
    for range in styles.merged_ranges.iter().filter(|r| !r.is_single_cell()) {
        let format = styles
            .get(range.first_row, range.first_col)
            .map(|style| style.to_format())
            .unwrap_or_else(Format::new);
        worksheet.merge_range(
            range.first_row,
            range.first_col,
            range.last_row,
            range.last_col,
            "",
            &format,
        )?;
    }
    Ok(())
}

/// Autofilter, frozen panes, hidden rows and hidden columns
fn restore_view(worksheet: &mut Worksheet, styles: &SheetStyles) -> MaudeResult<()> {
    if let Some(range) = styles.autofilter {
        worksheet.autofilter(range.first_row, range.first_col, range.last_row, range.last_col)?;
    }
    if let Some((rows, cols)) = styles.freeze_panes {
        worksheet.set_freeze_panes(rows, cols)?;
    }
    for &row in &styles.hidden_rows {
        worksheet.set_row_hidden(row)?;
    }
    for &col in &styles.hidden_columns {
        worksheet.set_column_hidden(col)?;
    }
    Ok(())
}

/// Stored column width (character units incl. padding) to pixels, so that
/// re-saving keeps the width stable across runs
fn width_to_pixels(width: f64) -> u16 {
    let pixels = if width < 1.0 + 5.0 / 7.0 {
        width * 12.0
    } else {
        width * 7.0
    };
    pixels.round().clamp(0.0, u16::MAX as f64) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_to_pixels() {
        assert_eq!(width_to_pixels(8.43), 59);
        assert_eq!(width_to_pixels(20.7109375), 145);
        assert_eq!(width_to_pixels(0.5), 6);
    }

    #[test]
    fn test_default_palette() {
        let palette = IndicatorPalette::default();
        assert_eq!(palette.affirmative, 0x90EE90);
        assert_eq!(palette.negative, 0xFFB6C1);
    }
}
