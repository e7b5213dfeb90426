//! Excel (.xlsx) reading, style capture and writing
//!
//! - Import: values and formulas through calamine, styles from the package XML
//! - Export: a rebuilt workbook through rust_xlsxwriter

mod exporter;
mod importer;
pub mod styles;
pub mod validator;

pub use exporter::{IndicatorPalette, WorkbookExporter};
pub use importer::{LoadedWorkbook, WorkbookImporter};
pub use styles::{CellStyle, SheetStyles, WorkbookStyles};
pub use validator::validate_file;
