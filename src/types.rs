use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

//==============================================================================
// Cell values
//==============================================================================

/// A single cell value as read from a worksheet
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date-time
    DateTime(f64),
    /// Error literal such as `#N/A`
    Error(String),
}

impl CellValue {
    /// True for blank cells and empty strings
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Empty => 0,
            CellValue::Number(_) => 1,
            CellValue::DateTime(_) => 2,
            CellValue::Bool(_) => 3,
            CellValue::Text(_) => 4,
            CellValue::Error(_) => 5,
        }
    }

    /// Total "natural" ordering used to sort distinct values: numbers,
    /// date-times, booleans, text, errors.
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b))
            | (CellValue::DateTime(a), CellValue::DateTime(b)) => a.total_cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) | (CellValue::Error(a), CellValue::Error(b)) => {
                a.cmp(b)
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) | CellValue::Error(s) => write!(f, "{s}"),
            CellValue::Number(n) | CellValue::DateTime(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
        }
    }
}

/// A cell value with the formula that produced it, if any
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub formula: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            formula: None,
        }
    }
}

//==============================================================================
// Sheets and datasets
//==============================================================================

/// A worksheet grid addressed absolutely from A1 (row 0 is the header row)
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Widest row in the grid
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or(&EMPTY, |c| &c.value)
    }

    /// Header names made unique: blank headers become `Unnamed: <idx>`,
    /// repeats get a `.<n>` suffix
    pub fn column_names(&self) -> Vec<String> {
        let width = self.width();
        let mut names: Vec<String> = Vec::with_capacity(width);
        for col in 0..width {
            let raw = self.value(0, col);
            let base = if raw.is_null() {
                format!("Unnamed: {col}")
            } else {
                raw.to_string()
            };
            let mut name = base.clone();
            let mut n = 1;
            while names.contains(&name) {
                name = format!("{base}.{n}");
                n += 1;
            }
            names.push(name);
        }
        names
    }
}

/// Tabular view over the target sheet: unique column names plus data rows
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn from_sheet(sheet: &Sheet) -> Self {
        let columns = sheet.column_names();
        let width = columns.len();
        let rows = (1..sheet.height())
            .map(|r| (0..width).map(|c| sheet.value(r, c).clone()).collect())
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

//==============================================================================
// Categories and indicator columns
//==============================================================================

/// One categorical source: columns whose name contains `pattern`, indicator
/// columns named `<prefix>_<value>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub pattern: String,
    pub prefix: String,
}

impl Category {
    pub fn new(name: &str, pattern: &str, prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            prefix: prefix.to_string(),
        }
    }

    pub fn device_problem() -> Self {
        Self::new("Device Problems", "Device Problem", "Device")
    }

    pub fn patient_problem() -> Self {
        Self::new("Patient Problems", "Patient Problem", "Patient")
    }

    pub fn patient_outcome() -> Self {
        Self::new("Patient Outcomes", "Patient Outcome", "Outcome")
    }

    /// The three MAUDE categories in processing order
    pub fn defaults() -> Vec<Category> {
        vec![
            Self::device_problem(),
            Self::patient_problem(),
            Self::patient_outcome(),
        ]
    }
}

/// A derived 0/1 column flagging rows that contain `source_value`
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub name: String,
    pub category: String,
    pub source_value: CellValue,
    pub values: Vec<u8>,
}

impl IndicatorColumn {
    pub fn flagged_rows(&self) -> usize {
        self.values.iter().filter(|&&v| v == 1).count()
    }
}
