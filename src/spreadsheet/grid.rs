//! Cell-grid abstraction the report heuristics read from.
//!
//! Coordinates are 1-based `(row, column)` pairs. Any position inside the
//! used range, or outside it, may be queried; positions without data read
//! back as an empty, unmerged cell.

use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;

/// Typed value of a worksheet cell.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Date or date-time (a date-formatted serial number in the source)
    DateTime(NaiveDateTime),
    /// Time of day without a date component
    Time(NaiveTime),
}

impl CellValue {
    /// True for missing cells and for empty strings.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            Self::Number(number) => write!(f, "{}", number),
            Self::Bool(value) => f.write_str(if *value { "TRUE" } else { "FALSE" }),
            Self::DateTime(datetime) if datetime.time() == NaiveTime::MIN => {
                write!(f, "{}", datetime.format("%Y-%m-%d"))
            }
            Self::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
            Self::Time(time) => write!(f, "{}", time.format("%H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_owned())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Snapshot of one cell: raw value, formatted text and merged-region size.
#[derive(Clone, Debug, PartialEq)]
pub struct CellView {
    /// Typed value as stored in the workbook
    pub value: CellValue,
    /// Value as displayed text
    pub text: String,
    /// Number of cells of the merged region containing this cell (1 when unmerged)
    pub merge_size: usize,
}

impl CellView {
    pub fn new(value: CellValue, merge_size: usize) -> Self {
        let text = value.to_string();
        Self {
            value,
            text,
            merge_size,
        }
    }

    pub fn empty() -> Self {
        Self::new(CellValue::Empty, 1)
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Read access to a worksheet as a grid of cells.
pub trait Grid {
    /// Returns the cell at the 1-based position.
    fn cell(&self, row: usize, col: usize) -> CellView;

    /// Returns `(last_row, last_column)` of the used range, `(0, 0)` for an empty sheet.
    fn used_range(&self) -> (usize, usize);
}

#[cfg(test)]
pub(crate) use testing::MatrixGrid;
