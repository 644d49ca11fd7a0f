//! # Writer Module
//!
//! In-memory model of the output workbook: a single worksheet with typed
//! cells, cell styles, column widths and table objects. [`Workbook::save`]
//! serializes it as an XLSX package.
pub(crate) mod package;

use crate::error::ReportError;
use crate::report::Table;
use crate::spreadsheet::reference::indexes_to_range;
use crate::spreadsheet::CellValue;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::io::Seek;
use std::io::Write;
use thiserror::Error;

/// Widest column Excel accepts, in characters.
const MAX_COLUMN_WIDTH: f64 = 255.0;
/// Extra characters added to the longest value when fitting a column.
const COLUMN_PADDING: f64 = 2.0;
/// Sheet names are limited to this many characters.
const MAX_SHEET_NAME_CHARS: usize = 31;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Table name '{0}' is already used")]
    DuplicateTableError(String),

    #[error("Invalid table range '{0}'")]
    TableRangeError(String),
}

/// Display style of an output cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellStyle {
    #[default]
    Normal,
    Bold,
    Date,
    DateTime,
    /// 12-hour time of day
    Time,
}

impl CellStyle {
    /// Default style for a value: dates and times need a number format to display.
    fn for_value(value: &CellValue) -> Self {
        match value {
            CellValue::DateTime(datetime) if datetime.time() == chrono::NaiveTime::MIN => Self::Date,
            CellValue::DateTime(_) => Self::DateTime,
            CellValue::Time(_) => Self::Time,
            _ => Self::Normal,
        }
    }
}

/// A named list object over a rectangular range; the first row holds the column names.
#[derive(Clone, Debug, PartialEq)]
pub struct TableObject {
    pub name: String,
    pub first: (usize, usize),
    pub last: (usize, usize),
    /// Unique, non-empty column names, equal to the header cells
    pub columns: Vec<String>,
}

impl TableObject {
    /// A1-style range of the table, e.g. `B5:C6`.
    pub fn range(&self) -> String {
        indexes_to_range(self.first, self.last)
    }
}

/// The single worksheet of an output workbook.
#[derive(Debug, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(usize, usize), CellValue>,
    styles: BTreeMap<(usize, usize), CellStyle>,
    widths: BTreeMap<usize, f64>,
    tables: Vec<TableObject>,
}

impl Worksheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: sheet_name(name),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes a value at the 1-based position; an empty value clears the cell.
    pub fn set_value<V: Into<CellValue>>(&mut self, row: usize, col: usize, value: V) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    pub fn set_style(&mut self, row: usize, col: usize, style: CellStyle) {
        if style == CellStyle::Normal {
            self.styles.remove(&(row, col));
        } else {
            self.styles.insert((row, col), style);
        }
    }

    pub fn style(&self, row: usize, col: usize) -> CellStyle {
        self.styles.get(&(row, col)).copied().unwrap_or_default()
    }

    /// Writes the table as a grid at `(row, col)`: column names first, then one row per data row.
    ///
    /// Fields land in the column of their header position; date and time values get
    /// a matching display style. Returns the number of data rows written.
    pub fn import_rows(&mut self, table: &Table, row: usize, col: usize) -> usize {
        for (offset, name) in table.columns.iter().enumerate() {
            self.set_value(row, col + offset, name.as_str());
        }
        for (index, data) in table.rows.iter().enumerate() {
            let target_row = row + 1 + index;
            for field in &data.fields {
                let target_col = col + field.column;
                self.set_style(target_row, target_col, CellStyle::for_value(&field.value));
                self.set_value(target_row, target_col, field.value.to_owned());
            }
        }
        table.rows.len()
    }

    /// Sizes the column to its longest rendered value.
    pub fn autofit_column(&mut self, col: usize) {
        let longest = self
            .cells
            .iter()
            .filter(|((_, cell_col), _)| *cell_col == col)
            .map(|(_, value)| value.to_string().chars().count())
            .max();
        if let Some(longest) = longest {
            let width = (longest as f64 + COLUMN_PADDING).min(MAX_COLUMN_WIDTH);
            self.widths.insert(col, width);
        }
    }

    pub fn column_width(&self, col: usize) -> Option<f64> {
        self.widths.get(&col).copied()
    }

    /// Registers a table object over `first..=last`.
    ///
    /// Column names come from the first row of the range. Duplicates get a
    /// numeric suffix and blanks become `ColumnN`; the header cells are
    /// rewritten to match, as list objects require unique captions.
    pub fn add_table(
        &mut self,
        name: &str,
        first: (usize, usize),
        last: (usize, usize),
    ) -> Result<&TableObject, ReportError> {
        if first.0 == 0 || first.1 == 0 || last.0 <= first.0 || last.1 < first.1 {
            Err(WriterError::TableRangeError(format!("{name} {first:?}..{last:?}")))?
        }
        if self.tables.iter().any(|table| table.name.eq_ignore_ascii_case(name)) {
            Err(WriterError::DuplicateTableError(name.to_owned()))?
        }

        let captions: Vec<String> = (first.1..=last.1)
            .map(|col| self.value(first.0, col).map(CellValue::to_string).unwrap_or_default())
            .collect();
        let columns = unique_column_names(&captions);
        for (offset, column) in columns.iter().enumerate() {
            self.set_value(first.0, first.1 + offset, column.as_str());
        }

        self.tables.push(TableObject {
            name: name.to_owned(),
            first,
            last,
            columns,
        });
        Ok(&self.tables[self.tables.len() - 1])
    }

    pub fn tables(&self) -> &[TableObject] {
        &self.tables
    }

    /// `(last_row, last_col)` over written cells and table ranges.
    pub fn used_range(&self) -> (usize, usize) {
        let cells = self.cells.keys().copied();
        let tables = self.tables.iter().map(|table| table.last);
        cells.chain(tables).fold((0, 0), |(last_row, last_col), (row, col)| {
            (last_row.max(row), last_col.max(col))
        })
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = (&(usize, usize), &CellValue)> {
        self.cells.iter()
    }

    pub(crate) fn widths(&self) -> impl Iterator<Item = (&usize, &f64)> {
        self.widths.iter()
    }
}

/// An output workbook holding one worksheet.
#[derive(Debug)]
pub struct Workbook {
    worksheet: Worksheet,
}

impl Workbook {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            worksheet: Worksheet::new(sheet_name),
        }
    }

    pub fn worksheet(&self) -> &Worksheet {
        &self.worksheet
    }

    pub fn worksheet_mut(&mut self) -> &mut Worksheet {
        &mut self.worksheet
    }

    /// Writes the workbook as an XLSX package and hands the stream back.
    pub fn save<W: Write + Seek>(&self, writer: W) -> Result<W, ReportError> {
        package::write_package(self, writer)
    }
}

/// Makes list-object column names unique (case-insensitively) and non-empty.
fn unique_column_names(captions: &[String]) -> Vec<String> {
    let mut seen = HashSet::<String>::new();
    captions
        .iter()
        .enumerate()
        .map(|(index, caption)| {
            let base = if caption.trim().is_empty() {
                format!("Column{}", index + 1)
            } else {
                caption.to_owned()
            };
            let mut name = base.to_owned();
            let mut suffix = 2;
            while !seen.insert(name.to_lowercase()) {
                name = format!("{base}{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}

/// Replaces characters Excel rejects in sheet names and truncates to its limit.
fn sheet_name(name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    if name.trim().is_empty() {
        "Sheet1".to_owned()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Field;
    use crate::report::Row;
    use chrono::NaiveDate;

    fn table() -> Table {
        Table {
            name: "Сделки".to_owned(),
            columns: vec!["Дата".to_owned(), "Сумма".to_owned()],
            rows: vec![
                Row {
                    fields: vec![Field { column: 1, name: "Сумма".to_owned(), value: CellValue::Number(100.5) }],
                },
                Row {
                    fields: vec![Field {
                        column: 0,
                        name: "Дата".to_owned(),
                        value: CellValue::DateTime(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap().and_hms_opt(0, 0, 0).unwrap()),
                    }],
                },
            ],
        }
    }

    #[test]
    fn values_and_styles() {
        let mut sheet = Worksheet::new("Отчет");
        sheet.set_value(1, 1, "Отчёт");
        sheet.set_style(1, 1, CellStyle::Bold);
        assert_eq!(sheet.value(1, 1), Some(&CellValue::from("Отчёт")));
        assert_eq!(sheet.style(1, 1), CellStyle::Bold);
        assert_eq!(sheet.style(2, 2), CellStyle::Normal);

        sheet.set_value(1, 1, "");
        assert_eq!(sheet.value(1, 1), None);
        assert_eq!(sheet.used_range(), (0, 0));
    }

    #[test]
    fn import_writes_header_then_sparse_rows() {
        let mut sheet = Worksheet::new("");
        let rows = sheet.import_rows(&table(), 5, 2);

        assert_eq!(rows, 2);
        assert_eq!(sheet.value(5, 2), Some(&CellValue::from("Дата")));
        assert_eq!(sheet.value(5, 3), Some(&CellValue::from("Сумма")));
        assert_eq!(sheet.value(6, 2), None);
        assert_eq!(sheet.value(6, 3), Some(&CellValue::Number(100.5)));
        assert_eq!(sheet.style(7, 2), CellStyle::Date);
        assert_eq!(sheet.used_range(), (7, 3));
    }

    #[test]
    fn autofit_uses_longest_value() {
        let mut sheet = Worksheet::new("");
        sheet.set_value(1, 2, "Сумма");
        sheet.set_value(2, 2, 1234.5);
        sheet.set_value(3, 2, "x".repeat(400));
        sheet.autofit_column(2);
        sheet.autofit_column(3);

        assert_eq!(sheet.column_width(2), Some(255.0));
        assert_eq!(sheet.column_width(3), None);

        sheet.set_value(3, 2, "");
        sheet.autofit_column(2);
        assert_eq!(sheet.column_width(2), Some(8.0));
    }

    #[test]
    fn table_columns_are_made_unique() {
        let mut sheet = Worksheet::new("");
        for (col, caption) in ["Сумма", "сумма", "", "Сумма"].iter().enumerate() {
            sheet.set_value(1, col + 1, *caption);
        }
        let table = sheet.add_table("Table1", (1, 1), (2, 4)).unwrap();

        assert_eq!(table.columns, vec!["Сумма", "сумма2", "Column3", "Сумма3"]);
        assert_eq!(table.range(), "A1:D2");
        assert_eq!(sheet.value(1, 3), Some(&CellValue::from("Column3")));
    }

    #[test]
    fn table_names_and_ranges_are_checked() {
        let mut sheet = Worksheet::new("");
        sheet.set_value(1, 1, "A");
        assert!(sheet.add_table("Table1", (1, 1), (2, 1)).is_ok());
        assert!(sheet.add_table("table1", (4, 1), (5, 1)).is_err());
        assert!(sheet.add_table("Table4", (4, 2), (4, 2)).is_err());
        assert!(sheet.add_table("Table5", (5, 3), (6, 2)).is_err());
        assert_eq!(sheet.tables().len(), 1);
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(Worksheet::new("Отчет 1/2").name(), "Отчет 1_2");
        assert_eq!(Worksheet::new("").name(), "Sheet1");
        assert_eq!(Worksheet::new(&"я".repeat(40)).name().chars().count(), 31);
    }
}
