//! # Report Module
//!
//! Recovers the logical structure of a broker report worksheet (runs of
//! free text and titled data tables) and writes it back as a clean sheet.
//!
//! [`Segmenter`] walks the worksheet and yields [`Segment`]s in source order;
//! tables are assembled by the builder; [`Renderer`] lays the segments out
//! in an output worksheet.
pub(crate) mod builder;
pub mod layout;
pub mod renderer;
pub mod segmenter;

pub use renderer::Renderer;
pub use segmenter::Segmenter;

use crate::spreadsheet::CellValue;

/// One unit of recovered report structure.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// Free text taken from the anchor column of a single row
    TextLine(String),
    /// A titled data table
    Table(Table),
}

/// A data table recovered from the report.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Caption from the title row
    pub name: String,
    /// Column names in header order; names may repeat
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }
}

/// A sparse data row: only columns with a value are present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub fields: Vec<Field>,
}

/// A populated cell of a data row.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// Position of the column in [`Table::columns`]
    pub column: usize,
    pub name: String,
    pub value: CellValue,
}

impl Row {
    /// Value of the first column with this name.
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }

    /// Value of the column at this position.
    pub fn at(&self, column: usize) -> Option<&CellValue> {
        self.fields.iter().find(|field| field.column == column).map(|field| &field.value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_by_name_and_position() {
        let row = Row {
            fields: vec![
                Field { column: 0, name: "Сумма".to_owned(), value: CellValue::Number(1.0) },
                Field { column: 2, name: "Сумма".to_owned(), value: CellValue::Number(2.0) },
            ],
        };
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("Сумма"), Some(&CellValue::Number(1.0)));
        assert_eq!(row.at(2), Some(&CellValue::Number(2.0)));
        assert_eq!(row.at(1), None);
        assert_eq!(row.get("Дата"), None);
    }
}
