//! # Spreadsheet Module
//!
//! Reads XLSX workbooks into an in-memory cell grid. The report heuristics
//! only see the [`Grid`] trait, so tests can drive them from a plain matrix.
pub(crate) mod cell;
pub(crate) mod excel;
pub mod grid;
pub(crate) mod reference;
pub mod sheet;
pub mod xlsx;

pub use grid::CellValue;
pub use grid::CellView;
pub use grid::Grid;
pub use sheet::Sheet;
pub use xlsx::XlsxWorkbook;

use thiserror::Error;

/// Errors raised while reading a workbook package.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required package part is missing
    #[error("Missing package part '{0}'")]
    FileError(String),

    /// The file is an OLE compound document (password protected, or legacy binary format)
    #[error("Workbook '{0}' is encrypted or not an OOXML package")]
    CompoundFileError(String),

    /// The workbook lists no worksheets
    #[error("Workbook '{0}' contains no worksheets")]
    EmptyWorkbookError(String),

    /// A cell value does not match its declared type
    #[error("Invalid cell value at '{0}': {1}")]
    CellValueError(String, String),
}
