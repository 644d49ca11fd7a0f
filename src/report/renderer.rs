//! Lays recovered segments out in an output worksheet.
use crate::config::Locale;
use crate::config::Options;
use crate::error::ReportError;
use crate::report::Segment;
use crate::report::Table;
use crate::spreadsheet::CellValue;
use crate::writer::CellStyle;
use crate::writer::Worksheet;
use log::debug;

/// Column the table grids start at; column 1 holds text lines and titles.
const TABLE_COLUMN: usize = 2;
/// Blank rows left after every table.
const ROWS_AFTER_TABLE: usize = 2;

/// Writes segments top to bottom starting at row 1.
///
/// Text lines take one row each in column 1. A table takes a blank row,
/// a bold title in column 1, then its column names and data rows from
/// column 2, registered as a table object named after its header row,
/// followed by two blank rows.
pub struct Renderer<'a> {
    options: Options,
    locale: &'a Locale,
}

impl<'a> Renderer<'a> {
    pub fn new(options: Options, locale: &'a Locale) -> Self {
        Self { options, locale }
    }

    pub fn render<I>(&self, segments: I, sheet: &mut Worksheet) -> Result<(), ReportError>
    where
        I: IntoIterator<Item = Segment>,
    {
        let mut row = 1;
        let mut columns_fitted = false;
        for segment in segments {
            match segment {
                Segment::TextLine(text) => {
                    sheet.set_value(row, 1, text);
                    row += 1;
                }
                Segment::Table(table) => {
                    row += 1;
                    sheet.set_value(row, 1, table.name.as_str());
                    sheet.set_style(row, 1, CellStyle::Bold);
                    row += 1;
                    let rows_written = self.render_table(&table, row, sheet, !columns_fitted)?;
                    columns_fitted = true;
                    row += rows_written + ROWS_AFTER_TABLE;
                }
            }
        }
        Ok(())
    }

    /// Writes the table grid with its header at `header_row`; returns the rows written.
    fn render_table(
        &self,
        table: &Table,
        header_row: usize,
        sheet: &mut Worksheet,
        fit_columns: bool,
    ) -> Result<usize, ReportError> {
        if table.columns.is_empty() {
            debug!("Table '{}' has no columns, only its title is written", table.name);
            return Ok(0);
        }

        let data_rows = sheet.import_rows(table, header_row, TABLE_COLUMN);
        let last_col = TABLE_COLUMN + table.columns.len() - 1;

        if data_rows > 0 && self.options.time_column_fixup {
            self.fix_time_columns(table, header_row, data_rows, sheet);
        }

        if fit_columns {
            for col in TABLE_COLUMN..=last_col {
                sheet.autofit_column(col);
            }
        }

        let last_row = header_row + data_rows.max(1);
        let name = format!("Table{header_row}");
        let object = sheet.add_table(&name, (header_row, TABLE_COLUMN), (last_row, last_col))?;
        debug!("Rendered '{}' as {} over {}", table.name, object.name, object.range());
        Ok(1 + data_rows)
    }

    /// Keeps only the time of day in date-time cells of time columns.
    fn fix_time_columns(&self, table: &Table, header_row: usize, data_rows: usize, sheet: &mut Worksheet) {
        for (offset, name) in table.columns.iter().enumerate() {
            if !self.locale.is_time_column(name) {
                continue;
            }
            let col = TABLE_COLUMN + offset;
            for row in header_row + 1..=header_row + data_rows {
                if let Some(CellValue::DateTime(datetime)) = sheet.value(row, col) {
                    let time = datetime.time();
                    sheet.set_value(row, col, CellValue::Time(time));
                }
                sheet.set_style(row, col, CellStyle::Time);
            }
        }
    }
}
