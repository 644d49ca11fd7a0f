//! Assembles one data table starting at a confirmed title row.
use crate::report::layout::Layout;
use crate::report::Field;
use crate::report::Row;
use crate::report::Table;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Grid;
use log::debug;

/// A header column: worksheet column and caption.
struct Header {
    col: usize,
    name: String,
}

/// Builds the table whose title is at `title_row`.
///
/// Returns the table and the first row that does not belong to it: a new
/// title row, or the last row of the used range, which is always left to the
/// caller as free text.
pub(crate) fn build_table<G: Grid>(layout: &Layout<'_, G>, title_row: usize) -> (Table, usize) {
    let mut table = Table::new(&layout.anchor_text(title_row));
    let mut row = title_row + 1;

    if layout.is_page_break(row) {
        debug!("Skip page break at row {row} under '{}'", table.name);
        row += 1;
    }

    let headers = read_headers(layout, row);
    table.columns = headers.iter().map(|header| header.name.to_owned()).collect();

    row += 1;
    while row < layout.last_row && !layout.is_table_title(row) {
        if !is_repeated_header(layout, &headers, row) {
            let data = read_row(layout, &headers, row);
            if !data.is_empty() {
                table.rows.push(data);
            }
        }
        row += 1;
    }

    debug!(
        "Table '{}' at row {}: {} columns, {} rows",
        table.name,
        title_row,
        table.columns.len(),
        table.rows.len()
    );
    (table, row)
}

fn read_headers<G: Grid>(layout: &Layout<'_, G>, row: usize) -> Vec<Header> {
    let grid = layout.grid();
    (layout.anchor..=layout.last_col)
        .filter_map(|col| {
            let cell = grid.cell(row, col);
            (!cell.value.is_empty()).then(|| Header {
                col,
                name: strip_newlines(&cell.text),
            })
        })
        .collect()
}

/// Page-continuation header: every header column repeats its caption.
fn is_repeated_header<G: Grid>(layout: &Layout<'_, G>, headers: &[Header], row: usize) -> bool {
    let grid = layout.grid();
    headers
        .iter()
        .all(|header| strip_newlines(&grid.cell(row, header.col).text) == header.name)
}

fn read_row<G: Grid>(layout: &Layout<'_, G>, headers: &[Header], row: usize) -> Row {
    let grid = layout.grid();
    let fields = headers
        .iter()
        .enumerate()
        .filter_map(|(column, header)| {
            let value = grid.cell(row, header.col).value;
            (!value.is_empty()).then(|| Field {
                column,
                name: header.name.to_owned(),
                value: coerce(layout, value),
            })
        })
        .collect();
    Row { fields }
}

/// Locale-aware number parsing of textual values; anything else is kept as is.
fn coerce<G: Grid>(layout: &Layout<'_, G>, value: CellValue) -> CellValue {
    if !layout.options.numeric_coercion {
        return value;
    }
    match value {
        CellValue::Text(text) => match layout.locale.parse_number(&text) {
            Some(number) => CellValue::Number(number),
            None => CellValue::Text(text),
        },
        value => value,
    }
}

fn strip_newlines(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Locale;
    use crate::config::Options;
    use crate::spreadsheet::grid::MatrixGrid;

    fn build(grid: &MatrixGrid, options: Options, title_row: usize) -> (Table, usize) {
        let locale = Locale::russian();
        let layout = Layout::new(grid, options, &locale).unwrap();
        build_table(&layout, title_row)
    }

    fn number(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    #[test]
    fn repeated_headers_are_skipped() {
        let grid = MatrixGrid::from_rows(&[
            &["T", ""],
            &["A", "B"],
            &["1", "2"],
            &["A", "B"],
            &["3", "4"],
            &["", ""],
        ])
        .with_merge(1, 1, 120);
        let (table, next) = build(&grid, Options::default(), 1);

        assert_eq!(table.name, "T");
        assert_eq!(table.columns, vec!["A", "B"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("A"), Some(&number(1.0)));
        assert_eq!(table.rows[0].get("B"), Some(&number(2.0)));
        assert_eq!(table.rows[1].get("A"), Some(&number(3.0)));
        assert_eq!(table.rows[1].get("B"), Some(&number(4.0)));
        assert_eq!(next, 6);
    }

    #[test]
    fn rows_are_sparse() {
        let grid = MatrixGrid::from_rows(&[
            &["T", "", ""],
            &["A", "B", "C"],
            &["x", "", ""],
            &["", "", ""],
            &["", "", "z"],
            &["Конец", "", ""],
        ])
        .with_merge(1, 1, 120);
        let (table, next) = build(&grid, Options::default(), 1);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].len(), 1);
        assert_eq!(table.rows[0].get("A"), Some(&CellValue::from("x")));
        assert_eq!(table.rows[0].get("B"), None);
        assert_eq!(table.rows[1].fields, vec![Field { column: 2, name: "C".to_owned(), value: CellValue::from("z") }]);
        assert_eq!(next, 6);
    }

    #[test]
    fn numeric_coercion() {
        let grid = MatrixGrid::from_rows(&[
            &["T", "", ""],
            &["Операция", "Сумма", "Дата"],
            &["Покупка", "1 234,56", "01.01.2024"],
            &[""],
        ])
        .with_merge(1, 1, 120);
        let (table, _) = build(&grid, Options::default(), 1);
        let row = &table.rows[0];
        assert_eq!(row.get("Операция"), Some(&CellValue::from("Покупка")));
        assert_eq!(row.get("Сумма"), Some(&number(1234.56)));
        assert_eq!(row.get("Дата"), Some(&CellValue::from("01.01.2024")));

        let options = Options { numeric_coercion: false, ..Options::default() };
        let (table, _) = build(&grid, options, 1);
        assert_eq!(table.rows[0].get("Сумма"), Some(&CellValue::from("1 234,56")));
    }

    #[test]
    fn typed_values_are_kept() {
        let grid = MatrixGrid::from_rows(&[&["T", ""], &["Кол-во", "Флаг"], &[], &[""]])
            .with_merge(1, 1, 120)
            .with_value(3, 1, number(7.0))
            .with_value(3, 2, CellValue::Bool(false));
        let (table, _) = build(&grid, Options::default(), 1);
        assert_eq!(table.rows[0].get("Кол-во"), Some(&number(7.0)));
        assert_eq!(table.rows[0].get("Флаг"), Some(&CellValue::Bool(false)));
    }

    #[test]
    fn page_break_under_title_is_skipped() {
        let grid = MatrixGrid::from_rows(&[
            &["Сделки", ""],
            &["1 из 3", ""],
            &["Дата", "Сумма"],
            &["01.01.2024", "100,50"],
            &[""],
        ])
        .with_merge(1, 1, 120);
        let (table, next) = build(&grid, Options::default(), 1);
        assert_eq!(table.columns, vec!["Дата", "Сумма"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("Сумма"), Some(&number(100.5)));
        assert_eq!(next, 5);
    }

    #[test]
    fn header_names_lose_newlines() {
        let grid = MatrixGrid::from_rows(&[
            &["T", "", "", ""],
            &["Цена\nсделки", "", "Валюта\r\n", ""],
            &["Цена\nсделки", "", "Валюта\r\n", ""],
            &["10", "", "RUB", ""],
            &["x", "", "", ""],
        ])
        .with_merge(1, 1, 120);
        let (table, _) = build(&grid, Options::default(), 1);
        assert_eq!(table.columns, vec!["Ценасделки", "Валюта"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].at(1), Some(&CellValue::from("RUB")));
    }

    #[test]
    fn table_stops_at_next_title() {
        let grid = MatrixGrid::from_rows(&[
            &["Первая", ""],
            &["A", "B"],
            &["Вторая", ""],
            &["C", ""],
            &["1", ""],
            &[""],
        ])
        .with_merge(1, 1, 120)
        .with_merge(3, 1, 120);
        let (table, next) = build(&grid, Options::default(), 1);
        assert!(table.rows.is_empty());
        assert_eq!(next, 3);

        let (table, next) = build(&grid, Options::default(), 3);
        assert_eq!(table.columns, vec!["C"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(next, 6);
    }

    #[test]
    fn duplicate_column_names_keep_positions() {
        let grid = MatrixGrid::from_rows(&[&["T", ""], &["Сумма", "Сумма"], &["1", "2"], &[""]])
            .with_merge(1, 1, 120);
        let (table, _) = build(&grid, Options::default(), 1);
        assert_eq!(table.columns, vec!["Сумма", "Сумма"]);
        assert_eq!(table.rows[0].at(0), Some(&number(1.0)));
        assert_eq!(table.rows[0].at(1), Some(&number(2.0)));
    }

    #[test]
    fn table_without_headers_has_no_rows() {
        let grid = MatrixGrid::from_rows(&[&["T", ""], &["", ""], &["1", "2"], &[""]])
            .with_merge(1, 1, 120);
        let (table, next) = build(&grid, Options::default(), 1);
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(next, 4);
    }
}
