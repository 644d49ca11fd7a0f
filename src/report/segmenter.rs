//! Top-to-bottom scan of a report worksheet into text lines and tables.
use crate::config::Locale;
use crate::config::Options;
use crate::error::ReportError;
use crate::report::builder::build_table;
use crate::report::layout::Layout;
use crate::report::Segment;
use crate::spreadsheet::Grid;

/// Cursor over the segments of a worksheet, in source order.
///
/// Every row up to the end of the used range is accounted for: a title row
/// yields a [`Segment::Table`] covering the rows the table consumed, any
/// other row yields a [`Segment::TextLine`] with its anchor-column text
/// (empty for blank rows).
pub struct Segmenter<'a, G: Grid> {
    layout: Layout<'a, G>,
    row: usize,
}

impl<'a, G: Grid> Segmenter<'a, G> {
    /// Resolves the anchor column and positions the cursor at row 1.
    pub fn new(grid: &'a G, options: Options, locale: &'a Locale) -> Result<Self, ReportError> {
        Ok(Self {
            layout: Layout::new(grid, options, locale)?,
            row: 1,
        })
    }

    /// Moves the cursor to another starting row.
    pub fn starting_at(mut self, row: usize) -> Self {
        self.row = row.max(1);
        self
    }

    /// Row the next segment starts at.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Column the row classification reads from.
    pub fn anchor(&self) -> usize {
        self.layout.anchor
    }
}

impl<G: Grid> Iterator for Segmenter<'_, G> {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row > self.layout.last_row {
            return None;
        }
        if self.layout.is_table_title(self.row) {
            let (table, next_row) = build_table(&self.layout, self.row);
            self.row = next_row;
            Some(Segment::Table(table))
        } else {
            let text = self.layout.anchor_text(self.row);
            self.row += 1;
            Some(Segment::TextLine(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Table;
    use crate::spreadsheet::grid::MatrixGrid;
    use crate::spreadsheet::CellValue;

    fn segments(grid: &MatrixGrid, options: Options) -> Vec<Segment> {
        let locale = Locale::russian();
        Segmenter::new(grid, options, &locale).unwrap().collect()
    }

    fn text(content: &str) -> Segment {
        Segment::TextLine(content.to_owned())
    }

    #[test]
    fn report_with_one_table() {
        let grid = MatrixGrid::from_rows(&[
            &["Отчёт", ""],
            &["за период", ""],
            &["Сделки", ""],
            &["Дата", "Сумма"],
            &["01.01.2024", "100,50"],
            &["Конец", ""],
        ])
        .with_merge(3, 1, 120);
        let segments = segments(&grid, Options::default());

        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], text("Отчёт"));
        assert_eq!(segments[1], text("за период"));
        let Segment::Table(table) = &segments[2] else {
            panic!("expected a table, got {:?}", segments[2]);
        };
        assert_eq!(table.name, "Сделки");
        assert_eq!(table.columns, vec!["Дата", "Сумма"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("Дата"), Some(&CellValue::from("01.01.2024")));
        assert_eq!(table.rows[0].get("Сумма"), Some(&CellValue::Number(100.5)));
        assert_eq!(segments[3], text("Конец"));
    }

    #[test]
    fn blank_rows_are_kept_as_empty_lines() {
        let grid = MatrixGrid::from_rows(&[&["Отчёт"], &[""], &["Итог"]]);
        assert_eq!(segments(&grid, Options::default()), vec![text("Отчёт"), text(""), text("Итог")]);
    }

    #[test]
    fn text_reads_from_the_anchor_column() {
        let grid = MatrixGrid::from_rows(&[&["", "Отчёт"], &["мусор", "строка"]]);
        let locale = Locale::russian();
        let segmenter = Segmenter::new(&grid, Options::default(), &locale).unwrap();
        assert_eq!(segmenter.anchor(), 2);
        assert_eq!(segmenter.collect::<Vec<_>>(), vec![text("Отчёт"), text("строка")]);

        let options = Options { anchor_probe: false, ..Options::default() };
        assert_eq!(segments(&grid, options), vec![text(""), text("мусор")]);
    }

    #[test]
    fn consecutive_tables() {
        let grid = MatrixGrid::from_rows(&[
            &["Первая", ""],
            &["A", "B"],
            &["1", "2"],
            &["Вторая", ""],
            &["1 из 2", ""],
            &["C", "D"],
            &["3", "4"],
            &["C", "D"],
            &["5", ""],
            &["Подпись", ""],
        ])
        .with_merge(1, 1, 120)
        .with_merge(4, 1, 120);
        let segments = segments(&grid, Options::default());

        let tables: Vec<&Table> = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Table(table) => Some(table),
                Segment::TextLine(_) => None,
            })
            .collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "Первая");
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[1].name, "Вторая");
        assert_eq!(tables[1].columns, vec!["C", "D"]);
        assert_eq!(tables[1].rows.len(), 2);
        assert_eq!(tables[1].rows[1].get("C"), Some(&CellValue::Number(5.0)));
        assert_eq!(tables[1].rows[1].get("D"), None);
        assert_eq!(segments[2], text("Подпись"));
    }

    #[test]
    fn resumes_from_a_starting_row() {
        let grid = MatrixGrid::from_rows(&[&["a"], &["b"], &["c"]]);
        let locale = Locale::russian();
        let mut segmenter = Segmenter::new(&grid, Options::default(), &locale).unwrap().starting_at(2);
        assert_eq!(segmenter.next(), Some(text("b")));
        assert_eq!(segmenter.row(), 3);
        assert_eq!(segmenter.next(), Some(text("c")));
        assert_eq!(segmenter.next(), None);
        assert_eq!(segmenter.next(), None);
    }

    #[test]
    fn unrecognized_layout_is_an_error() {
        let grid = MatrixGrid::from_rows(&[]);
        let locale = Locale::russian();
        assert!(Segmenter::new(&grid, Options::default(), &locale).is_err());
    }
}
