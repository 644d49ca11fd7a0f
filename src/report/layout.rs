//! Row classifiers shared by the segmenter and the table builder.
use crate::config::Locale;
use crate::config::Options;
use crate::error::ReportError;
use crate::spreadsheet::Grid;
use log::debug;
use thiserror::Error;

/// Side of the square block probed for the anchor column.
const PROBE_SIZE: usize = 10;
/// Merged regions this large or larger are banners, not column captions.
const HEADER_MERGE_LIMIT: usize = 60;
/// Title cells are merged over more cells than this.
const TITLE_MERGE_MIN: usize = 100;
/// Page footers are shorter than this many characters.
const PAGE_BREAK_MAX_CHARS: usize = 15;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("No text found in the top-left {0}x{0} cells, cannot locate the anchor column")]
    NoAnchorError(usize),
}

/// Read-only view of a worksheet with its anchor column resolved.
pub struct Layout<'a, G: Grid> {
    grid: &'a G,
    pub(crate) options: Options,
    pub(crate) locale: &'a Locale,
    /// Column all row classification reads from
    pub(crate) anchor: usize,
    pub(crate) last_row: usize,
    pub(crate) last_col: usize,
}

impl<'a, G: Grid> Layout<'a, G> {
    pub fn new(grid: &'a G, options: Options, locale: &'a Locale) -> Result<Self, ReportError> {
        let anchor = if options.anchor_probe {
            probe_anchor(grid).ok_or(LayoutError::NoAnchorError(PROBE_SIZE))?
        } else {
            1
        };
        let (last_row, last_col) = grid.used_range();
        debug!("Anchor column {anchor}, used range {last_row}x{last_col}");
        Ok(Self {
            grid,
            options,
            locale,
            anchor,
            last_row,
            last_col,
        })
    }

    pub(crate) fn grid(&self) -> &'a G {
        self.grid
    }

    /// Formatted text of the anchor cell.
    pub(crate) fn anchor_text(&self, row: usize) -> String {
        self.grid.cell(row, self.anchor).text
    }

    /// A short caption: has text and is not part of a banner-sized merge.
    pub(crate) fn is_header_cell(&self, row: usize, col: usize) -> bool {
        let cell = self.grid.cell(row, col);
        cell.merge_size < HEADER_MERGE_LIMIT && cell.has_text()
    }

    /// The anchor cell, or the one left of it, looks like a column caption.
    pub(crate) fn is_header(&self, row: usize) -> bool {
        self.is_header_cell(row, self.anchor) || (self.anchor > 1 && self.is_header_cell(row, self.anchor - 1))
    }

    /// The row holds only a short page footer such as `2 из 5`.
    pub(crate) fn is_page_break(&self, row: usize) -> bool {
        let mut text = String::new();
        let mut chars = 0;
        let mut col = self.anchor;
        while col <= self.last_col && chars < PAGE_BREAK_MAX_CHARS {
            let cell = self.grid.cell(row, col);
            chars += cell.text.chars().count();
            text.push_str(&cell.text);
            col += 1;
        }
        chars < PAGE_BREAK_MAX_CHARS && self.locale.is_page_break(&text)
    }

    /// A wide merged caption followed by a header row, possibly after a page footer.
    pub(crate) fn is_table_title(&self, row: usize) -> bool {
        self.grid.cell(row, self.anchor).merge_size > TITLE_MERGE_MIN
            && (self.is_header(row + 1) || (self.is_page_break(row + 1) && self.is_header(row + 2)))
    }
}

/// Column of the first cell with text, scanning the top-left block row by row.
fn probe_anchor<G: Grid>(grid: &G) -> Option<usize> {
    (1..=PROBE_SIZE)
        .flat_map(|row| (1..=PROBE_SIZE).map(move |col| (row, col)))
        .find(|(row, col)| grid.cell(*row, *col).has_text())
        .map(|(_, col)| col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::grid::MatrixGrid;

    fn layout<'a>(grid: &'a MatrixGrid, locale: &'a Locale) -> Layout<'a, MatrixGrid> {
        Layout::new(grid, Options::default(), locale).unwrap()
    }

    #[test]
    fn anchor_is_first_text_cell_row_major() {
        let locale = Locale::russian();
        let grid = MatrixGrid::from_rows(&[&["", "", ""], &["", "", "Отчет"], &["", "x", ""]]);
        assert_eq!(layout(&grid, &locale).anchor, 3);
    }

    #[test]
    fn anchor_probe_fails_without_text() {
        let locale = Locale::russian();
        let mut rows: Vec<Vec<&str>> = vec![vec![""; 10]; 10];
        rows.push(vec!["late"]);
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        let grid = MatrixGrid::from_rows(&rows);

        let error = Layout::new(&grid, Options::default(), &locale).err().unwrap();
        assert!(error.to_string().contains("anchor column"));
    }

    #[test]
    fn disabled_probe_uses_first_column() {
        let locale = Locale::russian();
        let grid = MatrixGrid::from_rows(&[&["", "", "Отчет"]]);
        let options = Options { anchor_probe: false, ..Options::default() };
        assert_eq!(Layout::new(&grid, options, &locale).unwrap().anchor, 1);

        let empty = MatrixGrid::from_rows(&[]);
        assert!(Layout::new(&empty, options, &locale).is_ok());
    }

    #[test]
    fn header_cells() {
        let locale = Locale::russian();
        let grid = MatrixGrid::from_rows(&[
            &["", "Отчет"],
            &["Дата", ""],
            &["", "Баннер"],
            &["", ""],
        ])
        .with_merge(3, 2, 60);
        let layout = layout(&grid, &locale);
        assert_eq!(layout.anchor, 2);
        assert!(layout.is_header(1));
        assert!(layout.is_header(2));
        assert!(!layout.is_header(3));
        assert!(!layout.is_header(4));
    }

    #[test]
    fn page_breaks() {
        let locale = Locale::russian();
        let grid = MatrixGrid::from_rows(&[
            &["Отчет", "", ""],
            &["2 из 5", "", ""],
            &["", "2 из", " 5"],
            &["Страница 2 из 5", "", ""],
            &["2 из 5", "", "очень длинный хвост"],
            &["Сумма", "", ""],
        ]);
        let layout = layout(&grid, &locale);
        assert!(layout.is_page_break(2));
        assert!(layout.is_page_break(3));
        assert!(!layout.is_page_break(4));
        assert!(!layout.is_page_break(5));
        assert!(!layout.is_page_break(6));
    }

    #[test]
    fn table_titles() {
        let locale = Locale::russian();
        let grid = MatrixGrid::from_rows(&[
            &["Сделки", ""],
            &["Дата", ""],
            &["Прочее", ""],
            &["", "1 из 2"],
            &["Дата", ""],
            &["Итог", ""],
            &["", ""],
        ])
        .with_merge(1, 1, 120)
        .with_merge(3, 1, 120)
        .with_merge(6, 1, 120);
        let layout = layout(&grid, &locale);
        assert!(layout.is_table_title(1));
        assert!(layout.is_table_title(3));
        assert!(!layout.is_header(4));
        assert!(!layout.is_table_title(2));
        assert!(!layout.is_table_title(6));
    }
}
