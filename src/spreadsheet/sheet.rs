use crate::spreadsheet::grid::CellValue;
use crate::spreadsheet::grid::CellView;
use crate::spreadsheet::grid::Grid;
use std::collections::HashMap;

/// A rectangular merged region, 1-based and inclusive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct MergedRegion {
    pub(crate) first_row: usize,
    pub(crate) first_col: usize,
    pub(crate) last_row: usize,
    pub(crate) last_col: usize,
}

impl MergedRegion {
    /// Number of cells covered by the region.
    pub(crate) fn size(&self) -> usize {
        (self.last_row - self.first_row + 1) * (self.last_col - self.first_col + 1)
    }

    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        self.first_row <= row && row <= self.last_row && self.first_col <= col && col <= self.last_col
    }
}

/// A worksheet loaded into memory: typed cells plus merged regions.
#[derive(Debug, Default)]
pub struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// Non-empty cells by 1-based position
    cells: HashMap<(usize, usize), CellValue>,
    /// Merged regions in document order
    merges: Vec<MergedRegion>,
    /// Indexes into `merges` for every row a region covers
    merges_by_row: HashMap<usize, Vec<usize>>,
    /// Used range, grown by every pushed cell and region
    last_row: usize,
    last_col: usize,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a cell value; empty values are dropped and do not grow the used range.
    pub(crate) fn push(&mut self, row: usize, col: usize, value: CellValue) {
        if value.is_empty() {
            return;
        }
        self.update_bound(row, col);
        self.cells.insert((row, col), value);
    }

    /// Registers a merged region.
    pub(crate) fn merge(&mut self, region: MergedRegion) {
        self.update_bound(region.last_row, region.last_col);
        let index = self.merges.len();
        for row in region.first_row..=region.last_row {
            self.merges_by_row.entry(row).or_default().push(index);
        }
        self.merges.push(region);
    }

    /// Returns the merged region containing the cell, if any.
    pub(crate) fn merged_region(&self, row: usize, col: usize) -> Option<&MergedRegion> {
        self.merges_by_row
            .get(&row)?
            .iter()
            .map(|index| &self.merges[*index])
            .find(|region| region.contains(row, col))
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        self.last_row = self.last_row.max(row);
        self.last_col = self.last_col.max(col);
    }
}

impl Grid for Sheet {
    fn cell(&self, row: usize, col: usize) -> CellView {
        let value = self.cells.get(&(row, col)).cloned().unwrap_or_default();
        let merge_size = self.merged_region(row, col).map(MergedRegion::size).unwrap_or(1);
        CellView::new(value, merge_size)
    }

    fn used_range(&self) -> (usize, usize) {
        (self.last_row, self.last_col)
    }
}
