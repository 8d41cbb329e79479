//! A single sheet: a ragged row-major grid of cells

use std::collections::BTreeMap;

use crate::cell::{Cell, CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// View settings carried alongside a sheet
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetConfig {
    pub frozen_rows: u32,
    pub frozen_columns: u16,
    /// Column widths in character units, keyed by zero-based column
    pub column_widths: BTreeMap<u16, f64>,
    pub show_gridlines: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            frozen_rows: 0,
            frozen_columns: 0,
            column_widths: BTreeMap::new(),
            show_gridlines: true,
        }
    }
}

/// A named grid of cells
///
/// Rows may have different lengths. Every read treats a position outside
/// the stored grid as an empty cell.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Sheet {
    pub name: String,
    pub grid: Vec<Vec<Cell>>,
    pub config: SheetConfig,
}

impl Sheet {
    /// Create an empty sheet
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a sheet from rows of values; `None` leaves a position empty
    pub fn from_rows<S, R, V>(name: S, rows: R) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = Vec<Option<V>>>,
        V: Into<CellValue>,
    {
        let grid = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| v.map(Cell::value).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            name: name.into(),
            grid,
            config: SheetConfig::default(),
        }
    }

    /// Number of stored rows
    pub fn row_count(&self) -> usize {
        self.grid.len()
    }

    /// Length of the longest stored row
    pub fn column_count(&self) -> usize {
        self.grid.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at a position, `None` when outside the stored grid
    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cell_at(row as usize, col as usize)
    }

    /// Cell at a raw grid position
    ///
    /// A deserialized grid is not limited to [`MAX_ROWS`] x [`MAX_COLS`], so
    /// comparisons index it with `usize`.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid.get(row)?.get(col)
    }

    /// Cell at a position, the empty cell when outside the stored grid
    pub fn cell_or_empty(&self, row: u32, col: u16) -> &Cell {
        self.cell(row, col).unwrap_or(&Cell::EMPTY)
    }

    /// Cell at an A1 reference such as `B3`
    pub fn cell_by_ref(&self, reference: &str) -> Result<&Cell> {
        let addr = CellAddress::parse(reference)?;
        Ok(self.cell_or_empty(addr.row, addr.col))
    }

    /// Value at a position, if any
    pub fn value(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cell(row, col)?.value.as_ref()
    }

    /// Write a cell, growing the grid as needed
    pub fn set_cell(&mut self, row: u32, col: u16, cell: Cell) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(u32::from(col), MAX_COLS - 1));
        }

        let (r, c) = (row as usize, col as usize);
        if self.grid.len() <= r {
            self.grid.resize_with(r + 1, Vec::new);
        }
        let cells = &mut self.grid[r];
        if cells.len() <= c {
            cells.resize_with(c + 1, Cell::default);
        }
        cells[c] = cell;
        Ok(())
    }

    /// Write a value at an A1 reference
    pub fn set_value<V: Into<CellValue>>(&mut self, reference: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(reference)?;
        self.set_cell(addr.row, addr.col, Cell::value(value))
    }

    /// Write a formula and its computed value at an A1 reference
    pub fn set_formula<S, V>(&mut self, reference: &str, formula: S, value: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<CellValue>,
    {
        let addr = CellAddress::parse(reference)?;
        self.set_cell(addr.row, addr.col, Cell::formula(formula, value))
    }

    /// Non-empty cells with their raw grid positions, row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.grid.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| !cell.is_empty())
                .map(move |(c, cell)| (r, c, cell))
        })
    }

    /// Non-empty cells that have an A1 address, row-major
    ///
    /// Positions beyond [`MAX_ROWS`] or [`MAX_COLS`] are skipped; use
    /// [`cells`](Self::cells) to see them.
    pub fn non_empty_cells(&self) -> impl Iterator<Item = (CellAddress, &Cell)> {
        self.cells().filter_map(|(r, c, cell)| {
            let row = u32::try_from(r).ok().filter(|&row| row < MAX_ROWS)?;
            let col = u16::try_from(c).ok().filter(|&col| col < MAX_COLS)?;
            Some((CellAddress::new(row, col), cell))
        })
    }

    /// Smallest range covering every non-empty cell
    pub fn used_range(&self) -> Option<CellRange> {
        let mut cells = self.non_empty_cells().map(|(addr, _)| addr);
        let first = cells.next()?;
        let (mut top, mut left, mut bottom, mut right) = (first.row, first.col, first.row, first.col);
        for addr in cells {
            top = top.min(addr.row);
            left = left.min(addr.col);
            bottom = bottom.max(addr.row);
            right = right.max(addr.col);
        }
        Some(CellRange::new(
            CellAddress::new(top, left),
            CellAddress::new(bottom, right),
        ))
    }
}
