//! # skillgrid-core
//!
//! Spreadsheet snapshot model for skillgrid assessments.
//!
//! This crate provides the types every other skillgrid crate builds on:
//! - [`Cell`] and [`CellValue`] - what one grid position holds
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`CellStyle`] - typed formatting attributes
//! - [`Sheet`] and [`SpreadsheetSnapshot`] - immutable workbook captures
//! - [`GridDiffer`] - cell-by-cell comparison with accuracy/efficiency grading
//!
//! ## Example
//!
//! ```rust
//! use skillgrid_core::{compare, Sheet, SpreadsheetSnapshot};
//!
//! let initial = SpreadsheetSnapshot::from_rows("Sales", vec![vec![Some(10.0), Some(20.0), None]]);
//!
//! let mut edited = initial.sheets[0].clone();
//! edited.set_formula("C1", "=SUM(A1:B1)", 30.0).unwrap();
//! let final_ = SpreadsheetSnapshot::single_sheet(edited.clone());
//! let expected = SpreadsheetSnapshot::single_sheet(edited);
//!
//! let report = compare(&initial, &final_, Some(&expected));
//! assert_eq!(report.changed_cells.len(), 1);
//! assert_eq!(report.added_formulas, vec!["=SUM(A1:B1)"]);
//! assert_eq!(report.accuracy, 100.0);
//! ```

pub mod cell;
pub mod diff;
pub mod error;
pub mod sheet;
pub mod snapshot;
pub mod style;

// Re-exports for convenience
pub use cell::{Cell, CellAddress, CellRange, CellValue};
pub use diff::{
    accuracy, called_functions, changed_cells, compare, CellChange, DiffOptions, DiffReport,
    GridDiffer,
};
pub use error::{Error, Result};
pub use sheet::{Sheet, SheetConfig};
pub use snapshot::{SnapshotMetadata, SpreadsheetSnapshot};
pub use style::{CellStyle, Color, HorizontalAlignment};

/// Maximum number of rows in a sheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
