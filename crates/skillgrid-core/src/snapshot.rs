//! Immutable captures of a whole workbook

use chrono::{DateTime, Utc};

use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::sheet::Sheet;

/// When and at which format version a snapshot was captured
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

/// All sheets of a workbook at one point in time
///
/// Comparisons take snapshots by reference and never modify them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpreadsheetSnapshot {
    pub sheets: Vec<Sheet>,
    pub metadata: SnapshotMetadata,
}

impl SpreadsheetSnapshot {
    /// Capture a set of sheets now
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self {
            sheets,
            metadata: SnapshotMetadata {
                created_at: Utc::now(),
                version: 1,
            },
        }
    }

    /// Capture a single sheet now
    pub fn single_sheet(sheet: Sheet) -> Self {
        Self::new(vec![sheet])
    }

    /// Capture a single sheet built from rows of optional values
    pub fn from_rows<S, R, V>(name: S, rows: R) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = Vec<Option<V>>>,
        V: Into<CellValue>,
    {
        Self::single_sheet(Sheet::from_rows(name, rows))
    }

    /// Override the capture time
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.created_at = at;
        self
    }

    /// Override the format version
    pub fn with_version(mut self, version: u32) -> Self {
        self.metadata.version = version;
        self
    }

    /// Number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Sheet by index
    pub fn sheet(&self, index: usize) -> Result<&Sheet> {
        self.sheets
            .get(index)
            .ok_or(Error::SheetOutOfBounds(index, self.sheets.len()))
    }

    /// Sheet by name, compared case-insensitively
    pub fn sheet_by_name(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// Formula texts of every cell in sheet order, then row-major
    pub fn formulas(&self) -> impl Iterator<Item = &str> {
        self.sheets
            .iter()
            .flat_map(|s| s.cells())
            .filter_map(|(_, _, cell)| cell.formula.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_lookup() {
        let snapshot = SpreadsheetSnapshot::from_rows("Sales", vec![vec![Some(1)]]);
        assert_eq!(snapshot.sheet_count(), 1);
        assert!(snapshot.sheet(0).is_ok());
        assert!(matches!(snapshot.sheet(1), Err(Error::SheetOutOfBounds(1, 1))));
        assert!(snapshot.sheet_by_name("sales").is_ok());
        assert!(matches!(
            snapshot.sheet_by_name("Costs"),
            Err(Error::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_formulas_in_order() {
        let mut sheet = Sheet::new("S");
        sheet.set_formula("B1", "=SUM(A1:A3)", 6).unwrap();
        sheet.set_formula("A2", "=A1*2", 2).unwrap();
        let snapshot = SpreadsheetSnapshot::single_sheet(sheet);
        let formulas: Vec<_> = snapshot.formulas().collect();
        assert_eq!(formulas, vec!["=SUM(A1:A3)", "=A1*2"]);
    }
}
