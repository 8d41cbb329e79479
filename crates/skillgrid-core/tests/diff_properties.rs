//! Property tests for the grid differ

use proptest::prelude::*;
use skillgrid_core::{accuracy, compare, Cell, CellValue, Sheet, SpreadsheetSnapshot};

fn arb_value() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        (-1000i32..1000).prop_map(CellValue::from),
        any::<bool>().prop_map(CellValue::Boolean),
        "[a-z]{0,4}".prop_map(CellValue::Text),
    ]
}

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        3 => arb_value().prop_map(Cell::value),
        1 => Just(Cell::default()),
        1 => (arb_value(), "[A-C][1-5]").prop_map(|(v, r)| Cell::formula(format!("=SUM({r})"), v)),
    ]
}

fn arb_sheet() -> impl Strategy<Value = Sheet> {
    // Ragged on purpose: rows have independent lengths
    prop::collection::vec(prop::collection::vec(arb_cell(), 0..6), 0..6).prop_map(|grid| Sheet {
        grid,
        ..Sheet::new("Sheet1")
    })
}

/// One row holding `first` in A1 and `last` in the final column
fn wide(width: usize, first: Option<f64>, last: f64) -> SpreadsheetSnapshot {
    let mut row = vec![Cell::default(); width];
    if let Some(first) = first {
        row[0] = Cell::value(first);
    }
    row[width - 1] = Cell::value(last);
    SpreadsheetSnapshot::single_sheet(Sheet {
        grid: vec![row],
        ..Sheet::new("Wide")
    })
}

fn arb_snapshot() -> impl Strategy<Value = SpreadsheetSnapshot> {
    prop::collection::vec(arb_sheet(), 0..3).prop_map(SpreadsheetSnapshot::new)
}

proptest! {
    /// Comparing a snapshot with itself never reports a change
    #[test]
    fn self_compare_is_unchanged(s in arb_snapshot()) {
        let report = compare(&s, &s, Some(&s));
        prop_assert!(report.changed_cells.is_empty());
        prop_assert!(report.added_formulas.is_empty());
    }

    /// Accuracy and efficiency stay within 0..=100 for any inputs
    #[test]
    fn scores_are_bounded(
        initial in arb_snapshot(),
        final_ in arb_snapshot(),
        expected in arb_snapshot(),
    ) {
        let report = compare(&initial, &final_, Some(&expected));
        prop_assert!((0.0..=100.0).contains(&report.accuracy));
        prop_assert!((0.0..=100.0).contains(&report.efficiency));
    }

    /// A snapshot graded against itself is fully accurate whenever anything is graded
    #[test]
    fn self_grade_is_perfect(s in arb_snapshot()) {
        let graded = s
            .sheets
            .iter()
            .flat_map(|sheet| sheet.cells())
            .any(|(_, _, cell)| cell.value.is_some());
        let report = compare(&s, &s, Some(&s));
        if graded {
            prop_assert_eq!(report.accuracy, 100.0);
        } else {
            prop_assert_eq!(report.accuracy, 0.0);
        }
    }
}

#[test]
fn edits_beyond_last_addressable_column_are_reported() {
    let report = compare(&wide(20_000, None, 1.0), &wide(20_000, None, 2.0), None);
    assert_eq!(report.changed_cells.len(), 1);
    assert_eq!(report.changed_cells[0].cell_ref, "ACOF1");
    assert_eq!(report.changed_cells[0].new_value, Cell::value(2.0));
}

#[test]
fn accuracy_does_not_wrap_wide_columns() {
    // Column index 65536 must not alias A1
    let expected = wide(65_537, Some(1.0), 5.0);
    let final_ = SpreadsheetSnapshot::single_sheet(Sheet {
        grid: vec![vec![Cell::value(5.0)]],
        ..Sheet::new("Wide")
    });
    assert_eq!(accuracy(&final_, &expected), 0.0);
    assert_eq!(accuracy(&expected, &expected), 100.0);
}
