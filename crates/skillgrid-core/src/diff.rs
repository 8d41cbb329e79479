//! Cell-by-cell comparison of snapshots
//!
//! [`GridDiffer::compare`] walks the initial and final snapshots sheet by
//! sheet and reports every position whose cell changed. When an expected
//! snapshot is supplied it also grades the final snapshot:
//!
//! - **accuracy**: share of expected values reproduced exactly in the final
//!   snapshot. Only value equality counts, so a different formula that
//!   produces the right number is accepted.
//! - **efficiency**: starts at 100, loses points for every change beyond a
//!   free allowance and gains a bonus when an efficient lookup/array function
//!   was used.
//!
//! Both scores are 0 without an expected snapshot.

use lazy_regex::regex;

use crate::cell::{Cell, CellAddress};
use crate::sheet::Sheet;
use crate::snapshot::SpreadsheetSnapshot;

/// Tunable constants of the efficiency heuristic
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DiffOptions {
    /// Changes allowed before the penalty applies
    pub free_changes: usize,
    /// Points removed per change beyond the allowance
    pub penalty_per_change: f64,
    /// Flat bonus when an efficient function appears in the added formulas
    pub efficient_function_bonus: f64,
    /// Function names that earn the bonus
    pub efficient_functions: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            free_changes: 10,
            penalty_per_change: 2.0,
            efficient_function_bonus: 10.0,
            efficient_functions: ["SUMPRODUCT", "INDEX", "MATCH", "VLOOKUP"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl DiffOptions {
    pub fn with_free_changes(mut self, free_changes: usize) -> Self {
        self.free_changes = free_changes;
        self
    }

    pub fn with_penalty(mut self, penalty_per_change: f64) -> Self {
        self.penalty_per_change = penalty_per_change;
        self
    }

    pub fn with_bonus(mut self, bonus: f64) -> Self {
        self.efficient_function_bonus = bonus;
        self
    }

    pub fn with_efficient_functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.efficient_functions = names.into_iter().map(Into::into).collect();
        self
    }
}

/// One position whose cell differs between two snapshots
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellChange {
    /// Zero-based sheet index
    pub sheet: usize,
    pub sheet_name: String,
    /// A1 reference of the changed position
    pub cell_ref: String,
    pub old_value: Cell,
    pub new_value: Cell,
    /// Formula of the new cell, if it has one
    pub formula: Option<String>,
}

/// Result of comparing snapshots
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffReport {
    pub changed_cells: Vec<CellChange>,
    /// Formulas of changed cells in the final snapshot, duplicates kept
    pub added_formulas: Vec<String>,
    /// 0-100
    pub accuracy: f64,
    /// 0-100
    pub efficiency: f64,
}

impl DiffReport {
    /// True when no position changed
    pub fn is_unchanged(&self) -> bool {
        self.changed_cells.is_empty()
    }
}

/// Compares snapshots using a fixed set of [`DiffOptions`]
#[derive(Debug, Clone, Default)]
pub struct GridDiffer {
    options: DiffOptions,
}

impl GridDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Diff `initial` against `final_`, grading against `expected` when given
    pub fn compare(
        &self,
        initial: &SpreadsheetSnapshot,
        final_: &SpreadsheetSnapshot,
        expected: Option<&SpreadsheetSnapshot>,
    ) -> DiffReport {
        let changed_cells = changed_cells(initial, final_);
        let added_formulas: Vec<String> = changed_cells
            .iter()
            .filter_map(|change| change.formula.clone())
            .collect();

        let (accuracy, efficiency) = match expected {
            Some(expected) => (
                accuracy(final_, expected),
                self.efficiency(changed_cells.len(), &added_formulas),
            ),
            None => (0.0, 0.0),
        };

        DiffReport {
            changed_cells,
            added_formulas,
            accuracy,
            efficiency,
        }
    }

    /// Efficiency score for a number of changes and the formulas they added
    pub fn efficiency(&self, change_count: usize, added_formulas: &[String]) -> f64 {
        let extra = change_count.saturating_sub(self.options.free_changes);
        let mut score = 100.0 - extra as f64 * self.options.penalty_per_change;
        if self.uses_efficient_function(added_formulas) {
            score += self.options.efficient_function_bonus;
        }
        score.clamp(0.0, 100.0)
    }

    /// True when any formula calls one of the efficient functions
    ///
    /// Calls are found with [`called_functions`]; the configured names are
    /// compared case-insensitively.
    pub fn uses_efficient_function(&self, formulas: &[String]) -> bool {
        if self.options.efficient_functions.is_empty() {
            return false;
        }
        formulas
            .iter()
            .flat_map(|formula| called_functions(formula))
            .any(|called| {
                self.options
                    .efficient_functions
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(&called))
            })
    }
}

/// Functions a formula calls, upper-cased, in order of appearance
///
/// Matches the formula analyzer: text without a leading `=` calls nothing,
/// string literals and quoted sheet names are skipped, and a call is a name
/// starting with an uppercase letter immediately followed by `(`.
pub fn called_functions(formula: &str) -> Vec<String> {
    let Some(body) = formula.strip_prefix('=') else {
        return Vec::new();
    };

    let unquoted = blank_quoted(body);
    regex!(r"[A-Za-z0-9_.$]+\(")
        .find_iter(&unquoted)
        .map(|m| m.as_str().trim_end_matches('('))
        .filter(|name| name.starts_with(|c: char| c.is_ascii_uppercase()))
        .map(str::to_ascii_uppercase)
        .collect()
}

/// Replace each `"..."` or `'...'` run with a space
///
/// A doubled quote inside a run is an escape; an unterminated run extends to
/// the end of the text.
fn blank_quoted(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '"' && c != '\'' {
            out.push(c);
            continue;
        }
        while let Some(inner) = chars.next() {
            if inner == c {
                if chars.peek() == Some(&c) {
                    chars.next();
                    continue;
                }
                break;
            }
        }
        out.push(' ');
    }
    out
}

/// Diff with default options
pub fn compare(
    initial: &SpreadsheetSnapshot,
    final_: &SpreadsheetSnapshot,
    expected: Option<&SpreadsheetSnapshot>,
) -> DiffReport {
    GridDiffer::new().compare(initial, final_, expected)
}

/// Every position whose cell differs, in sheet then row-major order
///
/// Sheets present on only one side are skipped.
pub fn changed_cells(initial: &SpreadsheetSnapshot, final_: &SpreadsheetSnapshot) -> Vec<CellChange> {
    let sheet_count = initial.sheets.len().max(final_.sheets.len());
    let mut changes = Vec::new();

    for index in 0..sheet_count {
        let (Some(before), Some(after)) = (initial.sheets.get(index), final_.sheets.get(index)) else {
            continue;
        };
        diff_sheet(index, before, after, &mut changes);
    }

    changes
}

fn diff_sheet(index: usize, before: &Sheet, after: &Sheet, changes: &mut Vec<CellChange>) {
    let rows = before.row_count().max(after.row_count());
    let cols = before.column_count().max(after.column_count());

    for row in 0..rows {
        for col in 0..cols {
            let old = before.cell_at(row, col).unwrap_or(&Cell::EMPTY);
            let new = after.cell_at(row, col).unwrap_or(&Cell::EMPTY);
            if old != new {
                changes.push(CellChange {
                    sheet: index,
                    sheet_name: after.name.clone(),
                    cell_ref: CellAddress::a1_name(row, col),
                    old_value: old.clone(),
                    new_value: new.clone(),
                    formula: new.formula.clone(),
                });
            }
        }
    }
}

/// Percentage of expected values reproduced exactly in `final_`
///
/// Only expected cells with a value are graded. Returns 0 when nothing is
/// graded.
pub fn accuracy(final_: &SpreadsheetSnapshot, expected: &SpreadsheetSnapshot) -> f64 {
    let mut graded = 0usize;
    let mut correct = 0usize;

    for (index, expected_sheet) in expected.sheets.iter().enumerate() {
        let actual_sheet = final_.sheets.get(index);
        for (row, col, cell) in expected_sheet.cells() {
            let Some(want) = &cell.value else {
                continue;
            };
            graded += 1;
            let got = actual_sheet
                .and_then(|s| s.cell_at(row, col))
                .and_then(|c| c.value.as_ref());
            if got == Some(want) {
                correct += 1;
            }
        }
    }

    if graded == 0 {
        0.0
    } else {
        correct as f64 / graded as f64 * 100.0
    }
}
