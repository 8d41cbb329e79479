//! Candidate edit events and the append-only tracker that derives metrics from them

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skillgrid_core::CellValue;
use skillgrid_formula::analyze;

/// Every kind of edit the spreadsheet widget reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CellEdit,
    FormulaInput,
    FormatChange,
    InsertRow,
    InsertColumn,
    DeleteRow,
    DeleteColumn,
    MergeCells,
    CreateChart,
    SortData,
    FilterData,
    PivotTable,
    Copy,
    Paste,
    Cut,
    Undo,
    Redo,
}

/// Coarse grouping of [`ActionKind`]s used by scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Edit,
    Formula,
    Format,
    Structure,
    Analysis,
    Clipboard,
    History,
    Presentation,
}

impl ActionKind {
    pub fn category(self) -> ActionCategory {
        match self {
            ActionKind::CellEdit => ActionCategory::Edit,
            ActionKind::FormulaInput => ActionCategory::Formula,
            ActionKind::FormatChange | ActionKind::MergeCells => ActionCategory::Format,
            ActionKind::InsertRow
            | ActionKind::InsertColumn
            | ActionKind::DeleteRow
            | ActionKind::DeleteColumn => ActionCategory::Structure,
            ActionKind::SortData | ActionKind::FilterData | ActionKind::PivotTable => {
                ActionCategory::Analysis
            }
            ActionKind::Copy | ActionKind::Paste | ActionKind::Cut => ActionCategory::Clipboard,
            ActionKind::Undo | ActionKind::Redo => ActionCategory::History,
            ActionKind::CreateChart => ActionCategory::Presentation,
        }
    }
}

/// Kind-specific extras attached to an action
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionPayload {
    /// Range the action applied to, e.g. a sort or merge range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Rows/columns inserted or deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Free-form detail such as a chart type or format code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One edit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAction {
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub payload: ActionPayload,
}

impl UserAction {
    pub fn new(timestamp: i64, kind: ActionKind) -> Self {
        Self {
            timestamp,
            kind,
            cell_reference: None,
            old_value: None,
            new_value: None,
            formula: None,
            payload: ActionPayload::default(),
        }
    }

    /// A plain value edit
    pub fn edit<V: Into<CellValue>>(timestamp: i64, cell: &str, value: V) -> Self {
        Self::new(timestamp, ActionKind::CellEdit)
            .at(cell)
            .with_new_value(value)
    }

    /// A formula entry
    pub fn formula_input<S: Into<String>>(timestamp: i64, cell: &str, formula: S) -> Self {
        Self::new(timestamp, ActionKind::FormulaInput)
            .at(cell)
            .with_formula(formula)
    }

    pub fn at(mut self, cell: &str) -> Self {
        self.cell_reference = Some(cell.to_string());
        self
    }

    pub fn with_formula<S: Into<String>>(mut self, formula: S) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_old_value<V: Into<CellValue>>(mut self, value: V) -> Self {
        self.old_value = Some(value.into());
        self
    }

    pub fn with_new_value<V: Into<CellValue>>(mut self, value: V) -> Self {
        self.new_value = Some(value.into());
        self
    }

    pub fn with_payload(mut self, payload: ActionPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn category(&self) -> ActionCategory {
        self.kind.category()
    }
}

/// Counters derived from an action log
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EfficiencyMetrics {
    pub total_actions: usize,
    pub formula_actions: usize,
    pub edit_actions: usize,
    /// Milliseconds; 0 with fewer than two actions
    pub average_time_between_actions: f64,
    pub undo_count: usize,
    pub by_category: BTreeMap<ActionCategory, usize>,
}

/// Append-only log of [`UserAction`]s
///
/// Actions are kept in arrival order. Timing queries use the earliest and
/// latest timestamps rather than the first and last entries, so events that
/// arrive out of order never produce negative durations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTracker {
    actions: Vec<UserAction>,
}

impl ActionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: Vec<UserAction>) -> Self {
        Self { actions }
    }

    /// Append an action
    pub fn record(&mut self, action: UserAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// All actions in arrival order
    pub fn actions(&self) -> &[UserAction] {
        &self.actions
    }

    pub fn actions_by_kind(&self, kind: ActionKind) -> Vec<&UserAction> {
        self.actions.iter().filter(|a| a.kind == kind).collect()
    }

    /// Actions with `start_ms <= timestamp < end_ms`
    pub fn for_range(&self, start_ms: i64, end_ms: i64) -> Vec<&UserAction> {
        self.actions
            .iter()
            .filter(|a| (start_ms..end_ms).contains(&a.timestamp))
            .collect()
    }

    /// Distinct formula texts in order of first occurrence
    pub fn formulas_used(&self) -> Vec<String> {
        dedup_in_order(self.actions.iter().filter_map(|a| a.formula.clone()))
    }

    /// Distinct functions called by the formulas used, in order of first call
    pub fn functions_used(&self) -> Vec<String> {
        functions_in(&self.formulas_used())
    }

    /// Milliseconds between the earliest and latest action
    pub fn time_spent(&self) -> i64 {
        let timestamps = self.actions.iter().map(|a| a.timestamp);
        match (timestamps.clone().min(), timestamps.max()) {
            (Some(first), Some(last)) if self.actions.len() > 1 => last - first,
            _ => 0,
        }
    }

    pub fn count_by_category(&self) -> BTreeMap<ActionCategory, usize> {
        let mut counts = BTreeMap::new();
        for action in &self.actions {
            *counts.entry(action.category()).or_insert(0) += 1;
        }
        counts
    }

    pub fn efficiency_metrics(&self) -> EfficiencyMetrics {
        let total = self.actions.len();
        let average_time_between_actions = if total > 1 {
            self.time_spent() as f64 / (total - 1) as f64
        } else {
            0.0
        };

        EfficiencyMetrics {
            total_actions: total,
            formula_actions: self.actions_by_kind(ActionKind::FormulaInput).len(),
            edit_actions: self.actions_by_kind(ActionKind::CellEdit).len(),
            average_time_between_actions,
            undo_count: self.actions_by_kind(ActionKind::Undo).len(),
            by_category: self.count_by_category(),
        }
    }
}

/// Distinct functions called across `formulas`, in order of first call
pub fn functions_in<S: AsRef<str>>(formulas: &[S]) -> Vec<String> {
    dedup_in_order(
        formulas
            .iter()
            .flat_map(|f| analyze(f.as_ref()).functions),
    )
}

pub(crate) fn dedup_in_order<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}
