//! Practical task definitions and scoring
//!
//! [`TaskEvaluator::evaluate`] combines three signals into a [`TaskResult`]:
//!
//! 1. The grid diff of initial, final and expected snapshots supplies the
//!    accuracy and efficiency scores.
//! 2. The action log supplies formulas, functions and pacing.
//! 3. The rubric decides which functions were required or earn a bonus.

use serde::{Deserialize, Serialize};
use skillgrid_core::{DiffOptions, GridDiffer, SpreadsheetSnapshot};

use crate::action::{dedup_in_order, functions_in, ActionTracker, UserAction};

/// Weighted criteria for one practical task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRubric {
    /// Functions the candidate is expected to use
    pub required_formulas: Vec<String>,
    /// Functions that earn a bonus when used
    pub optional_formulas: Vec<String>,
    /// Percent of the weighted score from accuracy
    pub accuracy_weight: f64,
    /// Percent of the weighted score from efficiency
    pub efficiency_weight: f64,
    /// Percent of the weighted score from best practices
    pub best_practices_weight: f64,
}

impl Default for TaskRubric {
    fn default() -> Self {
        Self {
            required_formulas: Vec::new(),
            optional_formulas: Vec::new(),
            accuracy_weight: 50.0,
            efficiency_weight: 25.0,
            best_practices_weight: 25.0,
        }
    }
}

impl TaskRubric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requiring<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_formulas.extend(functions.into_iter().map(Into::into));
        self
    }

    pub fn rewarding<I, S>(mut self, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional_formulas.extend(functions.into_iter().map(Into::into));
        self
    }

    pub fn with_weights(mut self, accuracy: f64, efficiency: f64, best_practices: f64) -> Self {
        self.accuracy_weight = accuracy;
        self.efficiency_weight = efficiency;
        self.best_practices_weight = best_practices;
        self
    }
}

/// A hands-on spreadsheet exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticalTask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub initial: SpreadsheetSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<SpreadsheetSnapshot>,
    #[serde(default)]
    pub rubric: TaskRubric,
    /// Time budget in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_ms: Option<u64>,
}

impl PracticalTask {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, title: T, initial: SpreadsheetSnapshot) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            initial,
            expected: None,
            rubric: TaskRubric::default(),
            time_limit_ms: None,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_expected(mut self, expected: SpreadsheetSnapshot) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn with_rubric(mut self, rubric: TaskRubric) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn with_time_limit_ms(mut self, limit: u64) -> Self {
        self.time_limit_ms = Some(limit);
        self
    }
}

/// What ended a task attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionTrigger {
    /// Candidate pressed "complete task"
    #[default]
    Manual,
    /// The phase timer ran out and the partial work was submitted
    Timeout,
}

/// Scored outcome of one task attempt; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub initial_snapshot: SpreadsheetSnapshot,
    pub final_snapshot: SpreadsheetSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_snapshot: Option<SpreadsheetSnapshot>,
    #[serde(default)]
    pub actions: Vec<UserAction>,
    #[serde(default)]
    pub formulas_used: Vec<String>,
    #[serde(default)]
    pub functions_used: Vec<String>,
    pub completion_time_ms: u64,
    pub accuracy_score: f64,
    pub efficiency_score: f64,
    pub best_practices_score: f64,
    pub feedback: String,
    #[serde(default)]
    pub completed_by: SubmissionTrigger,
}

impl TaskResult {
    /// Rubric-weighted combination of the three scores
    pub fn weighted_score(&self, rubric: &TaskRubric) -> f64 {
        let total = rubric.accuracy_weight + rubric.efficiency_weight + rubric.best_practices_weight;
        if total <= 0.0 {
            return self.mean_score();
        }
        (self.accuracy_score * rubric.accuracy_weight
            + self.efficiency_score * rubric.efficiency_weight
            + self.best_practices_score * rubric.best_practices_weight)
            / total
    }

    /// Unweighted mean of accuracy, efficiency and best practices
    pub fn mean_score(&self) -> f64 {
        (self.accuracy_score + self.efficiency_score + self.best_practices_score) / 3.0
    }

    /// True when the candidate called `function` (case-insensitive)
    pub fn used_function(&self, function: &str) -> bool {
        self.functions_used.iter().any(|f| f.eq_ignore_ascii_case(function))
    }
}

/// Tunable constants of the best-practices heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringOptions {
    /// Points lost per required function never used
    pub missing_required_penalty: f64,
    /// Points gained per bonus function used
    pub optional_formula_reward: f64,
    /// Points lost when actions come faster than `rushing_threshold_ms` on average
    pub rushing_penalty: f64,
    pub rushing_threshold_ms: f64,
    /// Accuracy at or above this is "excellent"
    pub excellent_accuracy: f64,
    /// Accuracy at or above this is "good"
    pub good_accuracy: f64,
    /// Efficiency at or above this is "efficient"
    pub good_efficiency: f64,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            missing_required_penalty: 20.0,
            optional_formula_reward: 10.0,
            rushing_penalty: 10.0,
            rushing_threshold_ms: 1_000.0,
            excellent_accuracy: 90.0,
            good_accuracy: 70.0,
            good_efficiency: 80.0,
        }
    }
}

/// Everything needed to score one attempt
#[derive(Debug, Clone, Copy)]
pub struct TaskSubmission<'a> {
    pub task_id: &'a str,
    pub initial: &'a SpreadsheetSnapshot,
    pub final_snapshot: &'a SpreadsheetSnapshot,
    pub expected: Option<&'a SpreadsheetSnapshot>,
    pub actions: &'a [UserAction],
    pub rubric: &'a TaskRubric,
    /// Wall-clock time since the task started, idle time included
    pub completion_time_ms: u64,
    pub completed_by: SubmissionTrigger,
}

/// Scores task attempts
#[derive(Debug, Clone, Default)]
pub struct TaskEvaluator {
    differ: GridDiffer,
    scoring: ScoringOptions,
}

impl TaskEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diff_options(mut self, options: DiffOptions) -> Self {
        self.differ = GridDiffer::with_options(options);
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringOptions) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn scoring(&self) -> &ScoringOptions {
        &self.scoring
    }

    /// Score an attempt at a task definition
    pub fn evaluate_task(
        &self,
        task: &PracticalTask,
        final_snapshot: &SpreadsheetSnapshot,
        actions: &[UserAction],
        completion_time_ms: u64,
        completed_by: SubmissionTrigger,
    ) -> TaskResult {
        self.evaluate(TaskSubmission {
            task_id: &task.id,
            initial: &task.initial,
            final_snapshot,
            expected: task.expected.as_ref(),
            actions,
            rubric: &task.rubric,
            completion_time_ms,
            completed_by,
        })
    }

    /// Score an attempt
    pub fn evaluate(&self, submission: TaskSubmission<'_>) -> TaskResult {
        if submission.expected.is_none() {
            tracing::warn!(
                task_id = submission.task_id,
                "evaluating task without an expected snapshot; accuracy defaults to 0"
            );
        }

        let diff = self
            .differ
            .compare(submission.initial, submission.final_snapshot, submission.expected);
        let tracker = ActionTracker::from_actions(submission.actions.to_vec());
        let metrics = tracker.efficiency_metrics();

        // Formulas typed into the final grid count even if no action reported them
        let formulas_used = dedup_in_order(
            tracker
                .formulas_used()
                .into_iter()
                .chain(diff.added_formulas.iter().cloned()),
        );
        let functions_used = functions_in(&formulas_used);

        let missing = missing_functions(&submission.rubric.required_formulas, &functions_used);
        let bonus_count = submission
            .rubric
            .optional_formulas
            .iter()
            .filter(|f| contains_function(&functions_used, f))
            .count();
        let rushing = metrics.total_actions > 1
            && metrics.average_time_between_actions < self.scoring.rushing_threshold_ms;

        let best_practices_score = (100.0
            - missing.len() as f64 * self.scoring.missing_required_penalty
            + bonus_count as f64 * self.scoring.optional_formula_reward
            - if rushing { self.scoring.rushing_penalty } else { 0.0 })
        .clamp(0.0, 100.0);

        let feedback = self.feedback(diff.accuracy, diff.efficiency, &missing);

        tracing::debug!(
            task_id = submission.task_id,
            accuracy = diff.accuracy,
            efficiency = diff.efficiency,
            best_practices = best_practices_score,
            changed = diff.changed_cells.len(),
            "task evaluated"
        );

        TaskResult {
            task_id: submission.task_id.to_string(),
            initial_snapshot: submission.initial.clone(),
            final_snapshot: submission.final_snapshot.clone(),
            expected_snapshot: submission.expected.cloned(),
            actions: submission.actions.to_vec(),
            formulas_used,
            functions_used,
            completion_time_ms: submission.completion_time_ms,
            accuracy_score: diff.accuracy,
            efficiency_score: diff.efficiency,
            best_practices_score,
            feedback,
            completed_by: submission.completed_by,
        }
    }

    /// Two or three sentences: accuracy tier, missing functions, efficiency tier
    pub fn feedback(&self, accuracy: f64, efficiency: f64, missing: &[String]) -> String {
        let mut sentences = Vec::with_capacity(3);

        sentences.push(if accuracy >= self.scoring.excellent_accuracy {
            "Excellent accuracy: your results match the expected output.".to_string()
        } else if accuracy >= self.scoring.good_accuracy {
            "Good accuracy, though a few cells differ from the expected output.".to_string()
        } else {
            "Several results differ from the expected output; double-check your formulas and references."
                .to_string()
        });

        if !missing.is_empty() {
            sentences.push(format!(
                "The task called for {} but it was not used.",
                missing.join(", ")
            ));
        }

        sentences.push(if efficiency >= self.scoring.good_efficiency {
            "You worked efficiently with few unnecessary edits.".to_string()
        } else {
            "Aim for fewer edits by letting functions such as INDEX/MATCH or SUMPRODUCT do the work."
                .to_string()
        });

        sentences.join(" ")
    }
}

fn contains_function(functions: &[String], name: &str) -> bool {
    functions.iter().any(|f| f.eq_ignore_ascii_case(name.trim()))
}

/// Required functions absent from `used`, upper-cased, in rubric order
pub fn missing_functions(required: &[String], used: &[String]) -> Vec<String> {
    dedup_in_order(
        required
            .iter()
            .filter(|name| !contains_function(used, name))
            .map(|name| name.trim().to_ascii_uppercase()),
    )
}
