//! End-of-session analytics
//!
//! [`aggregate`] turns the running progress aggregates and the individual task
//! results into an [`AnalyticsReport`]. It is pure: the same inputs always
//! give the same report. [`ReportGenerator`] adds an evaluator-written
//! narrative on top, keeping the templated one when the evaluator fails.

use serde::{Deserialize, Serialize};
use skillgrid_formula::catalog;

use crate::action::ActionCategory;
use crate::conceptual::FeedbackSource;
use crate::config::SkillLevel;
use crate::evaluator::{evaluate_with_retry, EvaluationPrompt, RetryPolicy, TextEvaluator};
use crate::session::{ConceptualProgress, InterviewSession, PracticalProgress};
use crate::task::TaskResult;

/// Score given to a skill category nothing measured
pub const UNMEASURED_SCORE: f64 = 70.0;

/// Categories below this get an improvement plan
pub const IMPROVEMENT_THRESHOLD: f64 = 70.0;

/// Target score of every improvement plan
pub const TARGET_SCORE: f64 = 80.0;

/// Conceptual categories below this are knowledge gaps
pub const GAP_THRESHOLD: f64 = 60.0;

/// Conceptual categories at or above this are strengths
pub const STRENGTH_THRESHOLD: f64 = 80.0;

/// Reported skill areas, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    FormulaAccuracy,
    DataAnalysis,
    Efficiency,
    BestPractices,
    Presentation,
    ProblemSolving,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 6] = [
        SkillCategory::FormulaAccuracy,
        SkillCategory::DataAnalysis,
        SkillCategory::Efficiency,
        SkillCategory::BestPractices,
        SkillCategory::Presentation,
        SkillCategory::ProblemSolving,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SkillCategory::FormulaAccuracy => "formula_accuracy",
            SkillCategory::DataAnalysis => "data_analysis",
            SkillCategory::Efficiency => "efficiency",
            SkillCategory::BestPractices => "best_practices",
            SkillCategory::Presentation => "presentation",
            SkillCategory::ProblemSolving => "problem_solving",
        }
    }

    /// Fixed practice suggestions for the category
    pub fn recommended_actions(self) -> &'static [&'static str] {
        match self {
            SkillCategory::FormulaAccuracy => &[
                "Check formula results against a hand-calculated sample",
                "Practice absolute and relative references",
            ],
            SkillCategory::DataAnalysis => &[
                "Work through lookup exercises with VLOOKUP and INDEX/MATCH",
                "Summarize a dataset with a pivot table",
            ],
            SkillCategory::Efficiency => &[
                "Fill formulas down instead of retyping them",
                "Learn keyboard shortcuts for navigation and selection",
            ],
            SkillCategory::BestPractices => &[
                "Use the functions a task calls for",
                "Keep inputs and calculations in separate ranges",
            ],
            SkillCategory::Presentation => &[
                "Apply consistent number formats and header styling",
                "Build a chart that answers one clear question",
            ],
            SkillCategory::ProblemSolving => &[
                "Break multi-step tasks into helper columns",
                "Restate the goal before starting a task",
            ],
        }
    }
}

/// Score for one skill area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScore {
    pub category: SkillCategory,
    pub score: f64,
    /// False when the score is the unmeasured default
    pub measured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

/// Suggested next steps for a weak area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementPlan {
    pub area: SkillCategory,
    pub current_score: f64,
    pub target_score: f64,
    pub priority: Priority,
    pub recommended_actions: Vec<String>,
    pub estimated_time: String,
}

/// Whether the candidate is ready for the next level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillLevelAssessment {
    pub current_level: SkillLevel,
    pub recommended_level: SkillLevel,
    pub readiness_threshold: f64,
    pub ready_to_advance: bool,
}

/// Final report for a session; carries no wall-clock fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub skill_level_assessment: SkillLevelAssessment,
    pub overall_score: f64,
    pub conceptual_score: f64,
    pub practical_score: f64,
    pub skill_breakdown: Vec<SkillScore>,
    pub knowledge_gaps: Vec<String>,
    pub strengths: Vec<String>,
    pub improvement_plan: Vec<ImprovementPlan>,
    pub task_count: usize,
    pub total_duration_ms: u64,
    pub narrative_feedback: String,
    pub feedback_source: FeedbackSource,
}

impl AnalyticsReport {
    pub fn skill_score(&self, category: SkillCategory) -> Option<f64> {
        self.skill_breakdown
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.score)
    }
}

/// Build the report from session aggregates and task results
pub fn aggregate(
    skill_level: SkillLevel,
    conceptual: &ConceptualProgress,
    practical: &PracticalProgress,
    results: &[TaskResult],
    total_duration_ms: u64,
) -> AnalyticsReport {
    let conceptual_score = conceptual.average_score;
    let practical_score = practical.practical_score();
    let overall_score = (conceptual_score + practical_score) / 2.0;

    let threshold = skill_level.readiness_threshold();
    let ready = overall_score >= threshold;
    let assessment = SkillLevelAssessment {
        current_level: skill_level,
        recommended_level: if ready { skill_level.next() } else { skill_level },
        readiness_threshold: threshold,
        ready_to_advance: ready,
    };

    let skill_breakdown = skill_breakdown(results);
    let improvement_plan: Vec<ImprovementPlan> = skill_breakdown
        .iter()
        .filter(|s| s.score < IMPROVEMENT_THRESHOLD)
        .map(improvement_plan)
        .collect();

    let knowledge_gaps = conceptual
        .category_scores
        .iter()
        .filter(|(_, score)| **score < GAP_THRESHOLD)
        .map(|(category, _)| category.clone())
        .collect();
    let strengths = conceptual
        .category_scores
        .iter()
        .filter(|(_, score)| **score >= STRENGTH_THRESHOLD)
        .map(|(category, _)| category.clone())
        .collect();

    let mut report = AnalyticsReport {
        skill_level_assessment: assessment,
        overall_score,
        conceptual_score,
        practical_score,
        skill_breakdown,
        knowledge_gaps,
        strengths,
        improvement_plan,
        task_count: results.len(),
        total_duration_ms,
        narrative_feedback: String::new(),
        feedback_source: FeedbackSource::Fallback,
    };
    report.narrative_feedback = template_feedback(&report);
    report
}

/// Report for a session from its own aggregates
pub fn aggregate_session(session: &InterviewSession, results: &[TaskResult]) -> AnalyticsReport {
    aggregate(
        session.config.skill_level,
        &session.conceptual_progress,
        &session.practical_progress,
        results,
        session.total_duration_ms.unwrap_or_default(),
    )
}

fn skill_breakdown(results: &[TaskResult]) -> Vec<SkillScore> {
    SkillCategory::ALL
        .iter()
        .map(|&category| {
            let score = match category {
                SkillCategory::FormulaAccuracy => mean(results.iter().map(|r| r.accuracy_score)),
                SkillCategory::DataAnalysis => mean(
                    results
                        .iter()
                        .filter(|r| is_analytical(r))
                        .map(|r| (r.accuracy_score + r.best_practices_score) / 2.0),
                ),
                SkillCategory::Efficiency => mean(results.iter().map(|r| r.efficiency_score)),
                SkillCategory::BestPractices => mean(results.iter().map(|r| r.best_practices_score)),
                SkillCategory::Presentation => mean(
                    results
                        .iter()
                        .filter(|r| is_presentational(r))
                        .map(|r| r.best_practices_score),
                ),
                SkillCategory::ProblemSolving => mean(results.iter().map(TaskResult::mean_score)),
            };
            SkillScore {
                category,
                score: score.unwrap_or(UNMEASURED_SCORE),
                measured: score.is_some(),
            }
        })
        .collect()
}

fn is_analytical(result: &TaskResult) -> bool {
    result
        .functions_used
        .iter()
        .any(|f| catalog::category(f).is_some_and(|c| c.is_analytical()))
        || result
            .actions
            .iter()
            .any(|a| a.category() == ActionCategory::Analysis)
}

fn is_presentational(result: &TaskResult) -> bool {
    result.actions.iter().any(|a| {
        matches!(
            a.category(),
            ActionCategory::Format | ActionCategory::Presentation
        )
    })
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}

fn improvement_plan(skill: &SkillScore) -> ImprovementPlan {
    let estimated_time = if skill.score < 50.0 {
        "6-8 weeks"
    } else if skill.score < 60.0 {
        "4-6 weeks"
    } else {
        "2-4 weeks"
    };
    ImprovementPlan {
        area: skill.category,
        current_score: skill.score,
        target_score: TARGET_SCORE,
        priority: if skill.score < 50.0 {
            Priority::High
        } else {
            Priority::Medium
        },
        recommended_actions: skill
            .category
            .recommended_actions()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        estimated_time: estimated_time.to_string(),
    }
}

/// Deterministic narrative built from the numbers
pub fn template_feedback(report: &AnalyticsReport) -> String {
    let assessment = &report.skill_level_assessment;
    let mut feedback = format!(
        "You scored {:.1} overall ({:.1} conceptual, {:.1} practical) at the {} level.",
        report.overall_score, report.conceptual_score, report.practical_score, assessment.current_level,
    );

    if !assessment.ready_to_advance {
        feedback.push_str(&format!(
            " Reach {:.0} to move beyond {}.",
            assessment.readiness_threshold, assessment.current_level
        ));
    } else if assessment.recommended_level != assessment.current_level {
        feedback.push_str(&format!(
            " You are ready for {} material.",
            assessment.recommended_level
        ));
    } else {
        feedback.push_str(" You meet the bar for the highest level.");
    }

    let weakest = report
        .improvement_plan
        .iter()
        .min_by(|a, b| a.current_score.total_cmp(&b.current_score));
    if let Some(plan) = weakest {
        feedback.push_str(&format!(" Focus next on {}.", plan.area.as_str().replace('_', " ")));
    }
    feedback
}

/// Produces reports with an evaluator-written narrative when available
#[derive(Debug)]
pub struct ReportGenerator<E> {
    evaluator: E,
    policy: RetryPolicy,
}

impl<E: TextEvaluator> ReportGenerator<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// [`aggregate`], then ask the evaluator for the narrative
    pub async fn generate(
        &self,
        skill_level: SkillLevel,
        conceptual: &ConceptualProgress,
        practical: &PracticalProgress,
        results: &[TaskResult],
        total_duration_ms: u64,
    ) -> AnalyticsReport {
        let report = aggregate(skill_level, conceptual, practical, results, total_duration_ms);
        self.narrate(report).await
    }

    async fn narrate(&self, mut report: AnalyticsReport) -> AnalyticsReport {
        let prompt = EvaluationPrompt::SessionSummary {
            skill_level: report.skill_level_assessment.current_level,
            overall_score: report.overall_score,
            conceptual_score: report.conceptual_score,
            practical_score: report.practical_score,
            strengths: report.strengths.clone(),
            knowledge_gaps: report.knowledge_gaps.clone(),
        };

        match evaluate_with_retry(&self.evaluator, &prompt, &self.policy).await {
            Ok(evaluation) if !evaluation.feedback.trim().is_empty() => {
                report.narrative_feedback = evaluation.feedback;
                report.feedback_source = FeedbackSource::Evaluator;
            }
            Ok(_) => tracing::warn!("text evaluator returned empty feedback; using template"),
            Err(e) => tracing::warn!(error = %e, "using templated session feedback"),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, UserAction};
    use crate::evaluator::{OfflineEvaluator, TextEvaluation};
    use crate::testing::ScriptedEvaluator;
    use crate::task::SubmissionTrigger;
    use pretty_assertions::assert_eq;
    use skillgrid_core::SpreadsheetSnapshot;
    use std::time::Duration;

    fn result(accuracy: f64, efficiency: f64, best_practices: f64) -> TaskResult {
        TaskResult {
            task_id: "t".into(),
            initial_snapshot: SpreadsheetSnapshot::new(Vec::new()),
            final_snapshot: SpreadsheetSnapshot::new(Vec::new()),
            expected_snapshot: None,
            actions: Vec::new(),
            formulas_used: Vec::new(),
            functions_used: Vec::new(),
            completion_time_ms: 60_000,
            accuracy_score: accuracy,
            efficiency_score: efficiency,
            best_practices_score: best_practices,
            feedback: String::new(),
            completed_by: SubmissionTrigger::Manual,
        }
    }

    fn conceptual(scores: &[(&str, f64)]) -> ConceptualProgress {
        let mut progress = ConceptualProgress::default();
        for (category, score) in scores {
            progress.record(category, *score);
        }
        progress
    }

    #[test]
    fn test_overall_and_recommendation() {
        let results = vec![result(90.0, 80.0, 85.0)];
        let report = aggregate(
            SkillLevel::Intermediate,
            &conceptual(&[("lookups", 80.0)]),
            &PracticalProgress::from_results(&results),
            &results,
            1_200_000,
        );
        assert_eq!(report.practical_score, 85.0);
        assert_eq!(report.overall_score, 82.5);
        assert!(report.skill_level_assessment.ready_to_advance);
        assert_eq!(report.skill_level_assessment.recommended_level, SkillLevel::Advanced);
        assert_eq!(report.strengths, vec!["lookups"]);
        assert_eq!(report.feedback_source, FeedbackSource::Fallback);
        assert!(report.narrative_feedback.starts_with("You scored 82.5 overall"));
    }

    #[test]
    fn test_holds_level_below_threshold() {
        let results = vec![result(60.0, 60.0, 60.0)];
        let report = aggregate(
            SkillLevel::Basic,
            &conceptual(&[("pivots", 50.0)]),
            &PracticalProgress::from_results(&results),
            &results,
            0,
        );
        assert_eq!(report.skill_level_assessment.recommended_level, SkillLevel::Basic);
        assert_eq!(report.knowledge_gaps, vec!["pivots"]);
        assert!(report.narrative_feedback.contains("Reach 75"));
    }

    #[test]
    fn test_unmeasured_categories_default() {
        let report = aggregate(
            SkillLevel::Basic,
            &ConceptualProgress::default(),
            &PracticalProgress::default(),
            &[],
            0,
        );
        assert_eq!(report.skill_breakdown.len(), 6);
        assert!(report.skill_breakdown.iter().all(|s| s.score == 70.0 && !s.measured));
        assert!(report.improvement_plan.is_empty());
        assert_eq!(report.overall_score, 0.0);
    }

    #[test]
    fn test_improvement_plan_tiers() {
        let mut weak = result(40.0, 55.0, 65.0);
        weak.actions = vec![UserAction::new(1, ActionKind::SortData)];
        weak.functions_used = vec!["SUM".into()];
        let results = vec![weak];
        let report = aggregate(
            SkillLevel::Basic,
            &ConceptualProgress::default(),
            &PracticalProgress::from_results(&results),
            &results,
            0,
        );

        let plan: Vec<_> = report
            .improvement_plan
            .iter()
            .map(|p| (p.area, p.priority, p.estimated_time.as_str()))
            .collect();
        assert_eq!(
            plan,
            vec![
                (SkillCategory::FormulaAccuracy, Priority::High, "6-8 weeks"),
                (SkillCategory::DataAnalysis, Priority::Medium, "4-6 weeks"),
                (SkillCategory::Efficiency, Priority::Medium, "4-6 weeks"),
                (SkillCategory::BestPractices, Priority::Medium, "2-4 weeks"),
                (SkillCategory::ProblemSolving, Priority::Medium, "4-6 weeks"),
            ]
        );
        assert!(report.improvement_plan.iter().all(|p| p.target_score == 80.0));
        assert_eq!(report.skill_score(SkillCategory::Presentation), Some(70.0));
        assert!(report.narrative_feedback.ends_with("Focus next on formula accuracy."));
    }

    #[test]
    fn test_analytical_functions_count_toward_data_analysis() {
        let mut lookup = result(100.0, 100.0, 80.0);
        lookup.functions_used = vec!["VLOOKUP".into()];
        let results = vec![lookup, result(0.0, 0.0, 0.0)];
        let report = aggregate(
            SkillLevel::Advanced,
            &ConceptualProgress::default(),
            &PracticalProgress::from_results(&results),
            &results,
            0,
        );
        assert_eq!(report.skill_score(SkillCategory::DataAnalysis), Some(90.0));
    }

    #[tokio::test]
    async fn test_generator_uses_evaluator_narrative() {
        let evaluation = TextEvaluation {
            score: 82.0,
            feedback: "Strong lookup skills; tighten up formatting.".into(),
            strengths: Vec::new(),
            improvements: Vec::new(),
        };
        let generator = ReportGenerator::new(ScriptedEvaluator::always(&evaluation, 1));
        let results = vec![result(90.0, 80.0, 85.0)];
        let report = generator
            .generate(
                SkillLevel::Intermediate,
                &conceptual(&[("lookups", 80.0)]),
                &PracticalProgress::from_results(&results),
                &results,
                0,
            )
            .await;
        assert_eq!(report.feedback_source, FeedbackSource::Evaluator);
        assert_eq!(report.narrative_feedback, evaluation.feedback);
    }

    #[tokio::test]
    async fn test_generator_falls_back_to_template() {
        let generator = ReportGenerator::new(OfflineEvaluator)
            .with_policy(RetryPolicy::default().with_backoff(Duration::from_millis(1)));
        let report = generator
            .generate(
                SkillLevel::Basic,
                &ConceptualProgress::default(),
                &PracticalProgress::default(),
                &[],
                0,
            )
            .await;
        assert_eq!(report.feedback_source, FeedbackSource::Fallback);
        assert!(!report.narrative_feedback.is_empty());
    }
}
