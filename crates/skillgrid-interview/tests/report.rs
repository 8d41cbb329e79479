//! A practical task scored end to end and folded into the session report

use std::sync::Arc;

use pretty_assertions::assert_eq;
use skillgrid_core::{CellValue, SpreadsheetSnapshot};
use skillgrid_interview::{
    aggregate_session, ConceptualProgress, FeedbackSource, InterviewConfig, ManualClock, Phase,
    PracticalProgress, PracticalTask, QuestionScore, SessionMachine, SkillLevel,
    SubmissionTrigger, TaskEvaluator, TaskRubric, UserAction,
};

fn sales_sheet() -> SpreadsheetSnapshot {
    let header = ["Item", "Qty", "Price", "Total"].map(|s| Some(CellValue::from(s))).to_vec();
    SpreadsheetSnapshot::from_rows(
        "Sales",
        vec![
            header,
            vec![Some("A".into()), Some(2.into()), Some(3.into()), None],
            vec![Some("B".into()), Some(4.into()), Some(5.into()), None],
        ],
    )
}

fn completed(d2: f64, d3: f64) -> SpreadsheetSnapshot {
    let mut snapshot = sales_sheet();
    let sheet = &mut snapshot.sheets[0];
    sheet.set_formula("D2", "=B2*C2", d2).unwrap();
    sheet.set_formula("D3", "=B3*C3", d3).unwrap();
    snapshot
}

fn task(rubric: TaskRubric) -> PracticalTask {
    PracticalTask::new("totals", "Line totals", sales_sheet())
        .with_expected(completed(6.0, 20.0))
        .with_rubric(rubric)
}

fn actions() -> Vec<UserAction> {
    vec![
        UserAction::formula_input(0, "D2", "=B2*C2"),
        UserAction::formula_input(5_000, "D3", "=B3*C3"),
    ]
}

/// A correct, unhurried submission scores full marks
#[test]
fn test_clean_submission() {
    let result = TaskEvaluator::new().evaluate_task(
        &task(TaskRubric::new()),
        &completed(6.0, 20.0),
        &actions(),
        90_000,
        SubmissionTrigger::Manual,
    );
    assert_eq!(result.accuracy_score, 100.0);
    assert_eq!(result.efficiency_score, 100.0);
    assert_eq!(result.best_practices_score, 100.0);
    assert_eq!(result.functions_used, Vec::<String>::new());
    assert!(result.feedback.starts_with("Excellent accuracy"));
}

/// A wrong total and a skipped required function both cost points
#[test]
fn test_partial_submission() {
    let result = TaskEvaluator::new().evaluate_task(
        &task(TaskRubric::new().requiring(["SUMPRODUCT"])),
        &completed(6.0, 21.0),
        &actions(),
        90_000,
        SubmissionTrigger::Timeout,
    );
    // 12 graded cells, 11 right
    assert!((result.accuracy_score - 11.0 / 12.0 * 100.0).abs() < 1e-9);
    assert_eq!(result.best_practices_score, 80.0);
    assert_eq!(result.completed_by, SubmissionTrigger::Timeout);
    assert!(result.feedback.contains("SUMPRODUCT"));
}

/// Session aggregates feed the report, and aggregation is repeatable
#[tokio::test]
async fn test_session_report_is_idempotent() {
    let clock = ManualClock::default();
    let config = InterviewConfig::new(SkillLevel::Basic)
        .with_questions(1)
        .with_tasks(1);
    let mut machine = SessionMachine::start("report", config, Arc::new(clock.clone()));

    assert!(machine.transition_to(Phase::ConceptualQuestions, None).await);
    machine
        .record_question_score(&QuestionScore {
            question_id: "q1".into(),
            category: "formulas".into(),
            score: 90.0,
            feedback: String::new(),
            strengths: Vec::new(),
            improvements: Vec::new(),
            source: FeedbackSource::Evaluator,
        })
        .unwrap();
    assert!(machine.auto_progress().await);

    let result = TaskEvaluator::new().evaluate_task(
        &task(TaskRubric::new()),
        &completed(6.0, 20.0),
        &actions(),
        90_000,
        SubmissionTrigger::Manual,
    );
    machine.record_task_result(&result).unwrap();
    assert!(machine.auto_progress().await);

    let results = vec![result];
    let first = aggregate_session(machine.session(), &results);
    let second = aggregate_session(machine.session(), &results);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    assert_eq!(first.overall_score, 95.0);
    assert_eq!(first.skill_level_assessment.recommended_level, SkillLevel::Intermediate);
    assert_eq!(first.strengths, vec!["formulas"]);
    assert_eq!(first.task_count, 1);

    // Reading the session never changed it
    assert_eq!(machine.session().practical_progress, PracticalProgress::from_results(&results));
    assert_ne!(machine.session().conceptual_progress, ConceptualProgress::default());
}
