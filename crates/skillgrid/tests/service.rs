//! Session API scenarios against the in-memory store

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use pretty_assertions::assert_eq;
use skillgrid::{
    CellValue, ConceptualQuestion, Eligibility, EligibilityPolicy, FeedbackSource, HookContext,
    HookError, InterviewConfig, InterviewError, InterviewService, KeyValueStoreExt, ManualClock,
    MemoryStore, OfflineEvaluator, Phase, PracticalTask, RetryPolicy, ServiceError, SessionHooks,
    SkillLevel, SpreadsheetSnapshot, SubmissionTrigger, TaskResult, TaskRubric, TextEvaluation,
    TextEvaluator, UserAction,
};
use skillgrid_interview::testing::{ScriptedEvaluator, ScriptedReply};

const LOOKUP: &str = "=VLOOKUP(D2,A2:B3,2,FALSE)";

fn price_sheet() -> SpreadsheetSnapshot {
    let text = |s: &str| Some(CellValue::from(s));
    SpreadsheetSnapshot::from_rows(
        "Prices",
        vec![
            vec![text("SKU"), text("Price"), None, text("Find")],
            vec![text("X1"), Some(CellValue::from(10)), None, text("X2")],
            vec![text("X2"), Some(CellValue::from(20))],
        ],
    )
}

/// The price grid with E2 answered, by formula or by a typed value
fn answered(formula: Option<&str>) -> SpreadsheetSnapshot {
    let mut snapshot = price_sheet();
    let sheet = &mut snapshot.sheets[0];
    match formula {
        Some(f) => sheet.set_formula("E2", f, 20).unwrap(),
        None => sheet.set_value("E2", 20).unwrap(),
    }
    snapshot
}

fn lookup_task() -> PracticalTask {
    PracticalTask::new("lookup", "Price lookup", price_sheet())
        .with_description("Fill E2 with the price of the SKU in D2")
        .with_expected(answered(Some(LOOKUP)))
        .with_rubric(TaskRubric::new().requiring(["VLOOKUP"]))
}

fn service<E: TextEvaluator>(
    store: Arc<MemoryStore>,
    evaluator: E,
    clock: &ManualClock,
) -> InterviewService<Arc<MemoryStore>, E> {
    let service = InterviewService::new(store, evaluator)
        .with_clock(Arc::new(clock.clone()))
        .with_retry_policy(
            RetryPolicy::default()
                .with_backoff(Duration::from_millis(1))
                .with_attempt_timeout(Duration::from_secs(1)),
        );
    service.register_task(lookup_task()).unwrap();
    service
}

fn config() -> InterviewConfig {
    InterviewConfig::new(SkillLevel::Intermediate)
        .with_questions(1)
        .with_tasks(1)
}

/// Create a session and move it straight to the practical phase
async fn practical_session<E: TextEvaluator>(service: &InterviewService<Arc<MemoryStore>, E>) -> String {
    let id = service.create_session(config()).unwrap().id;
    assert!(service.transition(&id, Phase::ConceptualQuestions).await.unwrap());
    assert!(service.transition(&id, Phase::PracticalTasks).await.unwrap());
    service.start_task(&id, "lookup").await.unwrap();
    id
}

/// A full interview from introduction to conclusion
#[tokio::test]
async fn test_happy_path() {
    let clock = ManualClock::default();
    let store = Arc::new(MemoryStore::new());
    let service = service(Arc::clone(&store), OfflineEvaluator, &clock);

    let id = service.create_session(config()).unwrap().id;
    assert!(!service.auto_progress(&id).await.unwrap());
    clock.advance(Duration::from_secs(30));
    assert!(service.auto_progress(&id).await.unwrap());

    let question = ConceptualQuestion::new("q1", "lookups", "How does VLOOKUP find a value?")
        .with_keywords(["first column", "exact match"]);
    let score = service
        .answer_question(&id, &question, "It searches the first column for an exact match")
        .await
        .unwrap();
    assert_eq!(score.source, FeedbackSource::Fallback);
    assert_eq!(score.score, 100.0);
    assert!(service.auto_progress(&id).await.unwrap());

    service.start_task(&id, "lookup").await.unwrap();
    service
        .record_action(&id, "lookup", UserAction::formula_input(1_000, "E2", LOOKUP))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(45));
    let result = service
        .submit_task(&id, "lookup", &answered(Some(LOOKUP)), SubmissionTrigger::Manual)
        .await
        .unwrap();
    assert_eq!(result.accuracy_score, 100.0);
    assert_eq!(result.efficiency_score, 100.0);
    assert_eq!(result.best_practices_score, 100.0);
    assert_eq!(result.completion_time_ms, 45_000);
    assert!(result.used_function("vlookup"));

    assert!(service.auto_progress(&id).await.unwrap());
    let report = service.get_report(&id).await.unwrap();
    assert_eq!(report.overall_score, 100.0);
    assert_eq!(report.skill_level_assessment.recommended_level, SkillLevel::Advanced);
    assert_eq!(report.total_duration_ms, 75_000);
    assert_eq!(report.feedback_source, FeedbackSource::Fallback);

    assert!(service.auto_progress(&id).await.unwrap());
    let session = service.get_session(&id).await.unwrap();
    assert_eq!(session.current_state, Phase::Conclusion);
    assert_eq!(session.total_duration_ms, Some(75_000));

    let keys = store.keys();
    for key in [
        format!("session/{id}"),
        format!("results/{id}"),
        format!("actions/{id}/lookup"),
        format!("answers/{id}"),
        format!("report/{id}"),
        "tasks/lookup".to_string(),
    ] {
        assert!(keys.contains(&key), "missing {key}");
    }
}

/// Typing the answer instead of using the required function costs best practices
#[tokio::test]
async fn test_missing_required_function() {
    let clock = ManualClock::default();
    let service = service(Arc::new(MemoryStore::new()), OfflineEvaluator, &clock);
    let id = practical_session(&service).await;

    service
        .record_action(&id, "lookup", UserAction::edit(1_000, "E2", 20))
        .await
        .unwrap();
    let result = service
        .submit_task(&id, "lookup", &answered(None), SubmissionTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(result.accuracy_score, 100.0);
    assert!(result.best_practices_score <= 80.0);
    assert!(result.feedback.contains("VLOOKUP"));
}

/// The timer and the candidate submit at the same moment; only one result exists
#[tokio::test]
async fn test_concurrent_submissions_score_once() {
    let clock = ManualClock::default();
    let store = Arc::new(MemoryStore::new());
    let service = service(Arc::clone(&store), OfflineEvaluator, &clock);
    let id = practical_session(&service).await;

    let grid = answered(Some(LOOKUP));
    let (manual, timeout) = tokio::join!(
        service.submit_task(&id, "lookup", &grid, SubmissionTrigger::Manual),
        service.submit_task(&id, "lookup", &grid, SubmissionTrigger::Timeout),
    );
    assert_eq!(manual.unwrap(), timeout.unwrap());

    let stored: Vec<TaskResult> = store.list_json(&format!("results/{id}")).unwrap();
    assert_eq!(stored.len(), 1);
    let session = service.get_session(&id).await.unwrap();
    assert_eq!(session.state_data.tasks_completed, 1);
}

/// A hanging then failing evaluator is retried until it answers
#[tokio::test(start_paused = true)]
async fn test_evaluator_retry_then_success() {
    let clock = ManualClock::default();
    let verdict = TextEvaluation {
        score: 64.0,
        feedback: "Mentions the lookup column but not match modes.".into(),
        strengths: vec!["terminology".into()],
        improvements: Vec::new(),
    };
    let evaluator = ScriptedEvaluator::new([
        ScriptedReply::Hang,
        ScriptedReply::Fail("busy".into()),
        ScriptedReply::Text(format!(
            "Here you go:\n```json\n{}\n```",
            serde_json::to_string(&verdict).unwrap()
        )),
    ]);
    let service = service(Arc::new(MemoryStore::new()), evaluator, &clock);

    let id = service.create_session(config()).unwrap().id;
    service.transition(&id, Phase::ConceptualQuestions).await.unwrap();
    let question = ConceptualQuestion::new("q1", "lookups", "How does VLOOKUP find a value?");
    let score = service
        .answer_question(&id, &question, "It looks in the leftmost column")
        .await
        .unwrap();

    assert_eq!(score.source, FeedbackSource::Evaluator);
    assert_eq!(score.score, 64.0);
    assert_eq!(score.feedback, verdict.feedback);
}

/// Session state survives a service restart over the same store
#[tokio::test]
async fn test_reload_from_store() {
    let clock = ManualClock::default();
    let store = Arc::new(MemoryStore::new());

    let (id, first) = {
        let service = service(Arc::clone(&store), OfflineEvaluator, &clock);
        let id = practical_session(&service).await;
        let result = service
            .submit_task(&id, "lookup", &answered(Some(LOOKUP)), SubmissionTrigger::Manual)
            .await
            .unwrap();
        (id, result)
    };

    let restarted = service(Arc::clone(&store), OfflineEvaluator, &clock);
    let session = restarted.get_session(&id).await.unwrap();
    assert_eq!(session.current_state, Phase::PracticalTasks);
    assert_eq!(session.state_data.tasks_completed, 1);
    assert_eq!(session.state_history.len(), 2);

    let again = restarted
        .submit_task(&id, "lookup", &answered(None), SubmissionTrigger::Timeout)
        .await
        .unwrap();
    assert_eq!(again, first);
    assert_eq!(restarted.task_results(&id).await.unwrap().len(), 1);
}

/// Allowlist and repeat-response rules apply when a session is created
#[tokio::test]
async fn test_eligibility() {
    let clock = ManualClock::default();
    let service = service(Arc::new(MemoryStore::new()), OfflineEvaluator, &clock)
        .with_eligibility(EligibilityPolicy::invite_only(["cand@example.com"]));

    let refused = service.create_session(config().with_candidate_email("other@example.com"));
    assert!(matches!(
        refused,
        Err(ServiceError::Interview(InterviewError::NotEligible {
            reason: Eligibility::NotInvited,
            ..
        }))
    ));

    service
        .create_session(config().with_candidate_email(" Cand@Example.com"))
        .unwrap();
    let repeat = service.create_session(config().with_candidate_email("cand@example.com"));
    assert!(matches!(
        repeat,
        Err(ServiceError::Interview(InterviewError::NotEligible {
            reason: Eligibility::AlreadyResponded,
            ..
        }))
    ));
}

/// Operations outside their phase or before their task are refused
#[tokio::test]
async fn test_guards() {
    let clock = ManualClock::default();
    let service = service(Arc::new(MemoryStore::new()), OfflineEvaluator, &clock);
    let id = service.create_session(config()).unwrap().id;

    let early = service
        .submit_task(&id, "lookup", &answered(None), SubmissionTrigger::Manual)
        .await;
    assert!(matches!(
        early,
        Err(ServiceError::Interview(InterviewError::WrongPhase {
            expected: Phase::PracticalTasks,
            actual: Phase::Introduction,
        }))
    ));

    let unstarted = service
        .record_action(&id, "lookup", UserAction::edit(0, "E2", 20))
        .await;
    assert!(matches!(unstarted, Err(ServiceError::TaskNotStarted { .. })));

    service.transition(&id, Phase::ConceptualQuestions).await.unwrap();
    service.transition(&id, Phase::PracticalTasks).await.unwrap();
    assert!(matches!(
        service.start_task(&id, "pivot").await,
        Err(ServiceError::UnknownTask(_))
    ));
    assert!(matches!(
        service.get_session("nope").await,
        Err(ServiceError::UnknownSession(_))
    ));
}

type SharedService = Arc<InterviewService<Arc<MemoryStore>, OfflineEvaluator>>;
type BoxedHookFuture = Pin<Box<dyn Future<Output = Result<(), HookError>> + Send>>;

/// Hook that reads the session back through the service
fn reading_hook(
    service: Arc<OnceLock<SharedService>>,
    seen: Arc<Mutex<Vec<(&'static str, Option<Phase>)>>>,
    stage: &'static str,
) -> impl Fn(HookContext) -> BoxedHookFuture + Send + Sync + 'static {
    move |ctx: HookContext| -> BoxedHookFuture {
        let service = Arc::clone(&service);
        let seen = Arc::clone(&seen);
        Box::pin(async move {
            let phase = match service.get() {
                Some(service) => service
                    .get_session(&ctx.session_id)
                    .await
                    .ok()
                    .map(|s| s.current_state),
                None => None,
            };
            seen.lock().unwrap().push((stage, phase));
            Ok::<(), HookError>(())
        })
    }
}

/// Hooks may call back into the service for the session they run for
#[tokio::test]
async fn test_hooks_can_reenter_service() {
    let clock = ManualClock::default();
    let handle: Arc<OnceLock<SharedService>> = Arc::new(OnceLock::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hooks = SessionHooks::new()
        .on_exit(
            Phase::Introduction,
            reading_hook(Arc::clone(&handle), Arc::clone(&seen), "exit"),
        )
        .on_enter(
            Phase::ConceptualQuestions,
            reading_hook(Arc::clone(&handle), Arc::clone(&seen), "enter"),
        );

    let service: SharedService =
        Arc::new(service(Arc::new(MemoryStore::new()), OfflineEvaluator, &clock).with_hooks(hooks));
    assert!(handle.set(Arc::clone(&service)).is_ok());

    let id = service.create_session(config()).unwrap().id;
    clock.advance(Duration::from_secs(30));
    let moved = tokio::time::timeout(Duration::from_secs(5), service.auto_progress(&id))
        .await
        .expect("transition must not wait on its own hooks")
        .unwrap();
    assert!(moved);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("exit", Some(Phase::Introduction)),
            ("enter", Some(Phase::ConceptualQuestions)),
        ]
    );
    let session = service.get_session(&id).await.unwrap();
    assert_eq!(session.state_history.len(), 1);
}
