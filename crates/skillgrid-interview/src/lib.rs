//! # skillgrid-interview
//!
//! The scoring and session logic of a skillgrid interview.
//!
//! - [`session`] - the five-phase state machine with async transition hooks
//! - [`task`] - practical task definitions and the task evaluator
//! - [`action`] - the candidate's edit log and the metrics derived from it
//! - [`conceptual`] - conceptual answer scoring with a keyword fallback
//! - [`analytics`] - the end-of-session report
//! - [`evaluator`] - the contract with the external text evaluator
//! - [`eligibility`] - who may start an assessment
//! - [`config`] - session configuration and the TTL cache
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use skillgrid_interview::{InterviewConfig, ManualClock, Phase, SessionMachine};
//!
//! # tokio_test_block_on(async {
//! let clock = ManualClock::default();
//! let mut machine = SessionMachine::start("demo", InterviewConfig::default(), Arc::new(clock));
//! assert!(!machine.transition_to(Phase::PracticalTasks, None).await);
//! assert!(machine.transition_to(Phase::ConceptualQuestions, None).await);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod action;
pub mod analytics;
pub mod clock;
pub mod conceptual;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod evaluator;
pub mod session;
pub mod task;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use action::{
    ActionCategory, ActionKind, ActionPayload, ActionTracker, EfficiencyMetrics, UserAction,
};
pub use analytics::{
    aggregate, aggregate_session, AnalyticsReport, ImprovementPlan, Priority, ReportGenerator,
    SkillCategory, SkillLevelAssessment, SkillScore,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use conceptual::{ConceptualQuestion, ConceptualScorer, FeedbackSource, QuestionScore};
pub use config::{ConfigCache, InterviewConfig, SkillLevel, TimeAllocation};
pub use eligibility::{Eligibility, EligibilityPolicy};
pub use error::{EvaluatorError, InterviewError, Result};
pub use evaluator::{
    evaluate_with_retry, parse_evaluation, EvaluationPrompt, OfflineEvaluator, RetryPolicy,
    TextEvaluation, TextEvaluator,
};
pub use session::{
    ConceptualProgress, HookContext, HookError, InterviewSession, Phase, PracticalProgress,
    SessionHooks, SessionMachine, StateData, StateTransition, TransitionData, TransitionTrigger,
    OVERDUE_NOTE,
};
pub use task::{
    PracticalTask, ScoringOptions, SubmissionTrigger, TaskEvaluator, TaskResult, TaskRubric,
    TaskSubmission,
};
