//! # skillgrid
//!
//! Spreadsheet skills interviews.
//!
//! A candidate moves through a fixed sequence of phases: introduction,
//! conceptual questions, hands-on spreadsheet tasks, feedback and conclusion.
//! skillgrid scores the tasks by diffing the candidate's final grid against
//! an expected one, analyzing the formulas they used and the edit log they
//! produced, and rolls everything up into an analytics report.
//!
//! ## Crates
//!
//! - `skillgrid-core` - snapshot data model and the grid differ
//! - `skillgrid-formula` - formula text analysis
//! - `skillgrid-interview` - session state machine, task evaluator, analytics
//! - `skillgrid` (this crate) - [`InterviewService`] and the [`KeyValueStore`] it persists to
//!
//! ## Example
//!
//! ```rust
//! use skillgrid::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> skillgrid::Result<()> {
//! let service = InterviewService::new(MemoryStore::new(), OfflineEvaluator);
//! let session = service.create_session(InterviewConfig::new(SkillLevel::Basic))?;
//!
//! assert!(service.transition(&session.id, Phase::ConceptualQuestions).await?);
//! assert!(!service.transition(&session.id, Phase::Conclusion).await?);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod prelude;
pub mod service;
pub mod store;

pub use error::{Result, ServiceError, StoreError};
pub use service::{InterviewService, DEFAULT_TASK_TTL};
pub use store::{KeyValueStore, KeyValueStoreExt, MemoryStore, StoreResult};

// Re-export core types
pub use skillgrid_core::{
    CellAddress, CellChange, CellRange, CellStyle, CellValue, Color, DiffOptions, DiffReport,
    GridDiffer, HorizontalAlignment, Sheet, SheetConfig, SnapshotMetadata, SpreadsheetSnapshot,
    Cell, MAX_COLS, MAX_ROWS,
};

// Re-export formula analysis
pub use skillgrid_formula::{analyze, FormulaAnalysis, FunctionCategory};

// Re-export interview types
pub use skillgrid_interview::{
    aggregate, ActionCategory, ActionKind, ActionPayload, ActionTracker, AnalyticsReport, Clock,
    ConceptualProgress, ConceptualQuestion, ConfigCache, Eligibility, EligibilityPolicy,
    EvaluationPrompt, EvaluatorError, FeedbackSource, HookContext, HookError, InterviewConfig,
    InterviewError, InterviewSession, ManualClock, OfflineEvaluator, Phase, PracticalProgress,
    PracticalTask, QuestionScore, ReportGenerator, RetryPolicy, ScoringOptions, SessionHooks,
    SkillCategory, SkillLevel, SubmissionTrigger, SystemClock, TaskEvaluator, TaskResult,
    TaskRubric, TextEvaluation, TextEvaluator, TimeAllocation, TransitionTrigger, UserAction,
};
