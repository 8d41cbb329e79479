//! Prelude module - common imports for skillgrid users
//!
//! ```rust
//! use skillgrid::prelude::*;
//! ```

pub use crate::{
    // Snapshot model
    Cell,
    CellValue,
    Sheet,
    SpreadsheetSnapshot,

    // Formula analysis
    analyze,

    // Session API
    InterviewService,
    KeyValueStore,
    KeyValueStoreExt,
    MemoryStore,

    // Interview model
    ConceptualQuestion,
    InterviewConfig,
    Phase,
    PracticalTask,
    SkillLevel,
    SubmissionTrigger,
    TaskRubric,
    UserAction,

    // Evaluators
    OfflineEvaluator,
    TextEvaluator,

    // Errors
    Result,
    ServiceError,
};
