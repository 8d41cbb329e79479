//! Scripted text evaluator for tests
//!
//! Available to this crate's tests and, with the `test-util` feature, to
//! dependents.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::EvaluatorError;
use crate::evaluator::{EvaluationPrompt, TextEvaluation, TextEvaluator};

/// One canned evaluator reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Respond with this raw text
    Text(String),
    /// Fail with [`EvaluatorError::Unavailable`]
    Fail(String),
    /// Never respond
    Hang,
}

/// Evaluator that plays back a script of replies, for tests and demos
///
/// Once the script runs out every call fails.
#[derive(Debug, Default)]
pub struct ScriptedEvaluator {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    pub fn new<I: IntoIterator<Item = ScriptedReply>>(replies: I) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A script that always answers with `evaluation`
    pub fn always(evaluation: &TextEvaluation, times: usize) -> Self {
        let raw = serde_json::to_string(evaluation).unwrap_or_default();
        Self::new(std::iter::repeat(ScriptedReply::Text(raw)).take(times))
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

impl TextEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, _prompt: &EvaluationPrompt) -> Result<String, EvaluatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_reply() {
            Some(ScriptedReply::Text(raw)) => Ok(raw),
            Some(ScriptedReply::Fail(reason)) => Err(EvaluatorError::Unavailable(reason)),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            None => Err(EvaluatorError::Unavailable("script exhausted".into())),
        }
    }
}
