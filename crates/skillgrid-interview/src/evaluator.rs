//! Contract with the external text evaluator
//!
//! The evaluator is an opaque collaborator (typically a language model) that
//! receives an [`EvaluationPrompt`] and answers with raw text that should
//! contain a JSON object:
//!
//! ```json
//! {"score": 82, "feedback": "...", "strengths": ["..."], "improvements": ["..."]}
//! ```
//!
//! [`evaluate_with_retry`] bounds every attempt with a timeout, retries a
//! fixed number of times and returns an explicit `Result`. Callers apply
//! their own fallback on `Err`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lazy_regex::regex;
use serde::{Deserialize, Serialize};

use crate::config::SkillLevel;
use crate::error::EvaluatorError;

/// Parsed evaluator verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEvaluation {
    /// 0-100
    pub score: f64,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

/// What the evaluator is asked to judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationPrompt {
    /// Score a spoken/typed answer to a conceptual question
    ConceptualAnswer {
        question: String,
        category: String,
        transcript: String,
        skill_level: SkillLevel,
        expected_keywords: Vec<String>,
    },
    /// Write the closing narrative for a finished session
    SessionSummary {
        skill_level: SkillLevel,
        overall_score: f64,
        conceptual_score: f64,
        practical_score: f64,
        strengths: Vec<String>,
        knowledge_gaps: Vec<String>,
    },
}

impl EvaluationPrompt {
    /// Plain-text rendering for evaluators that take a single string
    pub fn render(&self) -> String {
        match self {
            EvaluationPrompt::ConceptualAnswer {
                question,
                category,
                transcript,
                skill_level,
                expected_keywords,
            } => format!(
                "Evaluate this {skill_level} spreadsheet interview answer ({category}).\n\
                 Question: {question}\n\
                 Answer: {transcript}\n\
                 Key concepts: {}\n\
                 Respond with JSON: score (0-100), feedback, strengths, improvements.",
                expected_keywords.join(", ")
            ),
            EvaluationPrompt::SessionSummary {
                skill_level,
                overall_score,
                conceptual_score,
                practical_score,
                strengths,
                knowledge_gaps,
            } => format!(
                "Summarize a {skill_level} spreadsheet assessment.\n\
                 Overall: {overall_score:.1}, conceptual: {conceptual_score:.1}, practical: {practical_score:.1}\n\
                 Strengths: {}\n\
                 Knowledge gaps: {}\n\
                 Respond with JSON: score (0-100), feedback, strengths, improvements.",
                strengths.join(", "),
                knowledge_gaps.join(", ")
            ),
        }
    }
}

/// An external text evaluator
///
/// Implementations return the raw response text; parsing and validation
/// happen in [`parse_evaluation`].
pub trait TextEvaluator: Send + Sync {
    fn evaluate(
        &self,
        prompt: &EvaluationPrompt,
    ) -> impl Future<Output = Result<String, EvaluatorError>> + Send;
}

impl<T: TextEvaluator> TextEvaluator for Arc<T> {
    fn evaluate(
        &self,
        prompt: &EvaluationPrompt,
    ) -> impl Future<Output = Result<String, EvaluatorError>> + Send {
        (**self).evaluate(prompt)
    }
}

/// Extract and validate the evaluation JSON from a raw response
///
/// Tolerates Markdown code fences and prose around the object. Anything that
/// does not yield a JSON object with a score in 0-100 is an error.
pub fn parse_evaluation(raw: &str) -> Result<TextEvaluation, EvaluatorError> {
    let fenced = regex!(r"(?s)```(?:json)?\s*(.*?)\s*```");
    let body = fenced
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    let object = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return Err(EvaluatorError::Malformed("no JSON object in response".into())),
    };

    let evaluation: TextEvaluation =
        serde_json::from_str(object).map_err(|e| EvaluatorError::Malformed(e.to_string()))?;

    if !evaluation.score.is_finite() || !(0.0..=100.0).contains(&evaluation.score) {
        return Err(EvaluatorError::ScoreOutOfRange(evaluation.score));
    }
    Ok(evaluation)
}

/// Attempt budget for evaluator calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    /// Delay after the first failure; grows linearly per attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(20),
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Call the evaluator until it yields a valid evaluation or the policy is spent
pub async fn evaluate_with_retry<E: TextEvaluator>(
    evaluator: &E,
    prompt: &EvaluationPrompt,
    policy: &RetryPolicy,
) -> Result<TextEvaluation, EvaluatorError> {
    let attempts = policy.max_attempts.max(1);
    let mut last = EvaluatorError::Unavailable("no attempt made".into());

    for attempt in 1..=attempts {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, evaluator.evaluate(prompt)).await {
            Ok(Ok(raw)) => parse_evaluation(&raw),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EvaluatorError::Timeout(policy.attempt_timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(evaluation) => {
                tracing::debug!(attempt, score = evaluation.score, "text evaluation accepted");
                return Ok(evaluation);
            }
            Err(e) => {
                tracing::warn!(attempt, attempts, error = %e, "text evaluator attempt failed");
                last = e;
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.backoff * attempt).await;
        }
    }

    Err(EvaluatorError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    })
}

/// Evaluator used when no external service is configured; always unavailable
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineEvaluator;

impl TextEvaluator for OfflineEvaluator {
    async fn evaluate(&self, _prompt: &EvaluationPrompt) -> Result<String, EvaluatorError> {
        Err(EvaluatorError::Unavailable("no text evaluator configured".into()))
    }
}
