//! Conceptual question scoring
//!
//! Answers are scored by the text evaluator. When it cannot produce a valid
//! verdict, a keyword-coverage heuristic takes over so every answer still
//! gets a score and feedback.

use serde::{Deserialize, Serialize};

use crate::config::SkillLevel;
use crate::evaluator::{evaluate_with_retry, EvaluationPrompt, RetryPolicy, TextEvaluator};

/// A conceptual interview question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptualQuestion {
    pub id: String,
    /// Topic used for per-category scores, e.g. `lookups`
    pub category: String,
    pub prompt: String,
    /// Concepts a good answer mentions
    #[serde(default)]
    pub expected_keywords: Vec<String>,
}

impl ConceptualQuestion {
    pub fn new<I, C, P>(id: I, category: C, prompt: P) -> Self
    where
        I: Into<String>,
        C: Into<String>,
        P: Into<String>,
    {
        Self {
            id: id.into(),
            category: category.into(),
            prompt: prompt.into(),
            expected_keywords: Vec::new(),
        }
    }

    pub fn with_keywords<K, S>(mut self, keywords: K) -> Self
    where
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// Where a piece of feedback came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    Evaluator,
    Fallback,
}

/// Score for one answered question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: String,
    pub category: String,
    /// 0-100
    pub score: f64,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub source: FeedbackSource,
}

/// Keyword-coverage score: 0 for a blank answer, otherwise 40-100
///
/// A question without keywords scores 70 for any non-blank answer.
pub fn keyword_score(question: &ConceptualQuestion, transcript: &str) -> f64 {
    let transcript = transcript.trim().to_lowercase();
    if transcript.is_empty() {
        return 0.0;
    }
    let coverage = if question.expected_keywords.is_empty() {
        0.5
    } else {
        let (hits, _) = split_keywords(question, &transcript);
        hits.len() as f64 / question.expected_keywords.len() as f64
    };
    40.0 + 60.0 * coverage
}

fn split_keywords<'q>(question: &'q ConceptualQuestion, lowered: &str) -> (Vec<&'q str>, Vec<&'q str>) {
    question
        .expected_keywords
        .iter()
        .map(String::as_str)
        .partition(|k| lowered.contains(&k.to_lowercase()))
}

/// Deterministic score and feedback used when the evaluator fails
pub fn fallback_score(question: &ConceptualQuestion, transcript: &str) -> QuestionScore {
    let score = keyword_score(question, transcript);
    let lowered = transcript.trim().to_lowercase();
    let (hits, misses) = split_keywords(question, &lowered);

    let feedback = if lowered.is_empty() {
        "No answer was recorded for this question.".to_string()
    } else if misses.is_empty() {
        "Your answer covered the key concepts.".to_string()
    } else {
        format!("Consider also discussing: {}.", misses.join(", "))
    };

    QuestionScore {
        question_id: question.id.clone(),
        category: question.category.clone(),
        score,
        feedback,
        strengths: hits.iter().map(|k| format!("Mentioned {k}")).collect(),
        improvements: misses.iter().map(|k| format!("Explain {k}")).collect(),
        source: FeedbackSource::Fallback,
    }
}

/// Scores answers through a text evaluator with a keyword fallback
#[derive(Debug)]
pub struct ConceptualScorer<E> {
    evaluator: E,
    policy: RetryPolicy,
}

impl<E: TextEvaluator> ConceptualScorer<E> {
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

    /// Score one answer; never fails
    pub async fn score(
        &self,
        question: &ConceptualQuestion,
        transcript: &str,
        skill_level: SkillLevel,
    ) -> QuestionScore {
        if transcript.trim().is_empty() {
            return fallback_score(question, transcript);
        }

        let prompt = EvaluationPrompt::ConceptualAnswer {
            question: question.prompt.clone(),
            category: question.category.clone(),
            transcript: transcript.to_string(),
            skill_level,
            expected_keywords: question.expected_keywords.clone(),
        };

        match evaluate_with_retry(&self.evaluator, &prompt, &self.policy).await {
            Ok(evaluation) => QuestionScore {
                question_id: question.id.clone(),
                category: question.category.clone(),
                score: evaluation.score,
                feedback: evaluation.feedback,
                strengths: evaluation.strengths,
                improvements: evaluation.improvements,
                source: FeedbackSource::Evaluator,
            },
            Err(e) => {
                tracing::warn!(question_id = %question.id, error = %e, "using keyword fallback for answer");
                fallback_score(question, transcript)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::OfflineEvaluator;
    use crate::testing::{ScriptedEvaluator, ScriptedReply};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn question() -> ConceptualQuestion {
        ConceptualQuestion::new("q1", "lookups", "How does VLOOKUP find a value?")
            .with_keywords(["exact match", "first column", "range_lookup", "sorted"])
    }

    #[test]
    fn test_keyword_score() {
        let q = question();
        assert_eq!(keyword_score(&q, "   "), 0.0);
        assert_eq!(keyword_score(&q, "It scans the FIRST COLUMN for an exact match"), 70.0);
        assert_eq!(
            keyword_score(&q, "first column, exact match unless range_lookup is TRUE and data is sorted"),
            100.0
        );
        assert_eq!(keyword_score(&q, "no idea"), 40.0);
        assert_eq!(keyword_score(&ConceptualQuestion::new("q", "c", "p"), "anything"), 70.0);
    }

    #[test]
    fn test_fallback_feedback() {
        let score = fallback_score(&question(), "It looks at the first column");
        assert_eq!(score.source, FeedbackSource::Fallback);
        assert_eq!(score.score, 55.0);
        assert_eq!(score.strengths, vec!["Mentioned first column"]);
        assert!(score.feedback.contains("exact match, range_lookup, sorted"));
    }

    #[tokio::test]
    async fn test_scorer_uses_evaluator() {
        let evaluator = ScriptedEvaluator::new([ScriptedReply::Text(
            r#"{"score": 88, "feedback": "Precise", "strengths": ["terminology"]}"#.into(),
        )]);
        let scorer = ConceptualScorer::new(evaluator);
        let score = scorer.score(&question(), "first column exact match", SkillLevel::Basic).await;
        assert_eq!(score.score, 88.0);
        assert_eq!(score.source, FeedbackSource::Evaluator);
        assert_eq!(score.strengths, vec!["terminology"]);
    }

    #[tokio::test]
    async fn test_scorer_falls_back() {
        let scorer = ConceptualScorer::new(OfflineEvaluator)
            .with_policy(RetryPolicy::default().with_backoff(Duration::from_millis(1)));
        let score = scorer.score(&question(), "first column", SkillLevel::Basic).await;
        assert_eq!(score.source, FeedbackSource::Fallback);
        assert_eq!(score.score, 55.0);
    }

    #[tokio::test]
    async fn test_blank_answer_skips_evaluator() {
        let evaluator = ScriptedEvaluator::default();
        let scorer = ConceptualScorer::new(evaluator);
        let score = scorer.score(&question(), "", SkillLevel::Advanced).await;
        assert_eq!(score.score, 0.0);
        assert_eq!(scorer.evaluator.calls(), 0);
    }
}
