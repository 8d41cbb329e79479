//! Interview session state machine
//!
//! A session moves strictly forward through five phases:
//!
//! ```text
//! introduction -> conceptual_questions -> practical_tasks -> feedback_generation -> conclusion
//! ```
//!
//! There is no skipping and no going back. [`SessionMachine`] owns the
//! session record and applies transitions one at a time; callers that share a
//! machine between tasks wrap it in a mutex.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::conceptual::QuestionScore;
use crate::config::InterviewConfig;
use crate::error::{InterviewError, Result};
use crate::task::TaskResult;

/// Interview phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Introduction,
    ConceptualQuestions,
    PracticalTasks,
    FeedbackGeneration,
    Conclusion,
}

impl Phase {
    /// Every phase in session order
    pub const ALL: [Phase; 5] = [
        Phase::Introduction,
        Phase::ConceptualQuestions,
        Phase::PracticalTasks,
        Phase::FeedbackGeneration,
        Phase::Conclusion,
    ];

    /// The only phase this one may move to
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Introduction => Some(Phase::ConceptualQuestions),
            Phase::ConceptualQuestions => Some(Phase::PracticalTasks),
            Phase::PracticalTasks => Some(Phase::FeedbackGeneration),
            Phase::FeedbackGeneration => Some(Phase::Conclusion),
            Phase::Conclusion => None,
        }
    }

    /// Share of overall progress, in percent
    pub fn weight(self) -> f64 {
        match self {
            Phase::Introduction => 5.0,
            Phase::ConceptualQuestions => 30.0,
            Phase::PracticalTasks => 50.0,
            Phase::FeedbackGeneration => 10.0,
            Phase::Conclusion => 5.0,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Conclusion
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Introduction => "introduction",
            Phase::ConceptualQuestions => "conceptual_questions",
            Phase::PracticalTasks => "practical_tasks",
            Phase::FeedbackGeneration => "feedback_generation",
            Phase::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    #[default]
    Manual,
    AutoProgress,
    Timeout,
}

/// Context recorded alongside a transition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_completed: Option<u32>,
}

impl TransitionData {
    pub fn note<S: Into<String>>(note: S) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::default()
        }
    }
}

/// One entry of the session's transition history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_state: Phase,
    pub to_state: Phase,
    pub timestamp: DateTime<Utc>,
    pub trigger: TransitionTrigger,
    #[serde(default)]
    pub data: TransitionData,
}

/// Per-phase counters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateData {
    pub questions_completed: u32,
    pub tasks_completed: u32,
    pub total_questions: u32,
    pub total_tasks: u32,
    pub feedback_generated: bool,
    pub current_question_index: u32,
    pub current_task_index: u32,
}

/// Running aggregate of conceptual answer scores
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConceptualProgress {
    pub questions_answered: u32,
    pub average_score: f64,
    /// Mean score per question category
    pub category_scores: BTreeMap<String, f64>,
    pub category_counts: BTreeMap<String, u32>,
}

impl ConceptualProgress {
    /// Fold one answer score into the running means
    pub fn record(&mut self, category: &str, score: f64) {
        self.questions_answered += 1;
        self.average_score = running_mean(self.average_score, score, self.questions_answered);

        let count = self.category_counts.entry(category.to_string()).or_insert(0);
        *count += 1;
        let mean = self.category_scores.entry(category.to_string()).or_insert(0.0);
        *mean = running_mean(*mean, score, *count);
    }
}

/// Running aggregate of practical task scores
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticalProgress {
    pub tasks_completed: u32,
    pub average_accuracy: f64,
    pub average_efficiency: f64,
    pub average_best_practices: f64,
}

impl PracticalProgress {
    /// Build from a list of results
    pub fn from_results(results: &[TaskResult]) -> Self {
        let mut progress = Self::default();
        for result in results {
            progress.record(result);
        }
        progress
    }

    /// Fold one task result into the running means
    pub fn record(&mut self, result: &TaskResult) {
        self.tasks_completed += 1;
        let n = self.tasks_completed;
        self.average_accuracy = running_mean(self.average_accuracy, result.accuracy_score, n);
        self.average_efficiency = running_mean(self.average_efficiency, result.efficiency_score, n);
        self.average_best_practices =
            running_mean(self.average_best_practices, result.best_practices_score, n);
    }

    /// Mean of the three averages; 0 before any task is scored
    pub fn practical_score(&self) -> f64 {
        if self.tasks_completed == 0 {
            return 0.0;
        }
        (self.average_accuracy + self.average_efficiency + self.average_best_practices) / 3.0
    }
}

fn running_mean(mean: f64, value: f64, count: u32) -> f64 {
    mean + (value - mean) / f64::from(count)
}

/// Persistent record of one interview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: String,
    pub current_state: Phase,
    pub state_data: StateData,
    pub conceptual_progress: ConceptualProgress,
    pub practical_progress: PracticalProgress,
    pub start_time: DateTime<Utc>,
    /// When the current phase was entered
    pub phase_started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
    #[serde(default)]
    pub state_history: Vec<StateTransition>,
    pub config: InterviewConfig,
}

impl InterviewSession {
    pub fn new<S: Into<String>>(id: S, config: InterviewConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            current_state: Phase::Introduction,
            state_data: StateData {
                total_questions: config.question_count,
                total_tasks: config.task_count,
                ..StateData::default()
            },
            conceptual_progress: ConceptualProgress::default(),
            practical_progress: PracticalProgress::default(),
            start_time: now,
            phase_started_at: now,
            end_time: None,
            total_duration_ms: None,
            state_history: Vec::new(),
            config,
        }
    }

    pub fn is_concluded(&self) -> bool {
        self.current_state.is_terminal()
    }
}

/// What a transition hook is told
#[derive(Debug, Clone, PartialEq)]
pub struct HookContext {
    pub session_id: String,
    pub from: Phase,
    pub to: Phase,
    pub at: DateTime<Utc>,
}

/// Error returned by a hook
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future returned by a hook
pub type HookFuture = Pin<Box<dyn Future<Output = std::result::Result<(), HookError>> + Send>>;

/// Asynchronous transition hook
pub type Hook = Arc<dyn Fn(HookContext) -> HookFuture + Send + Sync>;

/// Hooks run around transitions, keyed by phase
///
/// `on_exit` hooks for the phase being left run before the transition is
/// recorded, `on_enter` hooks for the new phase run after. Each hook runs in
/// its own task; a failing or panicking hook is logged and skipped.
#[derive(Clone, Default)]
pub struct SessionHooks {
    on_exit: HashMap<Phase, Vec<Hook>>,
    on_enter: HashMap<Phase, Vec<Hook>>,
}

impl fmt::Debug for SessionHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |m: &HashMap<Phase, Vec<Hook>>| m.values().map(Vec::len).sum::<usize>();
        f.debug_struct("SessionHooks")
            .field("on_exit", &count(&self.on_exit))
            .field("on_enter", &count(&self.on_enter))
            .finish()
    }
}

impl SessionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` before leaving `phase`
    pub fn on_exit<F, Fut>(mut self, phase: Phase, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HookError>> + Send + 'static,
    {
        self.on_exit.entry(phase).or_default().push(boxed(hook));
        self
    }

    /// Run `hook` after entering `phase`
    pub fn on_enter<F, Fut>(mut self, phase: Phase, hook: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HookError>> + Send + 'static,
    {
        self.on_enter.entry(phase).or_default().push(boxed(hook));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_exit.values().all(Vec::is_empty) && self.on_enter.values().all(Vec::is_empty)
    }

    /// Run the `on_exit` hooks of `ctx.from`
    pub async fn run_exit(&self, ctx: &HookContext) {
        run_all(self.on_exit.get(&ctx.from), ctx, "exit").await;
    }

    /// Run the `on_enter` hooks of `ctx.to`
    pub async fn run_enter(&self, ctx: &HookContext) {
        run_all(self.on_enter.get(&ctx.to), ctx, "enter").await;
    }
}

fn boxed<F, Fut>(hook: F) -> Hook
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<(), HookError>> + Send + 'static,
{
    Arc::new(move |ctx: HookContext| Box::pin(hook(ctx)) as HookFuture)
}

async fn run_all(hooks: Option<&Vec<Hook>>, ctx: &HookContext, stage: &'static str) {
    for hook in hooks.into_iter().flatten() {
        let hook = Arc::clone(hook);
        let hook_ctx = ctx.clone();
        let outcome = tokio::spawn(async move { hook(hook_ctx).await }).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(
                session_id = %ctx.session_id,
                from = %ctx.from,
                to = %ctx.to,
                stage,
                error = %e,
                "transition hook failed"
            ),
            Err(e) => tracing::warn!(
                session_id = %ctx.session_id,
                from = %ctx.from,
                to = %ctx.to,
                stage,
                panicked = e.is_panic(),
                "transition hook aborted"
            ),
        }
    }
}

/// Note recorded on timeout-driven transitions
pub const OVERDUE_NOTE: &str = "time allocation exhausted";

/// Default minimum time spent in the introduction
pub const DEFAULT_MIN_INTRODUCTION: Duration = Duration::from_secs(30);

/// Applies transitions and progress updates to an [`InterviewSession`]
#[derive(Debug)]
pub struct SessionMachine {
    session: InterviewSession,
    hooks: Arc<SessionHooks>,
    clock: Arc<dyn Clock>,
    min_introduction: Duration,
}

impl SessionMachine {
    /// Resume an existing session
    pub fn new(session: InterviewSession, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            hooks: Arc::new(SessionHooks::default()),
            clock,
            min_introduction: DEFAULT_MIN_INTRODUCTION,
        }
    }

    /// Start a fresh session in the introduction phase
    pub fn start<S: Into<String>>(id: S, config: InterviewConfig, clock: Arc<dyn Clock>) -> Self {
        let session = InterviewSession::new(id, config, clock.now());
        Self::new(session, clock)
    }

    pub fn with_hooks(mut self, hooks: Arc<SessionHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_min_introduction(mut self, min: Duration) -> Self {
        self.min_introduction = min;
        self
    }

    pub fn session(&self) -> &InterviewSession {
        &self.session
    }

    pub fn into_session(self) -> InterviewSession {
        self.session
    }

    pub fn current_state(&self) -> Phase {
        self.session.current_state
    }

    /// True iff `to` is the single successor of the current phase
    pub fn can_transition(&self, to: Phase) -> bool {
        self.session.current_state.next() == Some(to)
    }

    /// Move to `to`; returns `false` and changes nothing if not allowed
    pub async fn transition_to(&mut self, to: Phase, data: Option<TransitionData>) -> bool {
        self.transition_with(to, TransitionTrigger::Manual, data).await
    }

    /// Move to `to`, recording `trigger`
    pub async fn transition_with(
        &mut self,
        to: Phase,
        trigger: TransitionTrigger,
        data: Option<TransitionData>,
    ) -> bool {
        let Some(ctx) = self.plan_transition(to) else {
            tracing::debug!(
                session_id = %self.session.id,
                from = %self.session.current_state,
                %to,
                "transition rejected"
            );
            return false;
        };

        self.hooks.run_exit(&ctx).await;
        match self.apply_transition(to, trigger, data) {
            Some(ctx) => {
                self.hooks.run_enter(&ctx).await;
                true
            }
            None => false,
        }
    }

    /// Context a move to `to` would run its hooks with, `None` if not allowed
    pub fn plan_transition(&self, to: Phase) -> Option<HookContext> {
        if !self.can_transition(to) {
            return None;
        }
        let floor = self
            .session
            .state_history
            .last()
            .map_or(self.session.start_time, |t| t.timestamp);
        Some(HookContext {
            session_id: self.session.id.clone(),
            from: self.session.current_state,
            to,
            at: self.clock.now().max(floor),
        })
    }

    /// Record a move to `to` without running hooks
    ///
    /// Returns the context the `on_enter` hooks of `to` expect, or `None`
    /// when the move is not allowed. Callers that hold the machine behind a
    /// lock use this with [`SessionHooks::run_exit`] and
    /// [`SessionHooks::run_enter`] so hooks run with the lock released.
    pub fn apply_transition(
        &mut self,
        to: Phase,
        trigger: TransitionTrigger,
        data: Option<TransitionData>,
    ) -> Option<HookContext> {
        let ctx = self.plan_transition(to)?;
        let (from, at) = (ctx.from, ctx.at);

        let mut data = data.unwrap_or_default();
        let counters = &self.session.state_data;
        data.questions_completed = data.questions_completed.or(Some(counters.questions_completed));
        data.tasks_completed = data.tasks_completed.or(Some(counters.tasks_completed));

        self.session.state_history.push(StateTransition {
            from_state: from,
            to_state: to,
            timestamp: at,
            trigger,
            data,
        });
        self.session.current_state = to;
        self.session.phase_started_at = at;

        match to {
            Phase::ConceptualQuestions => self.session.state_data.current_question_index = 0,
            Phase::PracticalTasks => self.session.state_data.current_task_index = 0,
            Phase::Conclusion => {
                let elapsed = (at - self.session.start_time).num_milliseconds().max(0);
                self.session.end_time = Some(at);
                self.session.total_duration_ms = Some(elapsed as u64);
            }
            Phase::Introduction | Phase::FeedbackGeneration => {}
        }

        tracing::info!(session_id = %self.session.id, %from, %to, ?trigger, "session transitioned");
        Some(ctx)
    }

    /// Whether the current phase has met its completion rule
    pub fn is_current_state_complete(&self) -> bool {
        let data = &self.session.state_data;
        match self.session.current_state {
            Phase::Introduction => self.time_in_phase() >= self.min_introduction,
            Phase::ConceptualQuestions => {
                data.total_questions > 0 && data.questions_completed >= data.total_questions
            }
            Phase::PracticalTasks => data.total_tasks > 0 && data.tasks_completed >= data.total_tasks,
            Phase::FeedbackGeneration => data.feedback_generated,
            Phase::Conclusion => true,
        }
    }

    /// Advance one phase if the current one is complete
    pub async fn auto_progress(&mut self) -> bool {
        match self.auto_progress_target() {
            Some(next) => {
                self.transition_with(next, TransitionTrigger::AutoProgress, None)
                    .await
            }
            None => false,
        }
    }

    /// Phase [`auto_progress`](Self::auto_progress) would move to
    pub fn auto_progress_target(&self) -> Option<Phase> {
        if !self.is_current_state_complete() {
            return None;
        }
        self.session.current_state.next()
    }

    /// Force the next phase once the time budget through this phase is spent
    pub async fn expire_if_overdue(&mut self) -> bool {
        match self.overdue_target() {
            Some(next) => {
                self.transition_with(
                    next,
                    TransitionTrigger::Timeout,
                    Some(TransitionData::note(OVERDUE_NOTE)),
                )
                .await
            }
            None => false,
        }
    }

    /// Phase [`expire_if_overdue`](Self::expire_if_overdue) would force
    pub fn overdue_target(&self) -> Option<Phase> {
        if !self.time_remaining().is_zero() {
            return None;
        }
        self.session.current_state.next()
    }

    /// Weighted completion in percent
    pub fn progress_percentage(&self) -> f64 {
        let current = self.session.current_state;
        if current.is_terminal() {
            return 100.0;
        }
        let data = &self.session.state_data;
        let prior: f64 = Phase::ALL
            .iter()
            .filter(|p| **p < current)
            .map(|p| p.weight())
            .sum();
        let fraction = match current {
            Phase::Introduction => 0.0,
            Phase::ConceptualQuestions => ratio(data.questions_completed, data.total_questions),
            Phase::PracticalTasks => ratio(data.tasks_completed, data.total_tasks),
            Phase::FeedbackGeneration if data.feedback_generated => 1.0,
            Phase::FeedbackGeneration => 0.0,
            Phase::Conclusion => 1.0,
        };
        (prior + fraction * current.weight()).clamp(0.0, 100.0)
    }

    /// Budget through the end of the current phase minus time since start
    pub fn time_remaining(&self) -> Duration {
        let budget = self
            .session
            .config
            .time_allocation
            .through(self.session.current_state);
        let elapsed = (self.clock.now() - self.session.start_time)
            .to_std()
            .unwrap_or_default();
        budget.saturating_sub(elapsed)
    }

    /// Error unless the session is in `expected`
    pub fn require_phase(&self, expected: Phase) -> Result<()> {
        let actual = self.session.current_state;
        if actual == expected {
            return Ok(());
        }
        if actual.is_terminal() {
            return Err(InterviewError::SessionConcluded(self.session.id.clone()));
        }
        Err(InterviewError::WrongPhase { expected, actual })
    }

    /// Count an answered question and fold its score into the progress
    pub fn record_question_score(&mut self, score: &QuestionScore) -> Result<()> {
        self.require_phase(Phase::ConceptualQuestions)?;
        self.session
            .conceptual_progress
            .record(&score.category, score.score);
        let data = &mut self.session.state_data;
        data.questions_completed += 1;
        data.current_question_index += 1;
        Ok(())
    }

    /// Count a finished task and fold its scores into the progress
    pub fn record_task_result(&mut self, result: &TaskResult) -> Result<()> {
        self.require_phase(Phase::PracticalTasks)?;
        self.session.practical_progress.record(result);
        let data = &mut self.session.state_data;
        data.tasks_completed += 1;
        data.current_task_index += 1;
        Ok(())
    }

    /// Flag the report as produced so the feedback phase can complete
    pub fn mark_feedback_generated(&mut self) -> Result<()> {
        self.require_phase(Phase::FeedbackGeneration)?;
        self.session.state_data.feedback_generated = true;
        Ok(())
    }

    fn time_in_phase(&self) -> Duration {
        (self.clock.now() - self.session.phase_started_at)
            .to_std()
            .unwrap_or_default()
    }
}

fn ratio(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(completed) / f64::from(total)).min(1.0)
}
