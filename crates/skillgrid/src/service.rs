//! Session API used by the interview front end
//!
//! [`InterviewService`] keeps one [`SessionMachine`] per live session behind
//! an async mutex, so operations on a session are applied one at a time while
//! different sessions proceed independently. Every accepted change is written
//! through to the [`KeyValueStore`] under these keys:
//!
//! | key | value |
//! |-----|-------|
//! | `session/{id}` | session record |
//! | `results/{id}` | list of task results |
//! | `actions/{id}/{task}` | list of edit events |
//! | `answers/{id}` | list of conceptual answer scores |
//! | `report/{id}` | latest analytics report |
//! | `tasks/{task}` | task definition |
//! | `respondents` | emails that started an assessment |

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skillgrid_core::SpreadsheetSnapshot;
use skillgrid_interview::{
    AnalyticsReport, Clock, ConceptualQuestion, ConceptualScorer, ConfigCache, EligibilityPolicy,
    InterviewConfig, InterviewSession, Phase, PracticalTask, QuestionScore, ReportGenerator,
    RetryPolicy, SessionHooks, SessionMachine, SubmissionTrigger, SystemClock, TaskEvaluator,
    TaskResult, TextEvaluator, TransitionData, TransitionTrigger, UserAction, OVERDUE_NOTE,
};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{Result, ServiceError};
use crate::store::{KeyValueStore, KeyValueStoreExt};

/// How long task definitions stay cached
pub const DEFAULT_TASK_TTL: Duration = Duration::from_secs(300);

const RESPONDENTS_KEY: &str = "respondents";

fn session_key(id: &str) -> String {
    format!("session/{id}")
}

fn results_key(id: &str) -> String {
    format!("results/{id}")
}

fn actions_key(id: &str, task_id: &str) -> String {
    format!("actions/{id}/{task_id}")
}

fn answers_key(id: &str) -> String {
    format!("answers/{id}")
}

fn report_key(id: &str) -> String {
    format!("report/{id}")
}

fn task_key(task_id: &str) -> String {
    format!("tasks/{task_id}")
}

/// What is written to `session/{id}`
#[derive(Serialize)]
struct SessionRecordRef<'a> {
    session: &'a InterviewSession,
    started_tasks: &'a BTreeMap<String, DateTime<Utc>>,
}

#[derive(Deserialize)]
struct SessionRecord {
    session: InterviewSession,
    #[serde(default)]
    started_tasks: BTreeMap<String, DateTime<Utc>>,
}

/// In-memory state of one live session
#[derive(Debug)]
struct SessionSlot {
    machine: SessionMachine,
    /// Task id to the instant it was started
    started_tasks: BTreeMap<String, DateTime<Utc>>,
    /// Finalized results in submission order
    results: Vec<TaskResult>,
}

impl SessionSlot {
    fn id(&self) -> &str {
        &self.machine.session().id
    }

    fn result(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.task_id == task_id)
    }
}

/// Orchestrates interview sessions over a store and a text evaluator
pub struct InterviewService<S, E> {
    store: S,
    scorer: ConceptualScorer<Arc<E>>,
    reports: ReportGenerator<Arc<E>>,
    evaluator: Arc<E>,
    clock: Arc<dyn Clock>,
    hooks: Arc<SessionHooks>,
    task_evaluator: TaskEvaluator,
    eligibility: EligibilityPolicy,
    tasks: ConfigCache<String, PracticalTask>,
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<SessionSlot>>>>,
    next_id: AtomicU64,
}

impl<S, E> InterviewService<S, E>
where
    S: KeyValueStore,
    E: TextEvaluator,
{
    pub fn new(store: S, evaluator: E) -> Self {
        let evaluator = Arc::new(evaluator);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            store,
            scorer: ConceptualScorer::new(Arc::clone(&evaluator)),
            reports: ReportGenerator::new(Arc::clone(&evaluator)),
            evaluator,
            tasks: ConfigCache::with_clock(DEFAULT_TASK_TTL, Arc::clone(&clock)),
            clock,
            hooks: Arc::new(SessionHooks::default()),
            task_evaluator: TaskEvaluator::default(),
            eligibility: EligibilityPolicy::default(),
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.tasks = ConfigCache::with_clock(self.tasks.ttl(), Arc::clone(&clock));
        self.clock = clock;
        self
    }

    /// Hooks run on every session's transitions
    ///
    /// The service runs them with the session unlocked, so a hook may call
    /// back into the service for the same session.
    pub fn with_hooks(mut self, hooks: SessionHooks) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.scorer = ConceptualScorer::new(Arc::clone(&self.evaluator)).with_policy(policy.clone());
        self.reports = ReportGenerator::new(Arc::clone(&self.evaluator)).with_policy(policy);
        self
    }

    pub fn with_task_evaluator(mut self, evaluator: TaskEvaluator) -> Self {
        self.task_evaluator = evaluator;
        self
    }

    pub fn with_eligibility(mut self, policy: EligibilityPolicy) -> Self {
        self.eligibility = policy;
        self
    }

    pub fn with_task_ttl(mut self, ttl: Duration) -> Self {
        self.tasks = ConfigCache::with_clock(ttl, Arc::clone(&self.clock));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Save a task definition and make it available to sessions
    pub fn register_task(&self, task: PracticalTask) -> Result<()> {
        self.store.put_json(&task_key(&task.id), &task)?;
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Task definition, from cache or store
    pub fn task(&self, task_id: &str) -> Result<PracticalTask> {
        self.tasks.get_or_try_insert_with(&task_id.to_string(), || {
            self.store
                .get_json::<PracticalTask>(&task_key(task_id))?
                .ok_or_else(|| ServiceError::UnknownTask(task_id.to_string()))
        })
    }

    /// Open a new session in the introduction phase
    ///
    /// When the config names a candidate email, the eligibility policy is
    /// checked and the email is recorded as a respondent.
    pub fn create_session(&self, config: InterviewConfig) -> Result<InterviewSession> {
        if let Some(email) = &config.candidate_email {
            let responded: Vec<String> = self.store.list_json(RESPONDENTS_KEY)?;
            self.eligibility
                .ensure_eligible(email, responded.iter().map(String::as_str))?;
            self.store
                .append_json(RESPONDENTS_KEY, &email.trim().to_lowercase())?;
        }

        let id = self.fresh_id()?;
        let machine = SessionMachine::start(id.clone(), config, Arc::clone(&self.clock));
        let slot = SessionSlot {
            machine,
            started_tasks: BTreeMap::new(),
            results: Vec::new(),
        };
        self.persist(&slot)?;
        let session = slot.machine.session().clone();

        self.lock_sessions()
            .insert(id.clone(), Arc::new(AsyncMutex::new(slot)));
        tracing::info!(session_id = %id, skill_level = %session.config.skill_level, "session created");
        Ok(session)
    }

    /// Current session record, reloading it from the store if needed
    pub async fn get_session(&self, id: &str) -> Result<InterviewSession> {
        let slot = self.slot(id)?;
        let slot = slot.lock().await;
        Ok(slot.machine.session().clone())
    }

    /// Results finalized so far, in submission order
    pub async fn task_results(&self, id: &str) -> Result<Vec<TaskResult>> {
        let slot = self.slot(id)?;
        let slot = slot.lock().await;
        Ok(slot.results.clone())
    }

    /// Attempt a move to `to`; `false` when the move is not allowed
    pub async fn transition(&self, id: &str, to: Phase) -> Result<bool> {
        self.move_session(id, |_| Some((to, TransitionTrigger::Manual, None)))
            .await
    }

    /// Advance when the current phase is complete
    pub async fn auto_progress(&self, id: &str) -> Result<bool> {
        self.move_session(id, |machine| {
            machine
                .auto_progress_target()
                .map(|next| (next, TransitionTrigger::AutoProgress, None))
        })
        .await
    }

    /// Force the next phase when the session has run out of time
    pub async fn expire_if_overdue(&self, id: &str) -> Result<bool> {
        self.move_session(id, |machine| {
            machine.overdue_target().map(|next| {
                (
                    next,
                    TransitionTrigger::Timeout,
                    Some(TransitionData::note(OVERDUE_NOTE)),
                )
            })
        })
        .await
    }

    /// Score an answer and count it toward the conceptual phase
    pub async fn answer_question(
        &self,
        id: &str,
        question: &ConceptualQuestion,
        transcript: &str,
    ) -> Result<QuestionScore> {
        let slot = self.slot(id)?;
        let mut slot = slot.lock().await;
        slot.machine.require_phase(Phase::ConceptualQuestions)?;

        let skill_level = slot.machine.session().config.skill_level;
        let score = self.scorer.score(question, transcript, skill_level).await;
        slot.machine.record_question_score(&score)?;

        self.store.append_json(&answers_key(id), &score)?;
        self.persist(&slot)?;
        Ok(score)
    }

    /// Begin a practical task; starting it again keeps the first start time
    pub async fn start_task(&self, id: &str, task_id: &str) -> Result<PracticalTask> {
        let slot = self.slot(id)?;
        let mut slot = slot.lock().await;
        slot.machine.require_phase(Phase::PracticalTasks)?;
        let task = self.task(task_id)?;

        let now = self.clock.now();
        slot.started_tasks.entry(task_id.to_string()).or_insert(now);
        self.persist(&slot)?;
        Ok(task)
    }

    /// Log an edit event for a started task; returns the log length
    pub async fn record_action(&self, id: &str, task_id: &str, action: UserAction) -> Result<usize> {
        let slot = self.slot(id)?;
        let slot = slot.lock().await;
        if !slot.started_tasks.contains_key(task_id) {
            return Err(ServiceError::TaskNotStarted {
                session_id: id.to_string(),
                task_id: task_id.to_string(),
            });
        }
        Ok(self.store.append_json(&actions_key(id, task_id), &action)?)
    }

    /// Score the final grid of a task
    ///
    /// Only the first submission per task is scored. Later ones, such as a
    /// timer firing after the candidate already pressed "complete", get the
    /// existing result back unchanged.
    pub async fn submit_task(
        &self,
        id: &str,
        task_id: &str,
        final_snapshot: &SpreadsheetSnapshot,
        trigger: SubmissionTrigger,
    ) -> Result<TaskResult> {
        let slot = self.slot(id)?;
        let mut slot = slot.lock().await;

        if let Some(existing) = slot.result(task_id) {
            tracing::debug!(
                session_id = %id,
                task_id,
                ?trigger,
                "task already submitted; ignoring duplicate"
            );
            return Ok(existing.clone());
        }

        slot.machine.require_phase(Phase::PracticalTasks)?;
        let started_at = *slot.started_tasks.get(task_id).ok_or_else(|| {
            ServiceError::TaskNotStarted {
                session_id: id.to_string(),
                task_id: task_id.to_string(),
            }
        })?;
        let task = self.task(task_id)?;
        let actions: Vec<UserAction> = self.store.list_json(&actions_key(id, task_id))?;
        let elapsed_ms = (self.clock.now() - started_at).num_milliseconds().max(0) as u64;

        let result =
            self.task_evaluator
                .evaluate_task(&task, final_snapshot, &actions, elapsed_ms, trigger);
        slot.machine.record_task_result(&result)?;
        self.store.append_json(&results_key(id), &result)?;
        slot.results.push(result.clone());
        self.persist(&slot)?;

        tracing::info!(
            session_id = %id,
            task_id,
            accuracy = result.accuracy_score,
            ?trigger,
            "task submitted"
        );
        Ok(result)
    }

    /// Build the analytics report
    ///
    /// In the feedback phase this also marks feedback as generated, which
    /// lets the session move on to its conclusion.
    pub async fn get_report(&self, id: &str) -> Result<AnalyticsReport> {
        let slot = self.slot(id)?;
        let mut slot = slot.lock().await;

        let session = slot.machine.session();
        let duration_ms = session.total_duration_ms.unwrap_or_else(|| {
            (self.clock.now() - session.start_time)
                .num_milliseconds()
                .max(0) as u64
        });
        let report = self
            .reports
            .generate(
                session.config.skill_level,
                &session.conceptual_progress,
                &session.practical_progress,
                &slot.results,
                duration_ms,
            )
            .await;

        if slot.machine.current_state() == Phase::FeedbackGeneration {
            slot.machine.mark_feedback_generated()?;
            self.persist(&slot)?;
        }
        self.store.put_json(&report_key(id), &report)?;
        Ok(report)
    }

    /// Apply the move chosen by `plan`, running hooks with the session unlocked
    ///
    /// Hooks may call back into the service for the same session. If another
    /// move lands while the exit hooks run, this one is dropped.
    async fn move_session<F>(&self, id: &str, plan: F) -> Result<bool>
    where
        F: FnOnce(&SessionMachine) -> Option<(Phase, TransitionTrigger, Option<TransitionData>)>,
    {
        let slot = self.slot(id)?;

        let planned = {
            let slot = slot.lock().await;
            plan(&slot.machine).and_then(|(to, trigger, data)| {
                slot.machine
                    .plan_transition(to)
                    .map(|ctx| (ctx, trigger, data))
            })
        };
        let Some((exit_ctx, trigger, data)) = planned else {
            tracing::debug!(session_id = %id, "no transition applied");
            return Ok(false);
        };

        self.hooks.run_exit(&exit_ctx).await;

        let enter_ctx = {
            let mut slot = slot.lock().await;
            let Some(ctx) = slot.machine.apply_transition(exit_ctx.to, trigger, data) else {
                return Ok(false);
            };
            self.persist(&slot)?;
            ctx
        };

        self.hooks.run_enter(&enter_ctx).await;
        Ok(true)
    }

    fn slot(&self, id: &str) -> Result<Arc<AsyncMutex<SessionSlot>>> {
        if let Some(slot) = self.lock_sessions().get(id) {
            return Ok(Arc::clone(slot));
        }

        let record: SessionRecord = self
            .store
            .get_json(&session_key(id))?
            .ok_or_else(|| ServiceError::UnknownSession(id.to_string()))?;
        let results: Vec<TaskResult> = self.store.list_json(&results_key(id))?;
        let machine = SessionMachine::new(record.session, Arc::clone(&self.clock));
        let loaded = SessionSlot {
            machine,
            started_tasks: record.started_tasks,
            results,
        };
        tracing::debug!(session_id = %id, "session reloaded from store");

        let mut sessions = self.lock_sessions();
        let slot = sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(loaded)));
        Ok(Arc::clone(slot))
    }

    fn persist(&self, slot: &SessionSlot) -> Result<()> {
        let record = SessionRecordRef {
            session: slot.machine.session(),
            started_tasks: &slot.started_tasks,
        };
        self.store.put_json(&session_key(slot.id()), &record)?;
        Ok(())
    }

    fn fresh_id(&self) -> Result<String> {
        let stamp = self.clock.now().format("%Y%m%d%H%M%S");
        loop {
            let n = self.next_id.fetch_add(1, Ordering::Relaxed);
            let id = format!("{stamp}-{n:04}");
            if self.store.get(&session_key(&id))?.is_none() {
                return Ok(id);
            }
        }
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<SessionSlot>>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
