//! Interview configuration and the injectable configuration cache

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::InterviewError;
use crate::session::Phase;

/// Proficiency tier, both a configuration input and an assessment output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 3] = [SkillLevel::Basic, SkillLevel::Intermediate, SkillLevel::Advanced];

    /// Minimum overall score to recommend the next level
    pub fn readiness_threshold(self) -> f64 {
        match self {
            SkillLevel::Basic => 75.0,
            SkillLevel::Intermediate => 80.0,
            SkillLevel::Advanced => 85.0,
        }
    }

    /// The level one step up; advanced stays advanced
    pub fn next(self) -> SkillLevel {
        match self {
            SkillLevel::Basic => SkillLevel::Intermediate,
            SkillLevel::Intermediate | SkillLevel::Advanced => SkillLevel::Advanced,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Basic => "basic",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = InterviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkillLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InterviewError::InvalidSkillLevel(s.to_string()))
    }
}

/// Minutes budgeted for each phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeAllocation {
    pub introduction: u32,
    pub conceptual_questions: u32,
    pub practical_tasks: u32,
    pub feedback_generation: u32,
    pub conclusion: u32,
}

impl Default for TimeAllocation {
    fn default() -> Self {
        Self {
            introduction: 2,
            conceptual_questions: 15,
            practical_tasks: 30,
            feedback_generation: 5,
            conclusion: 2,
        }
    }
}

impl TimeAllocation {
    /// Minutes budgeted for one phase
    pub fn minutes(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Introduction => self.introduction,
            Phase::ConceptualQuestions => self.conceptual_questions,
            Phase::PracticalTasks => self.practical_tasks,
            Phase::FeedbackGeneration => self.feedback_generation,
            Phase::Conclusion => self.conclusion,
        }
    }

    /// Budget for one phase
    pub fn for_phase(&self, phase: Phase) -> Duration {
        Duration::from_secs(u64::from(self.minutes(phase)) * 60)
    }

    /// Budget from session start through the end of `phase`
    pub fn through(&self, phase: Phase) -> Duration {
        Phase::ALL
            .iter()
            .take_while(|p| **p <= phase)
            .map(|p| self.for_phase(*p))
            .sum()
    }

    /// Budget for the whole session
    pub fn total(&self) -> Duration {
        self.through(Phase::Conclusion)
    }
}

/// Settings for one interview session
///
/// Values are validated by the caller; the core assumes they are sane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub skill_level: SkillLevel,
    pub question_count: u32,
    pub task_count: u32,
    pub time_allocation: TimeAllocation,
    /// Business scenarios the tasks are drawn from, e.g. `retail`, `finance`
    pub scenario_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_email: Option<String>,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            skill_level: SkillLevel::Intermediate,
            question_count: 5,
            task_count: 3,
            time_allocation: TimeAllocation::default(),
            scenario_tags: Vec::new(),
            candidate_email: None,
        }
    }
}

impl InterviewConfig {
    pub fn new(skill_level: SkillLevel) -> Self {
        Self {
            skill_level,
            ..Self::default()
        }
    }

    pub fn with_questions(mut self, count: u32) -> Self {
        self.question_count = count;
        self
    }

    pub fn with_tasks(mut self, count: u32) -> Self {
        self.task_count = count;
        self
    }

    pub fn with_time_allocation(mut self, allocation: TimeAllocation) -> Self {
        self.time_allocation = allocation;
        self
    }

    pub fn with_scenario_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.scenario_tags.push(tag.into());
        self
    }

    pub fn with_candidate_email<S: Into<String>>(mut self, email: S) -> Self {
        self.candidate_email = Some(email.into());
        self
    }
}

/// A cache whose entries expire after a fixed time-to-live
///
/// Owned by whoever needs it and passed explicitly; there is no process-wide
/// instance. Expired entries are dropped lazily on access.
#[derive(Debug)]
pub struct ConfigCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, (V, DateTime<Utc>)>>,
}

impl<K, V> ConfigCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache using the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let (value, stored_at) = entries.get(key)?;
        if self.expired_at(*stored_at, now) {
            entries.remove(key);
            return None;
        }
        Some(value.clone())
    }

    /// Store a value, replacing any previous one
    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        self.lock().insert(key, (value, now));
    }

    /// Fresh value for `key`, loading and caching it on a miss
    pub fn get_or_try_insert_with<E, F>(&self, key: &K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = load()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// True when `key` is absent or stale
    pub fn is_expired(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.lock()
            .get(key)
            .map_or(true, |(_, stored_at)| self.expired_at(*stored_at, now))
    }

    /// Drop one entry; returns whether it was present
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired_at(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let age = (now - stored_at).to_std().unwrap_or_default();
        age >= self.ttl
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, (V, DateTime<Utc>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_skill_level_ladder() {
        assert_eq!(SkillLevel::Basic.next(), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::Advanced.next(), SkillLevel::Advanced);
        assert_eq!(SkillLevel::Intermediate.readiness_threshold(), 80.0);
        assert_eq!("Advanced".parse::<SkillLevel>().unwrap(), SkillLevel::Advanced);
        assert!("expert".parse::<SkillLevel>().is_err());
    }

    #[test]
    fn test_time_allocation_cumulative() {
        let alloc = TimeAllocation::default();
        assert_eq!(alloc.through(Phase::Introduction), Duration::from_secs(120));
        assert_eq!(alloc.through(Phase::ConceptualQuestions), Duration::from_secs(17 * 60));
        assert_eq!(alloc.total(), Duration::from_secs(54 * 60));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: InterviewConfig =
            serde_json::from_str(r#"{"skill_level":"basic","task_count":2}"#).unwrap();
        assert_eq!(config.skill_level, SkillLevel::Basic);
        assert_eq!(config.task_count, 2);
        assert_eq!(config.question_count, 5);
        assert_eq!(config.time_allocation, TimeAllocation::default());
    }

    #[test]
    fn test_cache_expiry_and_invalidation() {
        let clock = ManualClock::default();
        let cache = ConfigCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));

        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert!(!cache.is_expired(&"a"));

        clock.advance(Duration::from_secs(60));
        assert!(cache.is_expired(&"a"));
        assert_eq!(cache.get(&"a"), None);
        assert!(cache.is_empty());

        cache.insert("b", 2);
        assert!(cache.invalidate(&"b"));
        assert!(!cache.invalidate(&"b"));

        cache.insert("c", 3);
        cache.invalidate_all();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_loads_once() {
        let cache: ConfigCache<String, u32> = ConfigCache::new(Duration::from_secs(300));
        let mut loads = 0;
        for _ in 0..3 {
            let value = cache
                .get_or_try_insert_with(&"task".to_string(), || {
                    loads += 1;
                    Ok::<_, String>(7)
                })
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(loads, 1);

        let err = cache.get_or_try_insert_with(&"missing".to_string(), || Err("nope".to_string()));
        assert_eq!(err, Err("nope".to_string()));
        assert!(cache.is_expired(&"missing".to_string()));
    }
}
