//! Goal lifecycle state.
//!
//! `GoalStore` holds at most one active goal plus the archive of finished ones.
//! It is owned by the composition root and handed to the surfaces that need it;
//! persistence happens outside, through [`crate::storage::Storage`].
//!
//! Status transitions:
//!
//! ```text
//! active --complete / auto-complete--> completed
//! active --abandon-------------------> abandoned
//! ```
//!
//! Both end states are terminal.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::date::{DateKey, days_active, normalize_key, today_key};
use crate::error::GoalError;
use crate::history::{current_phase, today_log, upsert_log};
use crate::scoring::{daily_records, goal_completion, progress_to_hours, stability};
use crate::types::{
    DailyLog, DailyLogInput, DailyRecord, Goal, GoalStatus, PersistedSnapshot, Phase, clamp_or,
    normalize_total_days,
};

/// What `add_daily_log` did with its input.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum LogOutcome {
    /// No active goal; nothing changed.
    NoActiveGoal,
    #[serde(rename_all = "camelCase")]
    Recorded { stability_score: f64, completion: f64 },
    /// The log pushed completion to 100% and the goal was archived.
    #[serde(rename_all = "camelCase")]
    AutoCompleted { completion: f64 },
}

/// Derived view of the active goal for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    pub goal: Goal,
    pub days_active: i64,
    pub completion: f64,
    pub stability_score: f64,
    pub today_log: Option<DailyLog>,
    pub current_phase: Phase,
    pub records: Vec<DailyRecord>,
}

#[derive(Debug, Clone)]
pub struct GoalStore {
    active_goal: Option<Goal>,
    archived_goals: Vec<Goal>,
    stability_score: f64,
    has_hydrated: bool,
    config: EngineConfig,
}

impl GoalStore {
    /// An empty store that has not been hydrated from persisted state yet.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            active_goal: None,
            archived_goals: Vec::new(),
            stability_score: 0.0,
            has_hydrated: false,
            config,
        }
    }

    /// Install a migrated snapshot and mark the store ready.
    pub fn hydrate(&mut self, snapshot: PersistedSnapshot) {
        self.active_goal = snapshot.active_goal;
        self.archived_goals = snapshot.archived_goals;
        self.stability_score = snapshot.stability_score;
        self.has_hydrated = true;
        info!(
            active = self.active_goal.is_some(),
            archived = self.archived_goals.len(),
            "goal store hydrated"
        );
    }

    pub fn snapshot(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            active_goal: self.active_goal.clone(),
            archived_goals: self.archived_goals.clone(),
            stability_score: self.stability_score,
            schema_version: crate::metadata::SCHEMA_VERSION,
        }
    }

    pub fn active_goal(&self) -> Option<&Goal> {
        self.active_goal.as_ref()
    }

    pub fn archived_goals(&self) -> &[Goal] {
        &self.archived_goals
    }

    pub fn stability_score(&self) -> f64 {
        self.stability_score
    }

    pub fn has_hydrated(&self) -> bool {
        self.has_hydrated
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn create_goal(
        &mut self,
        title: &str,
        total_days: Option<f64>,
        start_date: Option<DateKey>,
    ) -> Result<Goal, GoalError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(GoalError::EmptyTitle);
        }
        if self.active_goal.is_some() {
            return Err(GoalError::GoalAlreadyActive);
        }

        let goal = Goal {
            id: Ulid::new().to_string(),
            title: title.to_string(),
            start_date: start_date
                .as_deref()
                .and_then(normalize_key)
                .unwrap_or_else(today_key),
            total_days: normalize_total_days(total_days, self.config.default_total_days),
            history: Vec::new(),
            status: GoalStatus::Active,
        };

        info!(goal_id = %goal.id, total_days = goal.total_days, "goal created");
        self.active_goal = Some(goal.clone());
        self.stability_score = 0.0;
        Ok(goal)
    }

    pub fn add_daily_log(&mut self, input: DailyLogInput) -> LogOutcome {
        let Some(goal) = self.active_goal.as_mut() else {
            debug!("daily log ignored: no active goal");
            return LogOutcome::NoActiveGoal;
        };

        let log = input.into_log(today_key());
        debug!(goal_id = %goal.id, date = %log.date, phase = %log.phase, "upserting daily log");
        let history = std::mem::take(&mut goal.history);
        goal.history = upsert_log(history, log);

        self.stability_score = stability(&goal.history);
        let completion = goal_completion(goal, self.config.completion_policy);
        debug!(stability = self.stability_score, completion, "scores recomputed");

        if self.config.auto_complete && completion >= 100.0 {
            info!(goal_id = %goal.id, "completion reached 100%, completing goal");
            self.archive_active(GoalStatus::Completed);
            return LogOutcome::AutoCompleted { completion };
        }

        LogOutcome::Recorded {
            stability_score: self.stability_score,
            completion,
        }
    }

    /// Quick end-of-day entry from a 0-100 progress value, stored as an evening log.
    pub fn settle_day(&mut self, energy: f64, progress: f64) -> LogOutcome {
        self.add_daily_log(DailyLogInput {
            phase: Phase::Evening,
            energy_level: clamp_or(energy, 0.0, 100.0, 0.0),
            base_target: self.config.default_base_target,
            actual_done: progress_to_hours(progress),
            date: None,
        })
    }

    /// Edit the active goal in place. Blank or unusable values keep the current ones.
    /// Returns `false` when there is no active goal.
    pub fn update_goal(&mut self, title: Option<&str>, total_days: Option<f64>) -> bool {
        let Some(goal) = self.active_goal.as_mut() else {
            return false;
        };

        if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
            goal.title = title.to_string();
        }
        if let Some(days) = total_days.filter(|d| d.is_finite() && *d >= 1.0) {
            goal.total_days = normalize_total_days(Some(days), goal.total_days);
        }

        info!(goal_id = %goal.id, title = %goal.title, total_days = goal.total_days, "goal updated");
        true
    }

    pub fn complete_active_goal(&mut self) -> Option<Goal> {
        self.archive_active(GoalStatus::Completed)
    }

    pub fn abandon_active_goal(&mut self) -> Option<Goal> {
        self.archive_active(GoalStatus::Abandoned)
    }

    /// Discard everything, archive included.
    pub fn clear_store(&mut self) {
        self.active_goal = None;
        self.archived_goals.clear();
        self.stability_score = 0.0;
        info!("goal store cleared");
    }

    pub fn completion(&self) -> f64 {
        self.active_goal
            .as_ref()
            .map(|goal| goal_completion(goal, self.config.completion_policy))
            .unwrap_or(0.0)
    }

    pub fn summary(&self, today: &str) -> Option<GoalSummary> {
        let goal = self.active_goal.as_ref()?;
        Some(GoalSummary {
            goal: goal.clone(),
            days_active: days_active(&goal.start_date, today),
            completion: goal_completion(goal, self.config.completion_policy),
            stability_score: self.stability_score,
            today_log: today_log(Some(goal), today).cloned(),
            current_phase: current_phase(Some(goal), today),
            records: daily_records(goal),
        })
    }

    fn archive_active(&mut self, status: GoalStatus) -> Option<Goal> {
        let mut goal = self.active_goal.take()?;
        goal.status = status;
        self.archived_goals.insert(0, goal.clone());
        self.stability_score = 0.0;
        info!(goal_id = %goal.id, status = %status, "goal archived");
        Some(goal)
    }
}

impl Default for GoalStore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::CompletionPolicy;

    fn input(date: &str, energy: f64, done: f64) -> DailyLogInput {
        DailyLogInput {
            phase: Phase::Evening,
            energy_level: energy,
            base_target: 4.0,
            actual_done: done,
            date: Some(date.to_string()),
        }
    }

    #[test]
    fn test_new_store_is_not_hydrated() {
        let mut store = GoalStore::default();
        assert!(!store.has_hydrated());
        store.hydrate(PersistedSnapshot::default());
        assert!(store.has_hydrated());
    }

    #[test]
    fn test_create_goal_rejects_empty_title() {
        let mut store = GoalStore::default();
        assert_eq!(store.create_goal("   ", None, None), Err(GoalError::EmptyTitle));
        assert!(store.active_goal().is_none());
    }

    #[test]
    fn test_create_goal_twice_fails_and_keeps_first() {
        let mut store = GoalStore::default();
        let first = store.create_goal("  Run daily ", Some(30.0), None).unwrap();
        assert_eq!(first.title, "Run daily");
        assert_eq!(first.total_days, 30);
        assert_eq!(first.status, GoalStatus::Active);

        let second = store.create_goal("Write", None, None);
        assert_eq!(second, Err(GoalError::GoalAlreadyActive));
        assert_eq!(store.active_goal(), Some(&first));
    }

    #[test]
    fn test_create_goal_normalizes_days_and_start() {
        let mut store = GoalStore::default();
        let goal = store
            .create_goal("Read", Some(f64::NAN), Some("garbage".into()))
            .unwrap();
        assert_eq!(goal.total_days, 21);
        assert_eq!(goal.start_date, today_key());

        store.clear_store();
        let goal = store
            .create_goal("Read", Some(0.0), Some("2024-01-05".into()))
            .unwrap();
        assert_eq!(goal.total_days, 1);
        assert_eq!(goal.start_date, "2024-01-05");

        store.clear_store();
        let goal = store.create_goal("Read", None, Some("2024-1-5".into())).unwrap();
        assert_eq!(goal.start_date, "2024-01-05");
    }

    #[test]
    fn test_migrated_unpadded_log_merges_with_new_log() {
        let mut store = GoalStore::default();
        store.hydrate(crate::migrate::migrate(serde_json::json!({
            "schemaVersion": 4,
            "activeGoal": {
                "id": "g",
                "title": "Run",
                "startDate": "2024-01-01",
                "totalDays": 21,
                "history": [
                    { "date": "2024-1-5", "phase": "morning", "energyLevel": 40, "baseTarget": 4, "actualDone": 1 }
                ]
            }
        })));

        store.add_daily_log(input("2024-01-05", 80.0, 3.0));
        let history = &store.active_goal().unwrap().history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, "2024-01-05");
        assert_eq!(history[0].energy_level, 80.0);

        store.add_daily_log(input("2024-1-5", 60.0, 2.0));
        assert_eq!(store.active_goal().unwrap().history.len(), 1);
    }

    #[test]
    fn test_add_daily_log_without_goal_is_noop() {
        let mut store = GoalStore::default();
        let outcome = store.add_daily_log(input("2024-01-01", 50.0, 4.0));
        assert_eq!(outcome, LogOutcome::NoActiveGoal);
        assert_eq!(store.stability_score(), 0.0);
    }

    #[test]
    fn test_add_daily_log_upserts_and_scores() {
        let mut store = GoalStore::default();
        store.create_goal("Run", None, Some("2024-01-01".into())).unwrap();

        store.add_daily_log(input("2024-01-01", 90.0, 0.0));
        assert_eq!(store.stability_score(), 6.5);

        let outcome = store.add_daily_log(input("2024-01-01", 100.0, 6.0));
        assert_eq!(
            outcome,
            LogOutcome::Recorded {
                stability_score: 100.0,
                completion: 100.0
            }
        );
        let goal = store.active_goal().unwrap();
        assert_eq!(goal.history.len(), 1);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    #[test]
    fn test_add_daily_log_clamps_input() {
        let mut store = GoalStore::default();
        store.create_goal("Run", None, None).unwrap();
        store.add_daily_log(DailyLogInput {
            phase: Phase::Morning,
            energy_level: 180.0,
            base_target: -1.0,
            actual_done: -2.0,
            date: None,
        });
        let log = &store.active_goal().unwrap().history[0];
        assert_eq!(log.date, today_key());
        assert_eq!(log.energy_level, 100.0);
        assert_eq!(log.base_target, 0.0);
        assert_eq!(log.actual_done, 0.0);
    }

    #[test]
    fn test_auto_complete_when_enabled() {
        let config = EngineConfig {
            auto_complete: true,
            completion_policy: CompletionPolicy::DaysRequired,
            ..EngineConfig::default()
        };
        let mut store = GoalStore::new(config);
        store.create_goal("Sprint", Some(2.0), Some("2024-01-01".into())).unwrap();

        let first = store.add_daily_log(input("2024-01-01", 50.0, 4.0));
        assert!(matches!(first, LogOutcome::Recorded { completion, .. } if completion == 50.0));

        let second = store.add_daily_log(input("2024-01-02", 50.0, 4.0));
        assert_eq!(second, LogOutcome::AutoCompleted { completion: 100.0 });
        assert!(store.active_goal().is_none());
        assert_eq!(store.archived_goals()[0].status, GoalStatus::Completed);
        assert_eq!(store.stability_score(), 0.0);
    }

    #[test]
    fn test_no_auto_complete_by_default() {
        let mut store = GoalStore::default();
        store.create_goal("Sprint", Some(1.0), None).unwrap();
        store.add_daily_log(input("2024-01-01", 50.0, 4.0));
        assert_eq!(store.completion(), 100.0);
        assert!(store.active_goal().is_some());
    }

    #[test]
    fn test_update_goal_falls_back_on_invalid() {
        let mut store = GoalStore::default();
        assert!(!store.update_goal(Some("x"), None));

        store.create_goal("Run", Some(10.0), None).unwrap();
        assert!(store.update_goal(Some("  "), Some(-3.0)));
        let goal = store.active_goal().unwrap();
        assert_eq!(goal.title, "Run");
        assert_eq!(goal.total_days, 10);

        store.update_goal(Some(" Run far "), Some(40.6));
        let goal = store.active_goal().unwrap();
        assert_eq!(goal.title, "Run far");
        assert_eq!(goal.total_days, 40);
    }

    #[test]
    fn test_archive_moves_to_front() {
        let mut store = GoalStore::default();
        store.create_goal("One", None, None).unwrap();
        store.add_daily_log(input("2024-01-01", 50.0, 4.0));
        let done = store.complete_active_goal().unwrap();
        assert_eq!(done.status, GoalStatus::Completed);
        assert_eq!(store.stability_score(), 0.0);

        store.create_goal("Two", None, None).unwrap();
        store.abandon_active_goal();
        let titles: Vec<_> = store.archived_goals().iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Two", "One"]);
        assert_eq!(store.archived_goals()[0].status, GoalStatus::Abandoned);

        assert!(store.complete_active_goal().is_none());
        assert_eq!(store.archived_goals().len(), 2);
    }

    #[test]
    fn test_clear_store_wipes_archive() {
        let mut store = GoalStore::default();
        store.create_goal("One", None, None).unwrap();
        store.abandon_active_goal();
        store.create_goal("Two", None, None).unwrap();
        store.add_daily_log(input("2024-01-01", 90.0, 0.0));
        store.clear_store();
        assert!(store.active_goal().is_none());
        assert!(store.archived_goals().is_empty());
        assert_eq!(store.stability_score(), 0.0);
        assert!(store.create_goal("Three", None, None).is_ok());
    }

    #[test]
    fn test_settle_day_converts_progress_to_hours() {
        let mut store = GoalStore::default();
        store.create_goal("Run", None, None).unwrap();
        store.settle_day(50.0, 75.0);
        let log = &store.active_goal().unwrap().history[0];
        assert_eq!(log.phase, Phase::Evening);
        assert_eq!(log.base_target, 4.0);
        assert_eq!(log.actual_done, 4.5);
    }

    #[test]
    fn test_summary_reports_derived_values() {
        let mut store = GoalStore::default();
        assert!(store.summary("2024-01-03").is_none());
        store.create_goal("Run", None, Some("2024-01-01".into())).unwrap();
        store.add_daily_log(DailyLogInput {
            phase: Phase::Afternoon,
            ..input("2024-01-03", 50.0, 2.0)
        });
        let summary = store.summary("2024-01-03").unwrap();
        assert_eq!(summary.days_active, 3);
        assert_eq!(summary.completion, 50.0);
        assert_eq!(summary.current_phase, Phase::Evening);
        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.records[0].progress, 50.0);
    }
}
