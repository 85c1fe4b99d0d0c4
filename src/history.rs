//! Per-goal log collection: one entry per date, kept in date order.

use crate::types::{DailyLog, Goal, Phase};

/// Insert `incoming`, replacing any entry with the same date, and re-sort.
pub fn upsert_log(mut history: Vec<DailyLog>, incoming: DailyLog) -> Vec<DailyLog> {
    match history.iter_mut().find(|log| log.date == incoming.date) {
        Some(existing) => *existing = incoming,
        None => history.push(incoming),
    }
    // ISO keys sort lexicographically in date order
    history.sort_by(|a, b| a.date.cmp(&b.date));
    history
}

/// Fold entries in input order; later entries for a date win.
pub fn merge_all(entries: impl IntoIterator<Item = DailyLog>) -> Vec<DailyLog> {
    entries.into_iter().fold(Vec::new(), upsert_log)
}

/// The furthest-along entry logged for `date`, if any.
pub fn today_log<'a>(goal: Option<&'a Goal>, date: &str) -> Option<&'a DailyLog> {
    goal?
        .history
        .iter()
        .filter(|log| log.date == date)
        .max_by_key(|log| log.phase)
}

/// Which checkpoint the user should fill in next on `date`.
pub fn current_phase(goal: Option<&Goal>, date: &str) -> Phase {
    match today_log(goal, date) {
        Some(log) => log.phase.next(),
        None => Phase::Morning,
    }
}
