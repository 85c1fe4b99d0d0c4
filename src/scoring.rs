//! Derived metrics. Everything here is pure and total.
//!
//! The stability constants are part of the score's identity: persisted scores
//! from earlier sessions must stay comparable with freshly computed ones.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::date::days_between;
use crate::types::{DailyLog, DailyRecord, Goal, clamp, clamp_or, floor_or, round2};

/// Smallest target used as a divisor.
const MIN_BASE_TARGET: f64 = 0.0001;

pub const STABILITY_WINDOW: usize = 7;
const RECENT_DAYS: i64 = 2;
const RECENT_WEIGHT: f64 = 2.0;
const OLDER_WEIGHT: f64 = 1.0;

const COMPLETION_WEIGHT: f64 = 0.45;
const ENERGY_WEIGHT: f64 = 0.20;
const ALIGNMENT_WEIGHT: f64 = 0.35;

const HOLLOW_ENTHUSIASM_LEAD: f64 = 40.0;
const HOLLOW_ENTHUSIASM_PENALTY: f64 = 15.0;
const QUIET_RESILIENCE_LEAD: f64 = 20.0;
const QUIET_RESILIENCE_BONUS: f64 = 5.0;

/// Output credited as a full day when converting a 0-100 progress value to hours.
pub const MAX_PROGRESS_HOURS: f64 = 6.0;

/// How a goal's history is aggregated into one completion percentage.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionPolicy {
    /// Mean of the clamped daily progress over logged days.
    #[default]
    Average,
    /// Day-equivalents completed divided by the goal's required days.
    DaysRequired,
}

/// Energy-adjusted daily progress in percent. Not capped at 100.
///
/// The effective target scales from 50% of `base_target` at zero energy to
/// 150% at full energy.
pub fn progress(energy_level: f64, actual_done: f64, base_target: f64) -> f64 {
    let energy = clamp_or(energy_level, 0.0, 100.0, 0.0);
    let done = floor_or(actual_done, 0.0);
    let base = floor_or(base_target, MIN_BASE_TARGET);

    let adjusted_target = base * (energy / 100.0 + 0.5);
    round2(done / adjusted_target * 100.0)
}

pub fn log_progress(log: &DailyLog) -> f64 {
    progress(log.energy_level, log.actual_done, log.base_target)
}

/// Daily progress clamped into [0,100].
pub fn clamped_progress(log: &DailyLog) -> f64 {
    clamp(log_progress(log), 0.0, 100.0)
}

pub fn goal_completion(goal: &Goal, policy: CompletionPolicy) -> f64 {
    if goal.history.is_empty() {
        return 0.0;
    }

    let total: f64 = goal.history.iter().map(clamped_progress).sum();
    let completion = match policy {
        CompletionPolicy::Average => total / goal.history.len() as f64,
        CompletionPolicy::DaysRequired => {
            let days = f64::from(goal.total_days.max(1));
            (total / 100.0) / days * 100.0
        }
    };

    round2(clamp(completion, 0.0, 100.0))
}

/// Weighted consistency score over the most recent seven logs.
pub fn stability(history: &[DailyLog]) -> f64 {
    let window = &history[history.len().saturating_sub(STABILITY_WINDOW)..];
    let Some(latest) = window.last() else {
        return 0.0;
    };

    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for log in window {
        let weight = match days_between(&log.date, &latest.date) {
            Some(days) if days <= RECENT_DAYS => RECENT_WEIGHT,
            _ => OLDER_WEIGHT,
        };
        weighted_sum += sample_score(log) * weight;
        weight_sum += weight;
    }

    if weight_sum == 0.0 {
        return 0.0;
    }

    round2(clamp(weighted_sum / weight_sum, 0.0, 100.0))
}

fn sample_score(log: &DailyLog) -> f64 {
    let energy = clamp_or(log.energy_level, 0.0, 100.0, 0.0);
    let completion = clamped_progress(log);
    let alignment = 100.0 - (energy - completion).abs();

    let mut score =
        completion * COMPLETION_WEIGHT + energy * ENERGY_WEIGHT + alignment * ALIGNMENT_WEIGHT;

    // high energy with little output
    if energy - completion > HOLLOW_ENTHUSIASM_LEAD {
        score -= HOLLOW_ENTHUSIASM_PENALTY;
    }
    // output beyond stated energy
    if completion - energy > QUIET_RESILIENCE_LEAD {
        score += QUIET_RESILIENCE_BONUS;
    }

    score
}

pub fn daily_record(log: &DailyLog) -> DailyRecord {
    DailyRecord {
        date: log.date.clone(),
        energy: clamp_or(log.energy_level, 0.0, 100.0, 0.0),
        progress: round2(clamped_progress(log)),
    }
}

/// Chart series for a goal, one record per logged day in date order.
pub fn daily_records(goal: &Goal) -> Vec<DailyRecord> {
    goal.history.iter().map(daily_record).collect()
}

/// Hours credited for a 0-100 progress value.
pub fn progress_to_hours(progress: f64) -> f64 {
    round2(clamp_or(progress, 0.0, 100.0, 0.0) / 100.0 * MAX_PROGRESS_HOURS)
}
