use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::date::{DateKey, parse_key, to_key};

pub const DEFAULT_TOTAL_DAYS: u32 = 21;
pub const DEFAULT_BASE_TARGET: f64 = 4.0;
pub const UNTITLED_GOAL: &str = "Untitled Goal";

/// Checkpoint within a day's logging flow, in the order they are reached.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Morning,
    Afternoon,
    Evening,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Morning => "morning",
            Phase::Afternoon => "afternoon",
            Phase::Evening => "evening",
            Phase::Completed => "completed",
        }
    }

    /// The checkpoint that follows this one. `Completed` is terminal.
    pub fn next(self) -> Phase {
        match self {
            Phase::Morning => Phase::Afternoon,
            Phase::Afternoon => Phase::Evening,
            Phase::Evening | Phase::Completed => Phase::Completed,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(Phase::Morning),
            "afternoon" => Ok(Phase::Afternoon),
            "evening" => Ok(Phase::Evening),
            "completed" => Ok(Phase::Completed),
            _ => Err(format!("Unknown phase: {s}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Abandoned => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GoalStatus::Active)
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "abandoned" => Ok(GoalStatus::Abandoned),
            _ => Err(format!("Unknown goal status: {s}")),
        }
    }
}

/// One calibration record for one calendar day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub date: DateKey,
    pub phase: Phase,
    pub energy_level: f64,
    pub base_target: f64,
    pub actual_done: f64,
}

/// Log entry as submitted by a caller; `date` defaults to today.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogInput {
    pub phase: Phase,
    pub energy_level: f64,
    pub base_target: f64,
    pub actual_done: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateKey>,
}

impl DailyLogInput {
    /// Clamp every numeric field into the range a stored log may hold. A missing
    /// or malformed date becomes `today`.
    pub fn into_log(self, today: DateKey) -> DailyLog {
        DailyLog {
            date: self
                .date
                .as_deref()
                .and_then(parse_key)
                .map(to_key)
                .unwrap_or(today),
            phase: self.phase,
            energy_level: clamp_or(self.energy_level, 0.0, 100.0, 0.0),
            base_target: floor_or(self.base_target, 0.0),
            actual_done: floor_or(self.actual_done, 0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub start_date: DateKey,
    pub total_days: u32,
    pub history: Vec<DailyLog>,
    pub status: GoalStatus,
}

/// Compact per-day view for charts: energy next to clamped progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DailyRecord {
    pub date: DateKey,
    pub energy: f64,
    pub progress: f64,
}

/// Durable representation of the whole store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    pub active_goal: Option<Goal>,
    pub archived_goals: Vec<Goal>,
    pub stability_score: f64,
    pub schema_version: u32,
}

impl Default for PersistedSnapshot {
    fn default() -> Self {
        Self {
            active_goal: None,
            archived_goals: Vec::new(),
            stability_score: 0.0,
            schema_version: crate::metadata::SCHEMA_VERSION,
        }
    }
}

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Clamp a possibly non-finite value, substituting `fallback` for NaN/infinity.
pub fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        clamp(value, min, max)
    } else {
        fallback
    }
}

/// Floor a possibly non-finite value at `min`; NaN/infinity become `min`.
pub fn floor_or(value: f64, min: f64) -> f64 {
    if value.is_finite() { value.max(min) } else { min }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Positive whole-day duration; anything unusable becomes the default.
pub fn normalize_total_days(value: Option<f64>, default: u32) -> u32 {
    match value {
        Some(v) if v.is_finite() => v.floor().clamp(1.0, u32::MAX as f64) as u32,
        _ => default.max(1),
    }
}
