//! Normalization of persisted state written by any earlier release.
//!
//! Input is whatever JSON was found on disk. It is first classified into a
//! [`PersistedShape`], then each shape is parsed field by field into the current
//! [`PersistedSnapshot`]. Parsing never fails: unusable fields fall back to
//! defaults, unusable log entries are dropped.

use serde_json::{Map, Value};
use tracing::{debug, warn};
use ulid::Ulid;

use crate::date::{normalize_key, today_key};
use crate::history::merge_all;
use crate::metadata::SCHEMA_VERSION;
use crate::scoring::stability;
use crate::types::{
    DEFAULT_TOTAL_DAYS, DailyLog, Goal, GoalStatus, PersistedSnapshot, Phase, UNTITLED_GOAL,
    clamp, normalize_total_days,
};

type Object = Map<String, Value>;

/// Known layouts of the persisted store.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistedShape {
    /// Not an object at all; treated as an empty store.
    Unrecognized,
    /// Releases before the current schema. Durations were stored as
    /// `daysRequired`, and a derived `records` array was persisted alongside.
    Legacy { version: u32, state: Object },
    /// The current layout.
    Current(Object),
}

impl PersistedShape {
    /// Classify a raw blob. Accepts both a bare snapshot carrying `schemaVersion`
    /// and the older `{ "state": {...}, "version": n }` envelope.
    pub fn detect(raw: Value) -> Self {
        let Value::Object(mut object) = raw else {
            return PersistedShape::Unrecognized;
        };

        let (version, state) = match object.remove("state") {
            Some(Value::Object(state)) if object.contains_key("version") => {
                (version_of(object.get("version")), state)
            }
            Some(other) => {
                object.insert("state".to_string(), other);
                (version_of(object.get("schemaVersion")), object)
            }
            None => (version_of(object.get("schemaVersion")), object),
        };

        match version {
            Some(v) if v >= SCHEMA_VERSION => PersistedShape::Current(state),
            Some(v) => PersistedShape::Legacy { version: v, state },
            None => PersistedShape::Legacy { version: 0, state },
        }
    }

    pub fn version(&self) -> Option<u32> {
        match self {
            PersistedShape::Unrecognized => None,
            PersistedShape::Legacy { version, .. } => Some(*version),
            PersistedShape::Current(_) => Some(SCHEMA_VERSION),
        }
    }

    pub fn into_snapshot(self) -> PersistedSnapshot {
        match self {
            PersistedShape::Unrecognized => {
                warn!("persisted state is not an object; starting empty");
                PersistedSnapshot::default()
            }
            PersistedShape::Legacy { version, state } => {
                debug!(version, "migrating legacy persisted state");
                if state.contains_key("records") {
                    debug!("dropping persisted records; they are derived from history now");
                }
                parse_state(&state, LEGACY_DURATION_KEYS)
            }
            PersistedShape::Current(state) => parse_state(&state, CURRENT_DURATION_KEYS),
        }
    }
}

// `totalDays` wins whenever both are present, in every layout.
const CURRENT_DURATION_KEYS: &[&str] = &["totalDays", "daysRequired"];
const LEGACY_DURATION_KEYS: &[&str] = CURRENT_DURATION_KEYS;

/// Normalize any persisted blob into the current snapshot.
pub fn migrate(raw: Value) -> PersistedSnapshot {
    PersistedShape::detect(raw).into_snapshot()
}

fn version_of(value: Option<&Value>) -> Option<u32> {
    let v = number(value?)?;
    (v >= 0.0 && v <= u32::MAX as f64).then(|| v.floor() as u32)
}

fn parse_state(state: &Object, duration_keys: &[&str]) -> PersistedSnapshot {
    let active_goal = state
        .get("activeGoal")
        .and_then(|raw| parse_goal(raw, duration_keys));

    let archived_goals = match state.get("archivedGoals") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|raw| parse_goal(raw, duration_keys))
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            warn!("archivedGoals is not a list; discarding it");
            Vec::new()
        }
    };

    let stability_score = match state.get("stabilityScore").and_then(number) {
        Some(score) => clamp(score, 0.0, 100.0),
        None => {
            let history = active_goal.as_ref().map(|g| g.history.as_slice()).unwrap_or(&[]);
            stability(history)
        }
    };

    PersistedSnapshot {
        active_goal,
        archived_goals,
        stability_score,
        schema_version: SCHEMA_VERSION,
    }
}

fn parse_goal(raw: &Value, duration_keys: &[&str]) -> Option<Goal> {
    let object = raw.as_object()?;

    let id = match non_blank(object.get("id")) {
        Some(id) => id.to_string(),
        None => {
            let id = Ulid::new().to_string();
            warn!(%id, "persisted goal has no usable id; assigned a new one");
            id
        }
    };

    let title = non_blank(object.get("title"))
        .map(str::trim)
        .unwrap_or(UNTITLED_GOAL)
        .to_string();

    let start_date = match object
        .get("startDate")
        .and_then(Value::as_str)
        .and_then(normalize_key)
    {
        Some(date) => date,
        None => {
            warn!(goal_id = %id, "persisted goal has no usable startDate; using today");
            today_key()
        }
    };

    let duration = duration_keys
        .iter()
        .find_map(|key| object.get(*key).filter(|v| !v.is_null()))
        .map(|v| number(v).unwrap_or(f64::NAN));
    let total_days = normalize_total_days(duration, DEFAULT_TOTAL_DAYS);

    let history = match object.get("history") {
        Some(Value::Array(items)) => {
            let parsed: Vec<DailyLog> = items.iter().filter_map(parse_log).collect();
            if parsed.len() < items.len() {
                warn!(
                    goal_id = %id,
                    dropped = items.len() - parsed.len(),
                    "dropped unreadable log entries"
                );
            }
            merge_all(parsed)
        }
        _ => Vec::new(),
    };

    let status = object
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<GoalStatus>().ok())
        .unwrap_or(GoalStatus::Active);

    Some(Goal {
        id,
        title,
        start_date,
        total_days,
        history,
        status,
    })
}

fn parse_log(raw: &Value) -> Option<DailyLog> {
    let object = raw.as_object()?;
    let phase = object.get("phase")?.as_str()?.parse::<Phase>().ok()?;

    let date = object
        .get("date")
        .and_then(Value::as_str)
        .and_then(normalize_key)
        .unwrap_or_else(today_key);

    Some(DailyLog {
        date,
        phase,
        energy_level: clamp(number_or_zero(object.get("energyLevel")), 0.0, 100.0),
        base_target: number_or_zero(object.get("baseTarget")).max(0.0),
        actual_done: number_or_zero(object.get("actualDone")).max(0.0),
    })
}

/// Finite number from a JSON number or numeric string.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    value.and_then(number).unwrap_or(0.0)
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value?.as_str().filter(|s| !s.trim().is_empty())
}
