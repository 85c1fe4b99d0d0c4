use schemars::JsonSchema;
use serde::Deserialize;

use crate::server::ServerState;
use crate::store::GoalStore;

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub struct HealthParams {
    #[serde(default)]
    pub verbose: bool,
}

pub fn health_summary(state: &ServerState, store: &GoalStore, verbose: bool) -> String {
    let uptime = state.uptime();
    let active = state.transports.active_endpoints();
    let transports = if active.is_empty() {
        "none".to_string()
    } else {
        active.join(", ")
    };
    let hydrated = store.has_hydrated();
    if verbose {
        format!(
            "status: ok\nversion: {}\nuptime_seconds: {}\ntransports: {}\nhydrated: {}\nstore: {}\nactive_goal: {}\narchived_goals: {}",
            state.version,
            uptime.as_secs(),
            transports,
            hydrated,
            state.storage.path().display(),
            store.active_goal().map(|g| g.title.as_str()).unwrap_or("none"),
            store.archived_goals().len(),
        )
    } else {
        format!(
            "ok (v{}, uptime {}s, transports: {}, hydrated: {})",
            state.version,
            uptime.as_secs(),
            transports,
            hydrated
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Transports;
    use crate::storage::Storage;

    #[test]
    fn test_health_summary_reports_transports_and_hydration() {
        let state = ServerState::new(
            GoalStore::default(),
            Storage::new("/tmp/yoh-health/store.json"),
            Transports {
                stdio: true,
                http: Some("127.0.0.1:8080".to_string()),
            },
        );
        let store = state.store.try_lock().unwrap();

        let short = health_summary(&state, &store, false);
        assert!(short.starts_with("ok (v"));
        assert!(short.contains("stdio, http://127.0.0.1:8080/mcp"));
        assert!(short.contains("hydrated: false"));

        let long = health_summary(&state, &store, true);
        assert!(long.contains("active_goal: none"));
        assert!(long.contains("archived_goals: 0"));
    }
}
