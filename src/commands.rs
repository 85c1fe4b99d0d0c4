//! One-shot command line operations against the persisted store.

use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::Command;
use crate::date::today_key;
use crate::error::{ServiceError, ServiceResult};
use crate::metadata::{PKG_NAME, PKG_VERSION};
use crate::storage::Storage;
use crate::store::{GoalStore, GoalSummary, LogOutcome};
use crate::types::{DailyLogInput, Goal, GoalStatus};

/// Run a local command: hydrate, mutate, save, report.
pub fn run(command: Command, store: &mut GoalStore, storage: &Storage) -> ServiceResult<()> {
    let message = match command {
        Command::Start(_) => {
            return Err(ServiceError::FromString(
                "start is handled by the server entry point".to_string(),
            ));
        }
        Command::Version => {
            println!("{PKG_NAME} {PKG_VERSION}");
            return Ok(());
        }
        Command::Status => {
            println!("{}", render_status(store, &today_key()));
            return Ok(());
        }
        Command::Create { title, days, start } => match store.create_goal(&title, days, start) {
            Ok(goal) => format!(
                "{} {} ({} days from {})",
                "Started".green().bold(),
                goal.title,
                goal.total_days,
                goal.start_date
            ),
            Err(err) => return Err(ServiceError::FromString(err.to_string())),
        },
        Command::Log {
            phase,
            energy,
            target,
            done,
            date,
        } => {
            let input = DailyLogInput {
                phase,
                energy_level: energy,
                base_target: target.unwrap_or(store.config().default_base_target),
                actual_done: done,
                date,
            };
            render_outcome(store.add_daily_log(input))
        }
        Command::Settle { energy, progress } => render_outcome(store.settle_day(energy, progress)),
        Command::Update { title, days } => {
            if !store.update_goal(title.as_deref(), days) {
                return Err(ServiceError::FromString("No active goal to update.".to_string()));
            }
            "Goal updated.".to_string()
        }
        Command::Complete => archived_message(store.complete_active_goal()),
        Command::Abandon => archived_message(store.abandon_active_goal()),
        Command::Reset { yes } => {
            if !yes && !confirm_reset()? {
                println!("Nothing changed.");
                return Ok(());
            }
            store.clear_store();
            "All goals erased.".yellow().to_string()
        }
    };

    storage.save(&store.snapshot())?;
    println!("{message}");
    Ok(())
}

fn confirm_reset() -> ServiceResult<bool> {
    Confirm::new()
        .with_prompt("Erase the active goal and the whole archive?")
        .default(false)
        .interact()
        .map_err(|e| ServiceError::FromString(format!("Prompt failed: {e}")))
}

fn render_outcome(outcome: LogOutcome) -> String {
    match outcome {
        LogOutcome::NoActiveGoal => "No active goal; nothing logged.".dimmed().to_string(),
        LogOutcome::Recorded {
            stability_score,
            completion,
        } => format!(
            "Logged. completion {completion:.2}%, stability {}",
            format_score(stability_score)
        ),
        LogOutcome::AutoCompleted { completion } => format!(
            "{} completion reached {completion:.2}%",
            "Goal completed!".green().bold()
        ),
    }
}

fn archived_message(goal: Option<Goal>) -> String {
    match goal {
        Some(goal) => format!("{} is now {}", goal.title, format_status(goal.status)),
        None => "No active goal.".dimmed().to_string(),
    }
}

fn format_status(status: GoalStatus) -> String {
    match status {
        GoalStatus::Active => status.as_str().cyan().to_string(),
        GoalStatus::Completed => status.as_str().green().to_string(),
        GoalStatus::Abandoned => status.as_str().red().to_string(),
    }
}

fn format_score(score: f64) -> String {
    let text = format!("{score:.2}");
    if score >= 70.0 {
        text.green().to_string()
    } else if score >= 40.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

pub fn render_status(store: &GoalStore, today: &str) -> String {
    let mut lines = Vec::new();
    match store.summary(today) {
        Some(summary) => lines.extend(summary_lines(&summary)),
        None => lines.push("No active goal.".dimmed().to_string()),
    }

    let archived: Vec<&Goal> = store
        .archived_goals()
        .iter()
        .filter(|g| g.status.is_terminal())
        .collect();
    if !archived.is_empty() {
        lines.push(String::new());
        lines.push(format!("Archive ({}):", archived.len()).bold().to_string());
        for goal in archived {
            lines.push(format!("  {} [{}]", goal.title, format_status(goal.status)));
        }
    }
    lines.join("\n")
}

fn summary_lines(summary: &GoalSummary) -> Vec<String> {
    let goal = &summary.goal;
    let mut lines = vec![
        goal.title.bold().to_string(),
        format!(
            "  day {} of {} (since {})",
            summary.days_active, goal.total_days, goal.start_date
        ),
        format!("  completion {:.2}%", summary.completion),
        format!("  stability  {}", format_score(summary.stability_score)),
        format!("  next phase {}", summary.current_phase),
    ];
    if let Some(log) = &summary.today_log {
        lines.push(format!(
            "  today      {} energy {:.0}, done {} of {}",
            log.phase, log.energy_level, log.actual_done, log.base_target
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Storage, GoalStore) {
        colored::control::set_override(false);
        let tmp = TempDir::new().unwrap();
        let storage = Storage::new(tmp.path().join("store.json"));
        let mut store = GoalStore::default();
        storage.hydrate(&mut store).unwrap();
        (tmp, storage, store)
    }

    #[test]
    fn test_create_and_log_persist() {
        let (_tmp, storage, mut store) = setup();
        run(
            Command::Create {
                title: "Practice piano".into(),
                days: Some(30.0),
                start: Some("2024-01-01".into()),
            },
            &mut store,
            &storage,
        )
        .unwrap();
        run(
            Command::Log {
                phase: crate::types::Phase::Evening,
                energy: 50.0,
                target: None,
                done: 4.0,
                date: Some("2024-01-02".into()),
            },
            &mut store,
            &storage,
        )
        .unwrap();

        let saved = storage.load().unwrap();
        let goal = saved.active_goal.unwrap();
        assert_eq!(goal.total_days, 30);
        assert_eq!(goal.history.len(), 1);
        assert_eq!(goal.history[0].base_target, 4.0);
    }

    #[test]
    fn test_create_twice_is_an_error() {
        let (_tmp, storage, mut store) = setup();
        let create = || Command::Create {
            title: "Run".into(),
            days: None,
            start: None,
        };
        run(create(), &mut store, &storage).unwrap();
        let err = run(create(), &mut store, &storage).unwrap_err();
        assert!(err.to_string().contains("already an active goal"));
    }

    #[test]
    fn test_reset_with_yes_skips_prompt() {
        let (_tmp, storage, mut store) = setup();
        store.create_goal("Run", None, None).unwrap();
        run(Command::Reset { yes: true }, &mut store, &storage).unwrap();
        assert!(storage.load().unwrap().active_goal.is_none());
    }

    #[test]
    fn test_render_status() {
        let (_tmp, _storage, mut store) = setup();
        assert_eq!(render_status(&store, "2024-01-01"), "No active goal.");

        store.create_goal("Old", None, None).unwrap();
        store.abandon_active_goal();
        store.create_goal("Read", Some(10.0), Some("2024-01-01".into())).unwrap();
        let text = render_status(&store, "2024-01-05");
        assert!(text.contains("Read"));
        assert!(text.contains("day 5 of 10"));
        assert!(text.contains("next phase morning"));
        assert!(text.contains("Old [abandoned]"));
        assert!(text.contains("Archive (1):"));
    }

    #[test]
    fn test_render_status_archive_count_matches_listing() {
        let (_tmp, _storage, mut store) = setup();
        store.hydrate(crate::migrate::migrate(serde_json::json!({
            "schemaVersion": 4,
            "archivedGoals": [
                { "id": "a", "title": "Done", "startDate": "2023-01-01", "status": "completed" },
                { "id": "b", "title": "Stray", "startDate": "2023-02-01", "status": "active" }
            ]
        })));
        let text = render_status(&store, "2024-01-05");
        assert!(text.contains("Archive (1):"));
        assert!(text.contains("Done [completed]"));
        assert!(!text.contains("Stray"));
    }
}
