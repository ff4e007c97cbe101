use std::fs;

use chrono::{TimeZone, Utc};
use questlog_core::leisure::LeisureKind;
use questlog_core::prefs::{ColorMode, Theme};
use questlog_core::state::AppState;
use questlog_core::storage::{FileStore, KeyValueStore};
use questlog_core::targets::TargetList;
use questlog_core::task::{TaskCategory, TaskStatus};
use questlog_core::view::{CategoryFilter, Page};
use tempfile::tempdir;

#[test]
fn file_store_round_trip_across_sessions() {
    let temp = tempdir().expect("tempdir");

    let created = Utc.with_ymd_and_hms(2026, 5, 4, 8, 15, 30).unwrap();
    let (work_id, health_id) = {
        let store = FileStore::open(temp.path()).expect("open store");
        let mut state = AppState::load(store);

        let work_id = state
            .add_task_at("Ship the release", TaskCategory::Work, created)
            .expect("add work task");
        let health_id = state
            .add_task_at("Evening run", TaskCategory::Health, created)
            .expect("add health task");
        assert!(state.set_task_status(&health_id, TaskStatus::Completed));
        state.add_target("Read one book").expect("add target");
        state.log_show("Severance", "1.5").expect("log show");
        state.set_theme(Theme::Cyberpunk);
        state.set_color_mode(ColorMode::Dark);
        (work_id, health_id)
    };

    let reopened = AppState::load(FileStore::open(temp.path()).expect("reopen store"));
    assert_eq!(reopened.tasks().len(), 2);
    assert_eq!(reopened.tasks()[0].id, health_id);
    assert_eq!(reopened.task(&work_id).expect("work task").created_at, created);
    assert_eq!(reopened.targets().len(), 3);
    assert_eq!(reopened.leisure().hours_logged(LeisureKind::Show), 1.5);
    assert_eq!(reopened.preferences().theme, Theme::Cyberpunk);
    assert_eq!(reopened.preferences().color_mode, ColorMode::Dark);

    let stats = reopened.stats();
    assert_eq!((stats.total, stats.completed, stats.remaining, stats.percentage), (2, 1, 1, 50));

    let done = reopened.view(Page::Completed, CategoryFilter::Only(TaskCategory::Health));
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].text, "Evening run");

    assert_eq!(
        fs::read_to_string(temp.path().join("app_theme.json")).expect("theme file"),
        "CYBERPUNK"
    );
}

#[test]
fn legacy_completed_flag_is_upgraded_on_load() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join("daily_tasks.json"),
        r#"[
            {"id":"a","text":"old done","category":"Personal","completed":true,"createdAt":1700000000000},
            {"id":"b","text":"old open","category":"Learning","completed":false,"createdAt":1700000000001},
            {"id":"c","text":"new","category":"Other","status":"incomplete","createdAt":1700000000002}
        ]"#,
    )
    .expect("write legacy tasks");

    let mut state = AppState::load(FileStore::open(temp.path()).expect("open store"));
    let statuses: Vec<TaskStatus> = state.tasks().iter().map(|t| t.status).collect();
    assert_eq!(
        statuses,
        vec![TaskStatus::Completed, TaskStatus::Active, TaskStatus::Incomplete]
    );

    state.add_task("fresh", TaskCategory::Work).expect("add");
    let raw = fs::read_to_string(temp.path().join("daily_tasks.json")).expect("tasks file");
    assert!(!raw.contains("\"completed\""));
    assert!(raw.contains("\"status\":\"completed\""));
}

#[test]
fn corrupt_slots_fall_back_to_defaults() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join("weekly_targets.json"), "{not json").expect("write targets");
    fs::write(temp.path().join("cheat_movies.json"), "[1, 2").expect("write movies");
    fs::write(temp.path().join("app_theme.json"), "NEON").expect("write theme");

    let mut state = AppState::load(FileStore::open(temp.path()).expect("open store"));
    assert_eq!(state.targets(), &TargetList::seeded());
    assert!(state.leisure().entries(LeisureKind::Movie).is_empty());
    assert_eq!(state.preferences().theme, Theme::Vaporwave);

    state.log_movie("Arrival").expect("log movie");
    let store = state.into_store();
    let raw = store.get("cheat_movies").expect("read").expect("present");
    let movies: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(movies[0]["title"], "Arrival");
    assert!(movies[0].get("metric").is_none());
}

#[test]
fn export_then_import_into_fresh_directory() {
    let source = tempdir().expect("tempdir");
    let target = tempdir().expect("tempdir");

    let mut state = AppState::load(FileStore::open(source.path()).expect("open source"));
    state.add_task("carry over", TaskCategory::Learning).expect("add");
    state.log_game("Hades", "2").expect("log game");
    let dump = state.export().expect("export");

    let mut fresh = AppState::load(FileStore::open(target.path()).expect("open target"));
    let slots = fresh.import(&dump).expect("import");
    assert_eq!(slots.len(), 7);

    let reopened = AppState::load(FileStore::open(target.path()).expect("reopen target"));
    assert_eq!(reopened.tasks(), state.tasks());
    assert_eq!(reopened.leisure().hours_logged(LeisureKind::Game), 2.0);
}
