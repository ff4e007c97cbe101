#[allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const UNSET_KEY_VAR: &str = "QUESTLOG_CLI_TEST_KEY_NEVER_SET";

struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create tempdir"),
        }
    }

    /// Isolated from the user's rc file and home data, quote fetch off.
    fn cmd(&self) -> Command {
        let mut cmd = self.online_cmd();
        cmd.args(["--set", "quote.enabled=off"]);
        cmd
    }

    /// Quote fetch on, but pointed at an API key variable that is never set,
    /// so every fetch fails before touching the network.
    fn online_cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("questlog").expect("binary");
        cmd.env("QUESTLOGRC", "/dev/null")
            .env_remove("RUST_LOG")
            .env_remove(UNSET_KEY_VAR)
            .arg("--data")
            .arg(self.dir.path())
            .args(["--set", &format!("quote.api_key_env={UNSET_KEY_VAR}")]);
        cmd
    }

    fn export(&self) -> Value {
        let output = self.cmd().arg("export").output().expect("run export");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("parse JSON failed: {e}\nstdout: {stdout}"))
    }

    fn first_task_id(&self) -> String {
        self.export()["daily_tasks"][0]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}

#[test]
fn add_then_list_by_page() {
    let env = TestEnv::new();
    env.cmd()
        .args(["add", "Write", "the", "report", "-c", "learning"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task"));

    env.cmd()
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write the report").and(predicate::str::contains("Learning")));

    env.cmd()
        .args(["list", "--page", "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));

    env.cmd()
        .args(["list", "--category", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks found."));
}

#[test]
fn blank_task_text_adds_nothing() {
    let env = TestEnv::new();
    env.cmd()
        .args(["add", "   "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to add"));
    assert_eq!(env.export()["daily_tasks"], serde_json::json!([]));
}

#[test]
fn done_by_prefix_updates_stats() {
    let env = TestEnv::new();
    env.cmd().args(["add", "Stretch"]).assert().success();
    env.cmd().args(["add", "Plan week"]).assert().success();
    let id = env.first_task_id();

    env.cmd()
        .args(["done", &id[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now completed"));

    env.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Progress: 50% (1/2)"));
}

#[test]
fn fail_asks_for_confirmation() {
    let env = TestEnv::new();
    env.cmd().args(["add", "Call the bank"]).assert().success();
    let id = env.first_task_id();

    env.cmd()
        .args(["fail", &id])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("left active"));
    assert_eq!(env.export()["daily_tasks"][0]["status"], "active");

    env.cmd()
        .args(["fail", &id])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("is now incomplete"));
    assert_eq!(env.export()["daily_tasks"][0]["status"], "incomplete");

    env.cmd().args(["reopen", &id]).assert().success();
    env.cmd().args(["fail", &id, "--yes"]).assert().success();
    assert_eq!(env.export()["daily_tasks"][0]["status"], "incomplete");
}

#[test]
fn unknown_id_is_a_notice_not_an_error() {
    let env = TestEnv::new();
    env.cmd()
        .args(["delete", "deadbeef"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No task matches 'deadbeef'."));
}

#[test]
fn ambiguous_prefix_fails() {
    let env = TestEnv::new();
    env.cmd()
        .args(["target", "toggle", "w"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: ambiguous target id 'w'"));
}

#[test]
fn weekly_targets_start_seeded() {
    let env = TestEnv::new();
    env.cmd()
        .args(["target", "toggle", "w1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Target w1 checked."));

    env.cmd()
        .args(["target", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("(1/2)")
                .and(predicate::str::contains("[x] w1 Daily Meditation"))
                .and(predicate::str::contains("[ ] w2 Workout Session")),
        );
}

#[test]
fn leisure_log_rejects_bad_hours() {
    let env = TestEnv::new();
    env.cmd().args(["log", "movie", "Arrival"]).assert().success();
    env.cmd().args(["log", "game", "Hades", "2.5"]).assert().success();
    env.cmd()
        .args(["log", "game", "Celeste", "lots"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing logged"));
    env.cmd()
        .args(["log", "show", "Dark", "--", "-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing logged"));

    env.cmd()
        .arg("leisure")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Movies (1)")
                .and(predicate::str::contains("Games (1, 2.5h)"))
                .and(predicate::str::contains("Shows (0, 0h)")),
        );
}

#[test]
fn theme_and_mode_persist() {
    let env = TestEnv::new();
    env.cmd()
        .args(["theme", "--cycle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Theme: CYBERPUNK (Neuro-Grid HUD)"));
    env.cmd()
        .args(["mode", "toggle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Color mode: dark"));

    let dump = env.export();
    assert_eq!(dump["app_theme"], "CYBERPUNK");
    assert_eq!(dump["theme"], "dark");
}

#[test]
fn dashboard_shows_placeholder_when_fetch_disabled() {
    let env = TestEnv::new();
    env.cmd().args(["add", "Inbox zero"]).assert().success();
    env.cmd()
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Daily Tasks")
                .and(predicate::str::contains("LEVEL UP YOUR REALITY."))
                .and(predicate::str::contains("Inbox zero"))
                .and(predicate::str::contains("Daily Meditation")),
        );
}

#[test]
fn failed_fetch_falls_back() {
    let env = TestEnv::new();
    env.online_cmd()
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("Make today count."));

    env.online_cmd()
        .arg("quote")
        .assert()
        .success()
        .stdout(predicate::str::diff("Make today count.\n"));

    env.online_cmd()
        .args(["suggest", "get", "fit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No suggestions available."));
}

#[test]
fn import_local_storage_dump() {
    let env = TestEnv::new();
    let dump = env.dir.path().join("dump.json");
    fs::write(
        &dump,
        r#"{
            "daily_tasks": "[{\"id\":\"legacy1\",\"text\":\"Old habit\",\"category\":\"Health\",\"completed\":true,\"createdAt\":1700000000000}]",
            "cheat_games": "[{\"id\":\"g1\",\"title\":\"Hades\",\"metric\":4}]",
            "app_theme": "FANTASY"
        }"#,
    )
    .expect("write dump");

    env.cmd()
        .arg("import")
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 slot(s)"));

    let exported = env.export();
    assert_eq!(exported["daily_tasks"][0]["status"], "completed");
    assert_eq!(exported["cheat_games"][0]["metric"], 4.0);
    assert_eq!(exported["app_theme"], "FANTASY");
}

#[test]
fn malformed_import_is_rejected() {
    let env = TestEnv::new();
    env.cmd()
        .arg("import")
        .write_stdin("{\"daily_tasks\": [{\"id\": 3}]}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("daily_tasks"));
    assert_eq!(env.export()["daily_tasks"], serde_json::json!([]));
}

#[test]
fn list_all_pages_honor_category() {
    let env = TestEnv::new();
    env.cmd().args(["add", "Quarterly review", "-c", "work"]).assert().success();
    env.cmd().args(["add", "Call grandma", "-c", "personal"]).assert().success();
    let id = env.first_task_id();
    env.cmd().args(["done", &id]).assert().success();

    env.cmd()
        .args(["list", "--page", "all", "--category", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quarterly review").and(predicate::str::contains("Call grandma").not()));

    env.cmd()
        .args(["list", "--page", "leisure"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quarterly review").and(predicate::str::contains("Call grandma")));
}

#[test]
fn dashboard_renders_before_quote_arrives() {
    let env = TestEnv::new();
    let output = env.online_cmd().arg("dashboard").output().expect("run dashboard");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let targets_at = stdout.find("Daily Meditation").expect("targets rendered");
    let quote_at = stdout.find("Make today count.").expect("fallback quote rendered");
    assert!(targets_at < quote_at, "quote printed before the board:\n{stdout}");
}

