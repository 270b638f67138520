#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn saturn(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("saturn").unwrap();
    cmd.current_dir(dir.path())
        .env("SATURN_DATA_DIR", dir.path())
        .env_remove("SITE_URL")
        .env_remove("SATURN_PORT")
        .env_remove("SATURN_ENV");
    cmd
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn create_org(dir: &TempDir, name: &str) -> String {
    let org = json_output(saturn(dir).args(["--json", "org", "create", name]));
    org["id"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// saturn schedule next
// ---------------------------------------------------------------------------

#[test]
fn schedule_next_interval() {
    let dir = TempDir::new().unwrap();
    saturn(&dir)
        .args([
            "schedule",
            "next",
            "--interval",
            "60",
            "--from",
            "2024-01-01T00:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-01-01T00:01:00+00:00"));
}

#[test]
fn schedule_next_cron_in_timezone() {
    let dir = TempDir::new().unwrap();
    saturn(&dir)
        .args([
            "schedule",
            "next",
            "--cron",
            "0 9 * * *",
            "--tz",
            "America/New_York",
            "--from",
            "2024-01-15T00:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-01-15T14:00:00+00:00"));
}

#[test]
fn schedule_next_count_prints_consecutive_times() {
    let dir = TempDir::new().unwrap();
    let value = json_output(saturn(&dir).args([
        "--json",
        "schedule",
        "next",
        "--interval",
        "3600",
        "--from",
        "2024-01-01T00:00:00Z",
        "--count",
        "3",
    ]));
    assert_eq!(value["schedule"], "Every 1h");
    let next: Vec<&str> = value["next"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        next,
        vec![
            "2024-01-01T01:00:00+00:00",
            "2024-01-01T02:00:00+00:00",
            "2024-01-01T03:00:00+00:00",
        ]
    );
}

#[test]
fn schedule_next_requires_a_schedule() {
    let dir = TempDir::new().unwrap();
    saturn(&dir).args(["schedule", "next"]).assert().failure();
}

#[test]
fn schedule_next_rejects_unknown_timezone() {
    let dir = TempDir::new().unwrap();
    saturn(&dir)
        .args(["schedule", "next", "--cron", "0 9 * * *", "--tz", "Mars/Olympus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// saturn org / user
// ---------------------------------------------------------------------------

#[test]
fn org_create_then_list() {
    let dir = TempDir::new().unwrap();
    let id = create_org(&dir, "Acme");

    let orgs = json_output(saturn(&dir).args(["--json", "org", "list"]));
    let orgs = orgs.as_array().unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0]["id"], id.as_str());
    assert_eq!(orgs[0]["monitorLimit"], 5);

    saturn(&dir)
        .args(["org", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme"));
}

#[test]
fn org_create_rejects_empty_name() {
    let dir = TempDir::new().unwrap();
    saturn(&dir).args(["org", "create", ""]).assert().failure();
}

#[test]
fn user_create_prints_session_token() {
    let dir = TempDir::new().unwrap();
    let org = create_org(&dir, "Acme");
    saturn(&dir)
        .args(["user", "create", "Ops@Example.com", "--name", "Ops", "--org", &org])
        .assert()
        .success()
        .stdout(predicate::str::contains("ops@example.com"))
        .stdout(predicate::str::contains("as owner"))
        .stdout(predicate::str::contains("Session token: ss_"));
}

#[test]
fn user_create_duplicate_email_fails() {
    let dir = TempDir::new().unwrap();
    saturn(&dir).args(["user", "create", "a@example.com"]).assert().success();
    saturn(&dir)
        .args(["user", "create", "A@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already registered"));
}

#[test]
fn user_login_issues_new_token_for_existing_email() {
    let dir = TempDir::new().unwrap();
    let created = json_output(saturn(&dir).args(["--json", "user", "create", "ops@example.com"]));
    let login = json_output(saturn(&dir).args(["--json", "user", "login", "OPS@example.com"]));
    assert_eq!(login["user"]["id"], created["user"]["id"]);
    let token = login["token"].as_str().unwrap();
    assert!(token.starts_with("ss_"));
    assert_ne!(token, created["token"].as_str().unwrap());
}

#[test]
fn user_login_unknown_email_fails() {
    let dir = TempDir::new().unwrap();
    saturn(&dir)
        .args(["user", "login", "ghost@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no user registered"));
}

// ---------------------------------------------------------------------------
// saturn monitor
// ---------------------------------------------------------------------------

#[test]
fn monitor_create_list_and_runs() {
    let dir = TempDir::new().unwrap();
    let org = create_org(&dir, "Acme");

    let created = json_output(saturn(&dir).args([
        "--json", "monitor", "create", "--org", &org, "nightly-backup", "--interval", "3600",
    ]));
    let id = created["monitor"]["id"].as_str().unwrap().to_string();
    assert!(created["pingUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://saturnmonitor.com/api/ping/pg_"));

    saturn(&dir)
        .args(["monitor", "list", "--org", &org])
        .assert()
        .success()
        .stdout(predicate::str::contains("nightly-backup"))
        .stdout(predicate::str::contains("Every 1h"));

    saturn(&dir)
        .args(["monitor", "runs", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("(none)"));
}

#[test]
fn monitor_create_with_both_schedules_fails() {
    let dir = TempDir::new().unwrap();
    let org = create_org(&dir, "Acme");
    saturn(&dir)
        .args([
            "monitor", "create", "--org", &org, "job", "--interval", "60", "--cron", "* * * * *",
        ])
        .assert()
        .failure();
}

#[test]
fn monitor_runs_unknown_id_fails() {
    let dir = TempDir::new().unwrap();
    saturn(&dir)
        .args(["monitor", "runs", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("monitor not found"));
}

// ---------------------------------------------------------------------------
// saturn evaluate / config
// ---------------------------------------------------------------------------

#[test]
fn evaluate_on_empty_data_dir() {
    let dir = TempDir::new().unwrap();
    let report = json_output(saturn(&dir).args(["--json", "evaluate"]));
    assert_eq!(report["checked"], 0);
    assert_eq!(report["missed"].as_array().unwrap().len(), 0);
}

#[test]
fn config_validate_defaults() {
    let dir = TempDir::new().unwrap();
    saturn(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("saturn.yaml"),
        "evaluator:\n  interval_secs: 0\n",
    )
    .unwrap();
    saturn(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"));
}

#[test]
fn config_show_applies_env_override() {
    let dir = TempDir::new().unwrap();
    saturn(&dir)
        .env("SATURN_ENV", "production")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("environment: production"));
}
