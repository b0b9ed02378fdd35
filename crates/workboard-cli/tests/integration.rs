use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn workboard(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("workboard").unwrap();
    cmd.current_dir(dir.path()).env("WORKBOARD_ROOT", dir.path());
    cmd
}

fn init_board(dir: &TempDir) {
    workboard(dir).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// workboard init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_board_tree() {
    let dir = TempDir::new().unwrap();
    workboard(&dir).arg("init").assert().success();

    assert!(dir.path().join(".workboard").is_dir());
    assert!(dir.path().join(".workboard/config.yaml").exists());
    assert!(dir.path().join(".workboard/board.yaml").exists());
    assert!(dir.path().join(".workboard/logs").is_dir());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    workboard(&dir).arg("init").assert().success();
    workboard(&dir).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// workboard ticket
// ---------------------------------------------------------------------------

#[test]
fn ticket_add_and_list() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);

    workboard(&dir)
        .args(["ticket", "add", "0071", "Fix login flow"])
        .assert()
        .success();

    workboard(&dir)
        .args(["ticket", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0071"))
        .stdout(predicate::str::contains("unassigned"));
}

#[test]
fn ticket_add_duplicate_fails() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);

    workboard(&dir)
        .args(["ticket", "add", "0071", "First"])
        .assert()
        .success();
    workboard(&dir)
        .args(["ticket", "add", "0071", "Second"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn ticket_move_updates_column() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);

    workboard(&dir)
        .args(["ticket", "add", "0071", "Fix login flow"])
        .assert()
        .success();
    workboard(&dir)
        .args(["ticket", "move", "0071", "todo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("to_do"));

    workboard(&dir)
        .args(["ticket", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("to_do"));
}

// ---------------------------------------------------------------------------
// workboard run
// ---------------------------------------------------------------------------

#[test]
fn run_requires_init() {
    let dir = TempDir::new().unwrap();
    workboard(&dir)
        .args(["run", "implementation", "implement 0071"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn run_rejects_unknown_worker() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    workboard(&dir)
        .args(["run", "standup", "implement 0071"])
        .assert()
        .failure();
}

#[test]
fn run_against_unreachable_runtime_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);

    // Point the runtime at a port nothing listens on
    std::fs::write(
        dir.path().join(".workboard/config.yaml"),
        "version: 1\nproject:\n  name: test\nruntime:\n  base_url: http://127.0.0.1:1\n",
    )
    .unwrap();

    workboard(&dir)
        .args(["ticket", "add", "0071", "Fix login flow"])
        .assert()
        .success();
    workboard(&dir)
        .args(["ticket", "move", "0071", "todo"])
        .assert()
        .success();

    workboard(&dir)
        .args(["run", "implementation", "implement 0071"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("failure"));

    // The conversation log was persisted, trigger message included
    let log = std::fs::read_to_string(
        dir.path().join(".workboard/logs/implementation-agent.md"),
    )
    .unwrap();
    assert!(log.contains("implement 0071"));

    // And the diagnostics file recorded the accepted trigger
    let diag =
        std::fs::read_to_string(dir.path().join(".workboard/diagnostics.log")).unwrap();
    assert!(diag.contains("trigger_accepted"));
}

// ---------------------------------------------------------------------------
// workboard log / diag
// ---------------------------------------------------------------------------

#[test]
fn log_before_any_run() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    workboard(&dir)
        .args(["log", "qa-agent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no log yet"));
}

#[test]
fn diag_before_any_run() {
    let dir = TempDir::new().unwrap();
    init_board(&dir);
    workboard(&dir)
        .arg("diag")
        .assert()
        .success()
        .stdout(predicate::str::contains("no diagnostics recorded yet"));
}
