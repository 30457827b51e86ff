//! End-to-end tests for the braid binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn braid(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("braid"));
    cmd.current_dir(temp.path());
    cmd
}

fn setup_project(actions: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("braid.yml"), actions).unwrap();
    temp
}

#[test]
fn cli_shows_help() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Workflow combinators over shell-backed actions",
        ));
}

#[test]
fn cli_shows_version() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn eval_and_exit_codes() {
    let temp = TempDir::new().unwrap();
    braid(&temp).args(["eval", "and(pass,pass)"]).assert().success();
    braid(&temp)
        .args(["eval", "and(pass,fail)"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn eval_or_and_not() {
    let temp = TempDir::new().unwrap();
    braid(&temp).args(["eval", "or(fail,pass)"]).assert().success();
    braid(&temp).args(["eval", "or(fail,fail)"]).assert().failure();
    braid(&temp).args(["eval", "not(fail)"]).assert().success();
    braid(&temp).args(["eval", "not(pass)"]).assert().failure().code(1);
}

#[test]
fn and_short_circuits() {
    let temp = setup_project(
        "actions:\n  mark:\n    command: touch after-fail\n",
    );
    braid(&temp)
        .args(["eval", "and(pass,fail,mark)"])
        .assert()
        .failure();
    assert!(
        !temp.path().join("after-fail").exists(),
        "action after the failure must not run"
    );
}

#[test]
fn nonzero_codes_pass_through() {
    let temp = setup_project("actions:\n  seven:\n    command: exit 7\n");
    braid(&temp)
        .args(["--quiet", "eval", "seven"])
        .assert()
        .failure()
        .code(7);
}

#[test]
fn retry_runs_flaky_action_three_times() {
    // Fails twice, then succeeds.
    let temp = setup_project(
        "actions:\n  flaky:\n    command: \"n=$(cat count 2>/dev/null || echo 0); n=$((n+1)); echo $n > count; test $n -ge 3\"\n",
    );
    braid(&temp)
        .args(["--interval", "0.05", "--quiet", "eval", "retry(3/flaky)"])
        .assert()
        .success();
    let count = fs::read_to_string(temp.path().join("count")).unwrap();
    assert_eq!(count.trim(), "3");
}

#[test]
#[cfg(unix)]
fn timeout_terminates_slow_target_in_time() {
    let temp = TempDir::new().unwrap();
    let start = Instant::now();
    braid(&temp)
        .args(["--quiet", "eval", "timeout(2/sleep(10))"])
        .assert()
        .success();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
}

#[test]
#[cfg(unix)]
fn timeout_over_composite_target() {
    let temp = setup_project("actions:\n  mark:\n    command: touch ran\n");
    let start = Instant::now();
    braid(&temp)
        .args(["--quiet", "eval", "timeout(2/and(mark,sleep(10)))"])
        .assert()
        .success();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(temp.path().join("ran").exists());
}

#[test]
fn join_wall_clock_tracks_longest_child() {
    let temp = TempDir::new().unwrap();
    let start = Instant::now();
    braid(&temp)
        .args(["--quiet", "eval", "join(sleep(1),sleep(1),sleep(1))"])
        .assert()
        .success();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_millis(2800), "took {:?}", elapsed);
}

#[test]
fn join_prints_captured_output_per_child() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .args(["eval", "join(echo(alpha),echo(beta))"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha").and(predicate::str::contains("beta")));
}

#[test]
fn pipe_feeds_stage_output_forward() {
    let temp = setup_project(
        "actions:\n  emit:\n    command: printf hello\n  upper:\n    command: tr a-z A-Z\n",
    );
    braid(&temp)
        .args(["eval", "pipe(emit,upper)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HELLO"));
}

#[test]
fn stage_stack_is_lifo() {
    let temp = TempDir::new().unwrap();
    braid(&temp).args(["stage", "enter", "X"]).assert().success();
    braid(&temp)
        .args(["stage", "push", "X", r#"{"k":1}"#])
        .assert()
        .success();
    braid(&temp)
        .args(["stage", "push", "X", r#"{"k":2}"#])
        .assert()
        .success();

    braid(&temp)
        .args(["stage", "pop", "X"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"k":2}"#));
    braid(&temp)
        .args(["stage", "show", "X"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"[{"k":1}]"#));

    braid(&temp).args(["stage", "exit", "X"]).assert().success();
    braid(&temp)
        .args(["stage", "pop", "X"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn stage_reenter_requires_force() {
    let temp = TempDir::new().unwrap();
    braid(&temp).args(["stage", "enter", "X"]).assert().success();
    braid(&temp)
        .args(["stage", "enter", "X"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    braid(&temp)
        .args(["stage", "enter", "X", "--force"])
        .assert()
        .success();
}

#[test]
fn stage_combinators_reach_the_same_store() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .args(["--quiet", "eval", "enter(deploy)"])
        .assert()
        .success();
    braid(&temp)
        .args(["stage", "push", "deploy", "42"])
        .assert()
        .success();
    braid(&temp)
        .args(["stage", "peek", "deploy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
    braid(&temp)
        .args(["--quiet", "eval", "exit(deploy)"])
        .assert()
        .success();
}

#[test]
fn run_executes_exit_hooks_on_failure() {
    let temp = setup_project(
        "actions:\n  cleanup:\n    command: touch cleaned\nhooks:\n  on_exit: [cleanup]\n",
    );
    braid(&temp)
        .args(["--quiet", "run", "fail"])
        .assert()
        .failure()
        .code(1);
    assert!(temp.path().join("cleaned").exists());
}

#[test]
fn eval_skips_hooks() {
    let temp = setup_project(
        "actions:\n  cleanup:\n    command: touch cleaned\nhooks:\n  on_exit: [cleanup]\n",
    );
    braid(&temp).args(["--quiet", "eval", "fail"]).assert().failure();
    assert!(!temp.path().join("cleaned").exists());
}

#[test]
fn delay_returns_immediately_and_runs_later() {
    let temp = setup_project("actions:\n  mark:\n    command: touch delayed\n");
    let start = Instant::now();
    braid(&temp)
        .args(["--quiet", "eval", "delay(1/mark)"])
        .assert()
        .success();
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "delay must not block the caller"
    );
    assert!(!temp.path().join("delayed").exists());

    // The detached child fires after roughly a second.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !temp.path().join("delayed").exists() {
        assert!(Instant::now() < deadline, "delayed action never ran");
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn list_shows_actions() {
    let temp = setup_project("actions:\n  build:\n    command: make\n");
    braid(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("build").and(predicate::str::contains("pass")));
}

#[test]
fn list_json_is_machine_readable() {
    let temp = setup_project("actions:\n  build:\n    command: make\n");
    let output = braid(&temp).args(["list", "--json"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let names: Vec<String> = serde_json::from_str(&stdout).unwrap();
    assert!(names.contains(&"build".to_string()));
    assert!(names.contains(&"echo".to_string()));
}

#[test]
fn unknown_action_reports_error() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .args(["eval", "ghost"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown action"));
}

#[test]
fn malformed_expression_reports_error() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .args(["eval", "and(a,"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn malformed_actions_file_reports_error() {
    let temp = setup_project("actions:\n  build:\n    commnd: make\n");
    braid(&temp)
        .args(["eval", "pass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("actions file"));
}

#[test]
fn explicit_missing_actions_file_fails() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .args(["--file", "nope.yml", "eval", "pass"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn env_style_args_reach_the_child() {
    let temp = setup_project(
        "actions:\n  show:\n    command: \"printf '%s' \\\"$GREETING\\\"\"\n",
    );
    braid(&temp)
        .args(["eval", "show(GREETING=hi)"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hi"));
}

#[test]
fn completions_generate() {
    let temp = TempDir::new().unwrap();
    braid(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("braid"));
}
