//! Integration tests for the `tt` CLI.
//!
//! Each test points `tt` at a fresh temp data directory with `-C`, runs it
//! as a subprocess, and checks stdout and/or the storage file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;

/// Get the path to the built `tt` binary.
fn tt_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tt");
    path
}

/// Data dir with the alarm switched off so `tt run` stays quiet.
fn quiet_data_dir() -> tempfile::TempDir {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[alarm]\nenabled = false\n",
    )
    .unwrap();
    tmp
}

/// Run `tt -C <dir>` with the given args, returning (stdout, stderr, exit code).
fn run_tt(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(tt_bin())
        .arg("-C")
        .arg(dir)
        .args(args)
        .env_remove("TASKTREE_LOG")
        .output()
        .expect("failed to run tt");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

/// Run `tt` expecting success, return stdout.
fn run_tt_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_tt(dir, args);
    if code != 0 {
        panic!(
            "tt {:?} failed ({}):\nstdout: {}\nstderr: {}",
            args, code, stdout, stderr
        );
    }
    stdout
}

/// `tt add` prints the new id on its own line.
fn add(dir: &Path, args: &[&str]) -> String {
    let mut full = vec!["add"];
    full.extend_from_slice(args);
    run_tt_ok(dir, &full).trim().to_string()
}

fn stored_tree(dir: &Path) -> serde_json::Value {
    let text = fs::read_to_string(dir.join("storage.json")).unwrap();
    let kv: serde_json::Value = serde_json::from_str(&text).unwrap();
    serde_json::from_str(kv["tasks"].as_str().unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[test]
fn test_list_empty() {
    let tmp = quiet_data_dir();
    let out = run_tt_ok(tmp.path(), &["list"]);
    assert_eq!(out, "no tasks\n");
}

#[test]
fn test_add_and_list_nested() {
    let tmp = quiet_data_dir();
    let house = add(tmp.path(), &["Clean house"]);
    add(tmp.path(), &["Vacuum", "--parent", &house]);
    add(tmp.path(), &["Buy milk"]);

    let out = run_tt_ok(tmp.path(), &["list", "--no-stats"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(&format!("[ ] {} Clean house", house)));
    assert!(lines[1].starts_with("  [ ] "));
    assert!(lines[1].contains("Vacuum"));
    assert!(lines[2].contains("Buy milk"));
}

#[test]
fn test_add_defaults() {
    let tmp = quiet_data_dir();
    let id = add(tmp.path(), &[]);
    let tree = stored_tree(tmp.path());
    assert_eq!(tree[0]["id"], id.as_str());
    assert_eq!(tree[0]["title"], "Nuovo Task");
    assert_eq!(tree[0]["status"], "not-started");
    assert_eq!(tree[0]["timerDuration"], 300);
    assert_eq!(tree[0]["timerRemaining"], 300);
    assert_eq!(tree[0]["isTimerRunning"], false);
    assert_eq!(tree[0]["subtasks"], serde_json::json!([]));
}

#[test]
fn test_list_filter_keeps_ancestors() {
    let tmp = quiet_data_dir();
    let house = add(tmp.path(), &["Clean house"]);
    add(tmp.path(), &["Vacuum living room", "-p", &house]);
    add(tmp.path(), &["Dishes", "-p", &house]);
    add(tmp.path(), &["Buy milk"]);

    let out = run_tt_ok(tmp.path(), &["list", "--filter", "VACUUM", "--no-stats"]);
    assert!(out.contains("Clean house"));
    assert!(out.contains("Vacuum living room"));
    assert!(!out.contains("Dishes"));
    assert!(!out.contains("Buy milk"));

    let out = run_tt_ok(tmp.path(), &["list", "-f", "nothing here"]);
    assert!(out.starts_with("no tasks match 'nothing here'"));
}

#[test]
fn test_list_json_has_stats() {
    let tmp = quiet_data_dir();
    let id = add(tmp.path(), &["Buy milk"]);
    run_tt_ok(tmp.path(), &["status", &id, "done"]);

    let out = run_tt_ok(tmp.path(), &["list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["tasks"][0]["title"], "Buy milk");
    assert_eq!(parsed["stats"]["total"], 1);
    assert_eq!(parsed["stats"]["completed"], 1);
    assert_eq!(parsed["stats"]["elapsedSeconds"], 0);
}

#[test]
fn test_show_with_context() {
    let tmp = quiet_data_dir();
    let house = add(tmp.path(), &["Clean house"]);
    let vacuum = add(
        tmp.path(),
        &["Vacuum", "-p", &house, "--desc", "Under the sofa", "--due", "2030-01-02"],
    );

    let out = run_tt_ok(tmp.path(), &["show", &vacuum, "--context"]);
    assert!(out.starts_with(&format!("[ ] {} Clean house\n", house)));
    assert!(out.contains("due: 2030-01-02"));
    assert!(out.contains("  Under the sofa"));

    let out = run_tt_ok(tmp.path(), &["show", &vacuum, "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["id"], vacuum.as_str());
    assert_eq!(parsed["ancestors"][0]["title"], "Clean house");
}

#[test]
fn test_show_not_found() {
    let tmp = quiet_data_dir();
    let (stdout, stderr, code) = run_tt(tmp.path(), &["show", "nope"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("task not found: nope"));
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

#[test]
fn test_edit_fields() {
    let tmp = quiet_data_dir();
    let id = add(tmp.path(), &["Buy milk"]);
    run_tt_ok(
        tmp.path(),
        &["edit", &id, "--title", "Buy oat milk", "--desc", "Two cartons"],
    );
    let tree = stored_tree(tmp.path());
    assert_eq!(tree[0]["title"], "Buy oat milk");
    assert_eq!(tree[0]["description"], "Two cartons");

    let (_, stderr, code) = run_tt(tmp.path(), &["edit", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("nothing to change"));
}

#[test]
fn test_edit_rejects_bad_due_date() {
    let tmp = quiet_data_dir();
    let id = add(tmp.path(), &["Buy milk"]);
    let before = stored_tree(tmp.path());
    let (_, stderr, code) = run_tt(tmp.path(), &["edit", &id, "--due", "someday"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid due date"));
    assert_eq!(stored_tree(tmp.path()), before);
}

#[test]
fn test_status_change() {
    let tmp = quiet_data_dir();
    let id = add(tmp.path(), &["Buy milk"]);
    let out = run_tt_ok(tmp.path(), &["status", &id, "in-progress"]);
    assert_eq!(out, format!("{} \u{2192} in-progress\n", id));
    assert_eq!(stored_tree(tmp.path())[0]["status"], "in-progress");

    let (_, stderr, code) = run_tt(tmp.path(), &["status", &id, "blocked"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown status 'blocked'"));
}

#[test]
fn test_rm_removes_subtree() {
    let tmp = quiet_data_dir();
    let house = add(tmp.path(), &["Clean house"]);
    add(tmp.path(), &["Vacuum", "-p", &house]);
    add(tmp.path(), &["Dishes", "-p", &house]);
    let milk = add(tmp.path(), &["Buy milk"]);

    let out = run_tt_ok(tmp.path(), &["rm", &house]);
    assert_eq!(out, format!("deleted {} and 2 subtasks\n", house));
    let tree = stored_tree(tmp.path());
    assert_eq!(tree.as_array().unwrap().len(), 1);
    assert_eq!(tree[0]["id"], milk.as_str());

    let (_, stderr, code) = run_tt(tmp.path(), &["rm", &house]);
    assert_eq!(code, 1);
    assert!(stderr.contains(&format!("task not found: {}", house)));
}

#[test]
fn test_add_under_missing_parent_fails() {
    let tmp = quiet_data_dir();
    let (_, stderr, code) = run_tt(tmp.path(), &["add", "Orphan", "-p", "ghost"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("task not found: ghost"));
    assert!(!tmp.path().join("storage.json").exists());
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[test]
fn test_timer_toggle_reset_set() {
    let tmp = quiet_data_dir();
    let id = add(tmp.path(), &["Tea"]);

    let out = run_tt_ok(tmp.path(), &["timer", "toggle", &id]);
    assert_eq!(out, format!("{} running 00:05:00 / 00:05:00\n", id));

    let out = run_tt_ok(tmp.path(), &["timer", "set", &id, "25 min"]);
    assert_eq!(out, format!("{} stopped 00:25:00 / 00:25:00\n", id));

    let out = run_tt_ok(tmp.path(), &["timer", "set", &id, "1:30"]);
    assert_eq!(out, format!("{} stopped 00:01:30 / 00:01:30\n", id));

    let out = run_tt_ok(tmp.path(), &["timer", "reset", &id]);
    assert_eq!(out, format!("{} stopped 00:01:30 / 00:01:30\n", id));

    let (_, stderr, code) = run_tt(tmp.path(), &["timer", "set", &id, "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("greater than zero"));
}

#[test]
fn test_timer_presets() {
    let tmp = quiet_data_dir();
    let out = run_tt_ok(tmp.path(), &["timer", "presets"]);
    assert_eq!(out.lines().count(), 8);
    assert!(out.starts_with("5 min   00:05:00\n"));

    let out = run_tt_ok(tmp.path(), &["timer", "presets", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed[3]["label"], "25 min");
    assert_eq!(parsed[3]["seconds"], 1500);
}

#[test]
fn test_run_counts_down_to_expiry() {
    let tmp = quiet_data_dir();
    let id = add(tmp.path(), &["Tea", "--timer", "2"]);
    run_tt_ok(tmp.path(), &["timer", "toggle", &id]);

    let out = run_tt_ok(tmp.path(), &["run"]);
    assert_eq!(out, format!("timer expired: {} Tea\n", id));

    let tree = stored_tree(tmp.path());
    assert_eq!(tree[0]["timerRemaining"], 0);
    assert_eq!(tree[0]["isTimerRunning"], false);
}

#[test]
fn test_run_rings_every_beep_on_stderr() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[alarm]\nenabled = true\nbeeps = 3\ngap_ms = 50\n",
    )
    .unwrap();
    let id = add(tmp.path(), &["Tea", "--timer", "1s"]);
    run_tt_ok(tmp.path(), &["timer", "toggle", &id]);

    let (stdout, stderr, code) = run_tt(tmp.path(), &["run"]);
    assert_eq!(code, 0);
    assert_eq!(stdout, format!("timer expired: {} Tea\n", id));
    assert_eq!(stderr.matches('\x07').count(), 3);

    run_tt_ok(tmp.path(), &["timer", "reset", &id]);
    run_tt_ok(tmp.path(), &["timer", "toggle", &id]);
    let (stdout, stderr, code) = run_tt(tmp.path(), &["--json", "run"]);
    assert_eq!(code, 0);
    assert_eq!(stderr.matches('\x07').count(), 3);
    for line in stdout.lines() {
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["event"], "expired");
        assert_eq!(event["id"], id.as_str());
    }
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn test_run_without_running_timers_exits() {
    let tmp = quiet_data_dir();
    add(tmp.path(), &["Idle"]);
    let out = run_tt_ok(tmp.path(), &["run"]);
    assert!(out.is_empty());
}

// ---------------------------------------------------------------------------
// Config and storage
// ---------------------------------------------------------------------------

#[test]
fn test_config_init_and_print() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_tt_ok(tmp.path(), &["config", "--init"]);
    assert!(out.starts_with("wrote "));
    let written = fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    assert!(written.contains("[storage]"));

    let out = run_tt_ok(tmp.path(), &["config", "--init"]);
    assert!(out.contains("already exists"));

    let out = run_tt_ok(tmp.path(), &["config"]);
    assert!(out.contains("file = \"storage.json\""));
    assert!(out.contains("key = \"tasks\""));
}

#[test]
fn test_custom_storage_location() {
    let tmp = tempfile::TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[storage]\nfile = \"kv.json\"\nkey = \"tree\"\n",
    )
    .unwrap();
    add(tmp.path(), &["Buy milk"]);
    let kv: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("kv.json")).unwrap()).unwrap();
    assert!(kv["tree"].as_str().unwrap().contains("Buy milk"));
}

#[test]
fn test_corrupt_storage_reads_as_empty() {
    let tmp = quiet_data_dir();
    fs::write(
        tmp.path().join("storage.json"),
        r#"{"tasks": "this is not a task list"}"#,
    )
    .unwrap();
    let out = run_tt_ok(tmp.path(), &["list"]);
    assert_eq!(out, "no tasks\n");
}
