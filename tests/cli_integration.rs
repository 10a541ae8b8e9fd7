//! Integration tests for the `tl` CLI.
//!
//! Each test initializes a temp directory, runs `tl` as a subprocess with a
//! pinned `--now`, and checks stdout and the store file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the path to the built `tl` binary.
fn tl_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tl");
    path
}

fn run(root: &Path, now: &str, args: &[&str]) -> Output {
    Command::new(tl_bin())
        .arg("-C")
        .arg(root)
        .args(["--now", now])
        .args(args)
        .env_remove("TASKLINE_LOG")
        .output()
        .unwrap()
}

/// Run and assert success, returning stdout.
fn tl(root: &Path, now: &str, args: &[&str]) -> String {
    let out = run(root, now, args);
    assert!(
        out.status.success(),
        "tl {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).unwrap()
}

fn init() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let out = Command::new(tl_bin())
        .arg("-C")
        .arg(tmp.path())
        .arg("init")
        .output()
        .unwrap();
    assert!(out.status.success());
    tmp
}

const NOW: &str = "2024-02-29T09:00";

#[test]
fn init_creates_data_dir() {
    let tmp = init();
    assert!(tmp.path().join(".taskline/store.json").exists());
    assert!(tmp.path().join(".taskline/config.toml").exists());
}

#[test]
fn commands_outside_a_project_fail() {
    let tmp = TempDir::new().unwrap();
    let out = run(tmp.path(), NOW, &["open"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("error:"));
}

#[test]
fn add_and_list_open_tasks() {
    let tmp = init();
    let out = tl(tmp.path(), NOW, &["add", "Buy milk"]);
    assert_eq!(out, "added t-1\n");

    let open = tl(tmp.path(), NOW, &["open"]);
    assert_eq!(open, "[ ] t-1  Buy milk\n");
}

#[test]
fn completing_recurring_task_creates_next_occurrence() {
    let tmp = init();
    tl(
        tmp.path(),
        NOW,
        &["add", "Pay rent", "--due", "2024-02-29", "--repeat", "monthly"],
    );

    let out = tl(tmp.path(), NOW, &["done", "t-1"]);
    assert_eq!(out, "completed t-1\nnext t-2 due 2024-03-29 (monthly)\n");

    let open = tl(tmp.path(), NOW, &["open"]);
    assert_eq!(open, "[ ] t-2  Pay rent  due 2024-03-29 (monthly)\n");
    let archive = tl(tmp.path(), NOW, &["archive"]);
    assert_eq!(archive, "[x] t-1  Pay rent  due 2024-02-29\n");
}

#[test]
fn done_twice_reopens_to_unsorted() {
    let tmp = init();
    tl(tmp.path(), NOW, &["list", "add", "Errands"]);
    tl(tmp.path(), NOW, &["add", "Bank", "--list", "1"]);

    tl(tmp.path(), NOW, &["done", "t-1"]);
    assert_eq!(tl(tmp.path(), NOW, &["ls", "archive"]), "[x] t-1  Bank\n");

    let out = tl(tmp.path(), NOW, &["done", "t-1"]);
    assert_eq!(out, "reopened t-1\n");
    assert_eq!(tl(tmp.path(), NOW, &["ls", "unsorted"]), "[ ] t-1  Bank\n");
    assert_eq!(tl(tmp.path(), NOW, &["ls", "1"]), "no tasks\n");
}

#[test]
fn missed_respects_time_of_day() {
    let tmp = init();
    tl(
        tmp.path(),
        NOW,
        &["add", "Submit report", "--due", "2024-02-29", "--at", "18:00"],
    );

    assert_eq!(tl(tmp.path(), "2024-02-29T18:00", &["missed"]), "no tasks\n");
    assert_eq!(
        tl(tmp.path(), "2024-02-29T18:01", &["missed"]),
        "[ ] t-1  Submit report  due 2024-02-29 18:00  MISSED\n"
    );
}

#[test]
fn today_shows_tasks_due_today() {
    let tmp = init();
    tl(tmp.path(), NOW, &["add", "Stretch", "--due", "2024-02-29"]);
    tl(tmp.path(), NOW, &["add", "Dentist", "--due", "2024-03-01"]);

    let today = tl(tmp.path(), NOW, &["today"]);
    assert_eq!(today, "[ ] t-1  Stretch  due 2024-02-29\n");
}

#[test]
fn removing_a_list_moves_its_tasks_to_unsorted() {
    let tmp = init();
    assert_eq!(
        tl(tmp.path(), NOW, &["list", "add", "Errands"]),
        "created list 1 (Errands)\n"
    );
    tl(tmp.path(), NOW, &["add", "Post office", "--list", "1"]);
    tl(tmp.path(), NOW, &["add", "Bank", "--list", "1"]);

    let out = tl(tmp.path(), NOW, &["list", "rm", "1"]);
    assert_eq!(out, "deleted list 1; moved 2 task(s) to unsorted\n");
    assert_eq!(
        tl(tmp.path(), NOW, &["ls", "unsorted"]),
        "[ ] t-1  Post office\n[ ] t-2  Bank\n"
    );
}

#[test]
fn reserved_lists_cannot_be_removed() {
    let tmp = init();
    let out = run(tmp.path(), NOW, &["list", "rm", "0"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("reserved"));
}

#[test]
fn empty_text_is_rejected_without_writing() {
    let tmp = init();
    let store = tmp.path().join(".taskline/store.json");
    let before = fs::read_to_string(&store).unwrap();

    let out = run(tmp.path(), NOW, &["add", "   "]);
    assert!(!out.status.success());
    assert_eq!(fs::read_to_string(&store).unwrap(), before);
}

#[test]
fn edit_clears_deadline() {
    let tmp = init();
    tl(tmp.path(), NOW, &["add", "Call mom", "--due", "2024-02-28"]);
    assert_eq!(tl(tmp.path(), NOW, &["missed"]).lines().count(), 1);

    assert_eq!(
        tl(tmp.path(), NOW, &["edit", "t-1", "--clear-deadline"]),
        "updated t-1\n"
    );
    assert_eq!(tl(tmp.path(), NOW, &["missed"]), "no tasks\n");
}

#[test]
fn json_output_for_completion() {
    let tmp = init();
    tl(
        tmp.path(),
        NOW,
        &["add", "Standup", "--due", "2024-03-01", "--repeat", "weekday"],
    );

    let out = tl(tmp.path(), NOW, &["--json", "done", "t-1"]);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["action"], "completed");
    assert_eq!(value["task"]["completed"], true);
    assert_eq!(value["task"]["list_id"], -1);
    // Friday rolls over the weekend
    assert_eq!(value["next"]["due"], "2024-03-04");
    assert_eq!(value["next"]["recurring"], "weekday");
}
