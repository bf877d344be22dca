use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const DATES: [(&str, &str); 7] = [
    ("2025-01-05", "Sun"),
    ("2025-01-06", "Mon"),
    ("2025-01-07", "Tue"),
    ("2025-01-08", "Wed"),
    ("2025-01-09", "Thu"),
    ("2025-01-10", "Fri"),
    ("2025-01-11", "Sat"),
];

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("weekly-planner-{nanos}-{name}"))
}

fn task(id: &str, text: &str, subtasks: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "text": text,
        "priority": "medium",
        "completed": false,
        "subtasks": subtasks,
        "expanded": false,
    })
}

/// One week of Jan 5 - 11, 2025 with `monday` as Monday's tasks.
fn write_store(dir: &Path, monday: serde_json::Value) {
    let days: Vec<serde_json::Value> = DATES
        .iter()
        .enumerate()
        .map(|(offset, (date, name))| {
            let tasks = if *name == "Mon" {
                monday.clone()
            } else {
                serde_json::json!([])
            };
            serde_json::json!({
                "id": format!("day-{offset}-{date}"),
                "date": date,
                "dayName": name,
                "tasks": tasks,
            })
        })
        .collect();
    let content = serde_json::json!({
        "schemaVersion": 1,
        "weeks": [{
            "id": "week-2025-01-05",
            "startDate": "2025-01-05",
            "endDate": "2025-01-11",
            "days": days,
        }],
        "templates": [],
        "currentWeekIndex": 0,
    });
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("weekly-planner-storage.json"),
        serde_json::to_string_pretty(&content).unwrap(),
    )
    .unwrap();
}

fn three_tasks() -> serde_json::Value {
    serde_json::json!([
        task("task-a", "Alpha", serde_json::json!([])),
        task(
            "task-b",
            "Bravo",
            serde_json::json!([{ "id": "subtask-b1", "text": "Warm up", "completed": false }]),
        ),
        task("task-c", "Charlie", serde_json::json!([])),
    ])
}

fn read_store(dir: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(dir.join("weekly-planner-storage.json")).unwrap())
        .unwrap()
}

fn monday(stored: &serde_json::Value) -> &serde_json::Value {
    &stored["weeks"][0]["days"][1]["tasks"]
}

fn texts(tasks: &serde_json::Value) -> Vec<String> {
    tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["text"].as_str().unwrap().to_string())
        .collect()
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_planner"))
        .args(args)
        .env("WEEKLY_PLANNER_DATA_DIR", dir)
        .env_remove("WEEKLY_PLANNER_CONFIG_PATH")
        .output()
        .expect("failed to run planner")
}

#[test]
fn task_add_assigns_ids_to_task_and_subtasks() {
    let dir = temp_dir("task-add");
    write_store(&dir, serde_json::json!([]));

    let output = run(
        &dir,
        &[
            "task", "add", "mon", "Groceries", "-p", "nutrition", "--subtask", "Milk",
            "--subtask", "Eggs",
        ],
    );
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Added task: Groceries (task-"));

    let added = &monday(&stored)[0];
    assert_eq!(added["text"], "Groceries");
    assert_eq!(added["priority"], "nutrition");
    assert_eq!(added["completed"], false);
    assert_eq!(added["expanded"], false);
    assert!(added["id"].as_str().unwrap().starts_with("task-"));
    let subtasks = added["subtasks"].as_array().unwrap();
    assert_eq!(subtasks.len(), 2);
    assert!(subtasks[0]["id"].as_str().unwrap().starts_with("subtask-"));
    assert_ne!(subtasks[0]["id"], subtasks[1]["id"]);
}

#[test]
fn task_add_json_returns_updated_day() {
    let dir = temp_dir("task-add-json");
    write_store(&dir, serde_json::json!([]));

    let output = run(&dir, &["task", "add", "day-2-2025-01-07", "Run", "--json"]);
    std::fs::remove_dir_all(&dir).ok();

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["status"], "applied");
    assert_eq!(payload["day"]["id"], "day-2-2025-01-07");
    assert_eq!(payload["day"]["tasks"][0]["text"], "Run");
}

#[test]
fn task_done_toggles_by_position_and_id() {
    let dir = temp_dir("task-done");
    write_store(&dir, three_tasks());

    let output = run(&dir, &["task", "done", "mon", "2"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Completed task: Bravo"));
    assert_eq!(monday(&read_store(&dir))[1]["completed"], true);

    let reopened = run(&dir, &["task", "done", "mon", "task-b"]);
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(String::from_utf8_lossy(&reopened.stdout).contains("Reopened task: Bravo"));
    assert_eq!(monday(&stored)[1]["completed"], false);
}

#[test]
fn task_edit_changes_text_and_priority() {
    let dir = temp_dir("task-edit");
    write_store(&dir, three_tasks());

    let output = run(
        &dir,
        &["task", "edit", "mon", "task-a", "--text", "Alpha two", "--priority", "highest"],
    );
    let unchanged = run(&dir, &["task", "edit", "mon", "task-a", "--text", "Alpha two"]);
    let empty = run(&dir, &["task", "edit", "mon", "task-a"]);
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    assert_eq!(monday(&stored)[0]["text"], "Alpha two");
    assert_eq!(monday(&stored)[0]["priority"], "highest");
    assert!(String::from_utf8_lossy(&unchanged.stdout).contains("Nothing changed"));
    assert_eq!(empty.status.code(), Some(1));
}

#[test]
fn task_delete_removes_only_that_task() {
    let dir = temp_dir("task-delete");
    write_store(&dir, three_tasks());

    let output = run(&dir, &["task", "delete", "mon", "task-b"]);
    let missing = run(&dir, &["task", "delete", "mon", "task-b"]);
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    assert_eq!(texts(monday(&stored)), ["Alpha", "Charlie"]);
    assert!(String::from_utf8_lossy(&missing.stdout).contains("Nothing changed"));
}

#[test]
fn task_move_within_day_uses_pre_removal_indices() {
    let dir = temp_dir("task-move-same");
    write_store(&dir, three_tasks());

    let output = run(&dir, &["task", "move", "mon", "1", "mon", "3"]);
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    assert_eq!(texts(monday(&stored)), ["Bravo", "Alpha", "Charlie"]);
}

#[test]
fn task_move_to_other_day_keeps_identity() {
    let dir = temp_dir("task-move-other");
    write_store(&dir, three_tasks());

    let output = run(&dir, &["task", "move", "mon", "2", "wed", "10"]);
    let out_of_range = run(&dir, &["task", "move", "mon", "8", "wed", "1"]);
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    assert_eq!(texts(monday(&stored)), ["Alpha", "Charlie"]);
    let wednesday = &stored["weeks"][0]["days"][3]["tasks"];
    assert_eq!(wednesday[0]["id"], "task-b");
    assert_eq!(wednesday[0]["subtasks"][0]["id"], "subtask-b1");
    assert!(String::from_utf8_lossy(&out_of_range.stdout).contains("Nothing changed"));
}

#[test]
fn task_move_rejects_position_zero() {
    let dir = temp_dir("task-move-zero");
    write_store(&dir, three_tasks());

    let output = run(&dir, &["task", "move", "mon", "0", "wed", "1"]);
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("source position starts at 1"));
    assert_eq!(texts(monday(&stored)), ["Alpha", "Bravo", "Charlie"]);
}

#[test]
fn subtask_commands_add_toggle_and_remove() {
    let dir = temp_dir("subtask");
    write_store(&dir, three_tasks());

    assert!(run(&dir, &["subtask", "add", "mon", "task-b", "Stretch"]).status.success());
    assert!(run(&dir, &["subtask", "toggle", "mon", "task-b", "subtask-b1"]).status.success());
    assert!(run(&dir, &["task", "expand", "mon", "task-b"]).status.success());

    let stored = read_store(&dir);
    let bravo = &monday(&stored)[1];
    assert_eq!(bravo["expanded"], true);
    assert_eq!(bravo["subtasks"][0]["completed"], true);
    assert_eq!(bravo["subtasks"][1]["text"], "Stretch");
    assert_eq!(bravo["subtasks"][1]["completed"], false);

    let shown = run(&dir, &["week", "show"]);
    assert!(String::from_utf8_lossy(&shown.stdout).contains("Stretch"));

    assert!(run(&dir, &["subtask", "remove", "mon", "task-b", "1"]).status.success());
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    let subtasks = monday(&stored)[1]["subtasks"].as_array().unwrap().clone();
    assert_eq!(subtasks.len(), 1);
    assert_eq!(subtasks[0]["text"], "Stretch");
}
