use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("weekly-planner-{nanos}-{name}"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_planner"))
        .args(args)
        .env("WEEKLY_PLANNER_DATA_DIR", dir)
        .env_remove("WEEKLY_PLANNER_CONFIG_PATH")
        .output()
        .expect("failed to run planner")
}

fn read_store(dir: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(dir.join("weekly-planner-storage.json")).unwrap())
        .unwrap()
}

/// The current week's Monday, wherever it sits in the week.
fn monday_tasks(stored: &serde_json::Value) -> serde_json::Value {
    let index = stored["currentWeekIndex"].as_u64().unwrap() as usize;
    stored["weeks"][index]["days"]
        .as_array()
        .unwrap()
        .iter()
        .find(|day| day["dayName"] == "Mon")
        .map(|day| day["tasks"].clone())
        .unwrap()
}

#[test]
fn template_list_shows_builtin_templates() {
    let dir = temp_dir("template-list");
    let output = run(&dir, &["template", "list"]);
    std::fs::remove_dir_all(&dir).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("work-day"));
    assert!(stdout.contains("School Day"));
    assert!(stdout.contains("free-day"));
}

#[test]
fn template_show_prints_tasks_and_rejects_unknown() {
    let dir = temp_dir("template-show");
    let output = run(&dir, &["template", "show", "work-day", "--json"]);
    let missing = run(&dir, &["template", "show", "gym-day"]);
    std::fs::remove_dir_all(&dir).ok();

    let template: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(template["name"], "Work Day");
    assert_eq!(template["tasks"][0]["text"], "Meeting with manager");
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("unknown template gym-day"));
}

#[test]
fn template_apply_replace_then_merge() {
    let dir = temp_dir("template-apply");
    assert!(run(&dir, &["task", "add", "mon", "Existing"]).status.success());

    let replaced = run(&dir, &["template", "apply", "work-day", "mon", "--replace"]);
    assert!(replaced.status.success());
    let stored = read_store(&dir);
    let tasks = monday_tasks(&stored);
    let texts: Vec<&str> = tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["Meeting with manager", "Check emails", "Lunch break"]);
    assert_ne!(tasks[0]["id"], "work-meeting");
    assert_ne!(tasks[0]["subtasks"][0]["id"], "prep-notes");

    let merged = run(&dir, &["template", "apply", "free-day", "mon", "--merge"]);
    assert!(merged.status.success());
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    let free_day = stored["templates"]
        .as_array()
        .unwrap()
        .iter()
        .find(|template| template["id"] == "free-day")
        .unwrap()
        .clone();
    let tasks = monday_tasks(&stored);
    assert_eq!(
        tasks.as_array().unwrap().len(),
        3 + free_day["tasks"].as_array().unwrap().len()
    );
    assert_eq!(tasks[3]["text"], free_day["tasks"][0]["text"]);

    let work_day = &stored["templates"][0];
    assert_eq!(work_day["tasks"][0]["id"], "work-meeting");
}

#[test]
fn template_create_from_day_and_delete() {
    let dir = temp_dir("template-create");
    assert!(
        run(&dir, &["task", "add", "mon", "Squats", "-p", "high", "--subtask", "Warm up"])
            .status
            .success()
    );

    let output = run(
        &dir,
        &["template", "create", "Gym Day", "--icon", "💪", "--from-day", "mon", "--json"],
    );
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let template_id = payload["template"]["id"].as_str().unwrap().to_string();
    assert!(template_id.starts_with("template-"));
    assert_eq!(payload["template"]["name"], "Gym Day");

    let stored = read_store(&dir);
    let created = stored["templates"].as_array().unwrap().last().unwrap().clone();
    let source = monday_tasks(&stored);
    assert_eq!(created["tasks"][0]["text"], "Squats");
    assert_eq!(created["tasks"][0]["priority"], "high");
    assert_ne!(created["tasks"][0]["id"], source[0]["id"]);
    assert_ne!(
        created["tasks"][0]["subtasks"][0]["id"],
        source[0]["subtasks"][0]["id"]
    );

    let deleted = run(&dir, &["template", "delete", &template_id]);
    let again = run(&dir, &["template", "delete", &template_id]);
    let stored = read_store(&dir);
    std::fs::remove_dir_all(&dir).ok();

    assert!(deleted.status.success());
    assert!(String::from_utf8_lossy(&again.stdout).contains("Nothing changed"));
    assert_eq!(stored["templates"].as_array().unwrap().len(), 3);
}
