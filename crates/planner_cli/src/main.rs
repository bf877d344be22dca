use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::{info, warn};
use planner_cli::cli::{
    Cli, Command, ConfigOverrideTarget, SubtaskCommand, TaskCommand, TemplateCommand, WeekCommand,
    parse_config_override,
};
use planner_core::calendar::{WeekStart, format_week_range, today_local};
use planner_core::config::{
    Config, ConfigOverrides, Palette, load_config_with_fallback, merge_overrides,
    palette_for_theme,
};
use planner_core::error::AppError;
use planner_core::model::{Day, Task, TaskDraft, TaskUpdate, Template, TemplateApplication, Week};
use planner_core::storage::JsonFileBackend;
use planner_core::storage::json_store::data_dir;
use planner_core::{Outcome, PlannerStore};
use std::io::{self, BufRead};
use std::sync::Arc;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const LOG_DIR_NAME: &str = "logs";

/// Everything a command needs: the open store and the config before
/// per-command overrides.
struct Session {
    store: PlannerStore,
    config: Config,
}

impl Session {
    fn open(config: Config) -> Result<Self, AppError> {
        let backend = JsonFileBackend::from_env()?;
        info!(
            "event=store_open module=cli status=start dir={}",
            backend.dir().display()
        );
        let store = PlannerStore::open(Arc::new(backend))?;
        Ok(Self { store, config })
    }

    fn current_week(&self) -> Result<&Week, AppError> {
        self.store
            .current_week()
            .ok_or_else(|| AppError::invalid_data("planner has no current week"))
    }

    /// A weekday name (`mon`) resolves against the current week; anything
    /// else is taken as a day id.
    fn resolve_day(&self, day: &str) -> String {
        self.store
            .current_week()
            .and_then(|week| week.day_by_name(day))
            .map_or_else(|| day.to_string(), |found| found.id.clone())
    }

    /// A 1-based position resolves against the day's tasks; anything else
    /// is taken as a task id.
    fn resolve_task(&self, day_id: &str, task: &str) -> String {
        if let Ok(position) = task.parse::<usize>()
            && let Some(found) = self
                .store
                .state()
                .find_day(day_id)
                .and_then(|day| day.tasks.get(position.wrapping_sub(1)))
        {
            return found.id.clone();
        }
        task.to_string()
    }

    fn resolve_subtask(&self, day_id: &str, task_id: &str, subtask: &str) -> String {
        if let Ok(position) = subtask.parse::<usize>()
            && let Some(found) = self
                .store
                .state()
                .find_task(day_id, task_id)
                .and_then(|task| task.subtasks.get(position.wrapping_sub(1)))
        {
            return found.id.clone();
        }
        subtask.to_string()
    }
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Week")]
    id: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Done")]
    done: String,
    #[tabled(rename = "Current")]
    current: &'static str,
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Icon")]
    icon: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Tasks")]
    tasks: usize,
}

fn outcome_label(outcome: Outcome) -> &'static str {
    if outcome.is_applied() {
        "applied"
    } else {
        "noop"
    }
}

fn print_outcome(outcome: Outcome, message: &str, json: bool) {
    if json {
        let payload = serde_json::json!({
            "status": outcome_label(outcome),
            "message": message,
        });
        println!("{payload}");
    } else if outcome.is_applied() {
        println!("{message}");
    } else {
        println!("Nothing changed");
    }
}

fn print_day_outcome(
    session: &Session,
    outcome: Outcome,
    day_id: &str,
    message: &str,
    json: bool,
) {
    if json {
        let payload = serde_json::json!({
            "status": outcome_label(outcome),
            "message": message,
            "day": session.store.state().find_day(day_id),
        });
        println!("{payload}");
    } else {
        print_outcome(outcome, message, false);
    }
}

fn progress(done: usize, total: usize) -> String {
    format!("{done}/{total}")
}

fn print_task_line(position: usize, task: &Task, palette: &Palette) {
    let check = if task.completed { "[x]" } else { "[ ]" };
    let text = if task.completed {
        palette.mutedize(&task.text)
    } else {
        task.text.clone()
    };
    let subtasks = if task.subtasks.is_empty() {
        String::new()
    } else {
        let done = task.subtasks.iter().filter(|s| s.completed).count();
        let marker = if task.expanded { "-" } else { "+" };
        format!(" {marker}{}", progress(done, task.subtasks.len()))
    };
    println!(
        "  {}. {} {} {}{} {}",
        position,
        check,
        task.priority.icon(),
        text,
        subtasks,
        palette.mutedize(&task.id)
    );

    if task.expanded {
        for (index, subtask) in task.subtasks.iter().enumerate() {
            let check = if subtask.completed { "[x]" } else { "[ ]" };
            println!(
                "       {}. {} {} {}",
                index + 1,
                check,
                subtask.text,
                palette.mutedize(&subtask.id)
            );
        }
    }
}

fn print_day_plain(day: &Day, palette: &Palette) {
    println!(
        "{} {} {}",
        palette.accentize(&day.day_name),
        day.date,
        palette.mutedize(&day.id)
    );
    if day.tasks.is_empty() {
        println!("  {}", palette.mutedize("(no tasks)"));
    }
    for (index, task) in day.tasks.iter().enumerate() {
        print_task_line(index + 1, task, palette);
    }
}

fn print_week(session: &Session, palette: &Palette, json: bool) -> Result<(), AppError> {
    let state = session.store.state();
    let week = session.current_week()?;
    let range = format_week_range(&week.start_date, &week.end_date)?;

    if json {
        let payload = serde_json::json!({
            "index": state.current_week_index,
            "range": range,
            "week": week,
        });
        println!("{payload}");
        return Ok(());
    }

    println!(
        "{} ({}/{}) {}",
        palette.accentize(&range),
        state.current_week_index + 1,
        state.weeks.len(),
        palette.mutedize(&progress(week.completed_count(), week.task_count()))
    );
    for day in &week.days {
        print_day_plain(day, palette);
    }
    Ok(())
}

fn print_weeks(session: &Session, json: bool) -> Result<(), AppError> {
    let state = session.store.state();

    if json {
        let mut payload = Vec::with_capacity(state.weeks.len());
        for (index, week) in state.weeks.iter().enumerate() {
            payload.push(serde_json::json!({
                "index": index,
                "id": week.id,
                "range": format_week_range(&week.start_date, &week.end_date)?,
                "taskCount": week.task_count(),
                "completedCount": week.completed_count(),
                "current": index == state.current_week_index,
            }));
        }
        println!("{}", serde_json::Value::Array(payload));
        return Ok(());
    }

    let mut rows = Vec::with_capacity(state.weeks.len());
    for (index, week) in state.weeks.iter().enumerate() {
        rows.push(WeekRow {
            index,
            id: week.id.clone(),
            range: format_week_range(&week.start_date, &week.end_date)?,
            done: progress(week.completed_count(), week.task_count()),
            current: if index == state.current_week_index {
                "*"
            } else {
                ""
            },
        });
    }
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
    Ok(())
}

fn print_templates(templates: &[Template], json: bool) {
    if json {
        let payload: Vec<_> = templates
            .iter()
            .map(|template| {
                serde_json::json!({
                    "id": template.id,
                    "name": template.name,
                    "icon": template.icon,
                    "taskCount": template.tasks.len(),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(payload));
        return;
    }

    let rows = templates.iter().map(|template| TemplateRow {
        id: template.id.clone(),
        icon: template.icon.clone(),
        name: template.name.clone(),
        tasks: template.tasks.len(),
    });
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn print_template(template: &Template, palette: &Palette, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string(template)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        template.icon,
        palette.accentize(&template.name),
        palette.mutedize(&template.id)
    );
    for (index, task) in template.tasks.iter().enumerate() {
        print_task_line(index + 1, task, palette);
    }
    Ok(())
}

fn overrides_from_args(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::WeekStart => {
                overrides.week_start = Some(WeekStart::parse(&parsed.value)?)
            }
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn required_text(text: &str, what: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{what} is required")));
    }
    Ok(trimmed.to_string())
}

/// Positions on the command line count from 1.
fn zero_based(position: usize, what: &str) -> Result<usize, AppError> {
    position
        .checked_sub(1)
        .ok_or_else(|| AppError::invalid_input(format!("{what} starts at 1")))
}

fn run_week(
    session: &mut Session,
    week: WeekCommand,
    palette: &Palette,
    json: bool,
) -> Result<(), AppError> {
    match week {
        WeekCommand::Show => print_week(session, palette, json)?,
        WeekCommand::List => print_weeks(session, json)?,
        WeekCommand::Next => {
            let outcome = session.store.next_week()?;
            if outcome.is_applied() {
                print_week(session, palette, json)?;
            } else {
                print_outcome(outcome, "", json);
            }
        }
        WeekCommand::Prev => {
            let outcome = session.store.previous_week();
            if outcome.is_applied() {
                print_week(session, palette, json)?;
            } else {
                print_outcome(outcome, "", json);
            }
        }
        WeekCommand::Goto { index } => {
            let outcome = session.store.set_current_week(index);
            if outcome.is_applied() {
                print_week(session, palette, json)?;
            } else {
                print_outcome(outcome, "", json);
            }
        }
        WeekCommand::Delete { week_id } => {
            let outcome = session.store.delete_week(&week_id);
            print_outcome(outcome, &format!("Deleted week: {week_id}"), json);
        }
    }
    Ok(())
}

fn run_task(session: &mut Session, task: TaskCommand, json: bool) -> Result<(), AppError> {
    match task {
        TaskCommand::Add {
            day,
            text,
            priority,
            subtasks,
        } => {
            let text = required_text(&text, "task text")?;
            let day_id = session.resolve_day(&day);
            let mut draft = TaskDraft::new(text.clone(), priority);
            for subtask in subtasks {
                draft = draft.with_subtask(required_text(&subtask, "subtask text")?);
            }

            match session.store.add_task(&day_id, draft) {
                Some(task_id) => print_day_outcome(
                    session,
                    Outcome::Applied,
                    &day_id,
                    &format!("Added task: {text} ({task_id})"),
                    json,
                ),
                None => print_outcome(Outcome::NoOp, "", json),
            }
        }
        TaskCommand::Edit {
            day,
            task,
            text,
            priority,
        } => {
            let day_id = session.resolve_day(&day);
            let task_id = session.resolve_task(&day_id, &task);
            let mut updates = Vec::new();
            if let Some(text) = text {
                updates.push(TaskUpdate::SetText(required_text(&text, "task text")?));
            }
            if let Some(priority) = priority {
                updates.push(TaskUpdate::SetPriority(priority));
            }
            if updates.is_empty() {
                return Err(AppError::invalid_input(
                    "nothing to edit; pass --text or --priority",
                ));
            }

            let outcome = session.store.update_task(&day_id, &task_id, &updates);
            print_day_outcome(
                session,
                outcome,
                &day_id,
                &format!("Updated task: {task_id}"),
                json,
            );
        }
        TaskCommand::Done { day, task } => {
            let day_id = session.resolve_day(&day);
            let task_id = session.resolve_task(&day_id, &task);
            let outcome = session.store.toggle_task_completion(&day_id, &task_id);
            let message = match session.store.state().find_task(&day_id, &task_id) {
                Some(found) if found.completed => format!("Completed task: {}", found.text),
                Some(found) => format!("Reopened task: {}", found.text),
                None => String::new(),
            };
            print_day_outcome(session, outcome, &day_id, &message, json);
        }
        TaskCommand::Expand { day, task } => {
            let day_id = session.resolve_day(&day);
            let task_id = session.resolve_task(&day_id, &task);
            let outcome = session.store.toggle_task_expansion(&day_id, &task_id);
            print_day_outcome(
                session,
                outcome,
                &day_id,
                &format!("Toggled subtasks of {task_id}"),
                json,
            );
        }
        TaskCommand::Delete { day, task } => {
            let day_id = session.resolve_day(&day);
            let task_id = session.resolve_task(&day_id, &task);
            let outcome = session.store.delete_task(&day_id, &task_id);
            print_day_outcome(
                session,
                outcome,
                &day_id,
                &format!("Deleted task: {task_id}"),
                json,
            );
        }
        TaskCommand::Move {
            source_day,
            source_position,
            target_day,
            target_position,
        } => {
            let source_index = zero_based(source_position, "source position")?;
            let target_index = zero_based(target_position, "target position")?;
            let source_day_id = session.resolve_day(&source_day);
            let target_day_id = session.resolve_day(&target_day);
            let outcome =
                session
                    .store
                    .move_task(&source_day_id, source_index, &target_day_id, target_index);
            print_day_outcome(
                session,
                outcome,
                &target_day_id,
                &format!("Moved task to {target_day_id} at position {target_position}"),
                json,
            );
        }
    }
    Ok(())
}

fn run_subtask(
    session: &mut Session,
    subtask: SubtaskCommand,
    json: bool,
) -> Result<(), AppError> {
    match subtask {
        SubtaskCommand::Add { day, task, text } => {
            let text = required_text(&text, "subtask text")?;
            let day_id = session.resolve_day(&day);
            let task_id = session.resolve_task(&day_id, &task);
            let outcome =
                session
                    .store
                    .update_task(&day_id, &task_id, &[TaskUpdate::AddSubtask(text.clone())]);
            print_day_outcome(
                session,
                outcome,
                &day_id,
                &format!("Added subtask: {text}"),
                json,
            );
        }
        SubtaskCommand::Toggle { day, task, subtask } => {
            let day_id = session.resolve_day(&day);
            let task_id = session.resolve_task(&day_id, &task);
            let subtask_id = session.resolve_subtask(&day_id, &task_id, &subtask);
            let outcome = session
                .store
                .toggle_subtask_completion(&day_id, &task_id, &subtask_id);
            print_day_outcome(
                session,
                outcome,
                &day_id,
                &format!("Toggled subtask: {subtask_id}"),
                json,
            );
        }
        SubtaskCommand::Remove { day, task, subtask } => {
            let day_id = session.resolve_day(&day);
            let task_id = session.resolve_task(&day_id, &task);
            let subtask_id = session.resolve_subtask(&day_id, &task_id, &subtask);
            let outcome = session.store.update_task(
                &day_id,
                &task_id,
                &[TaskUpdate::RemoveSubtask(subtask_id.clone())],
            );
            print_day_outcome(
                session,
                outcome,
                &day_id,
                &format!("Removed subtask: {subtask_id}"),
                json,
            );
        }
    }
    Ok(())
}

fn run_template(
    session: &mut Session,
    template: TemplateCommand,
    palette: &Palette,
    json: bool,
) -> Result<(), AppError> {
    match template {
        TemplateCommand::List => print_templates(&session.store.state().templates, json),
        TemplateCommand::Show { template } => {
            let found = session
                .store
                .state()
                .template(&template)
                .ok_or_else(|| AppError::invalid_input(format!("unknown template {template}")))?;
            print_template(found, palette, json)?;
        }
        TemplateCommand::Apply {
            template,
            day,
            replace,
            merge,
        } => {
            let day_id = session.resolve_day(&day);
            let options = TemplateApplication {
                replace_existing: replace,
                merge_with_existing: merge,
            };
            let outcome = session.store.apply_template(&template, &day_id, options);
            print_day_outcome(
                session,
                outcome,
                &day_id,
                &format!("Applied template {template} to {day_id}"),
                json,
            );
        }
        TemplateCommand::Create {
            name,
            icon,
            from_day,
        } => {
            let name = required_text(&name, "template name")?;
            let day_id = session.resolve_day(&from_day);
            let drafts: Vec<TaskDraft> = session
                .store
                .state()
                .find_day(&day_id)
                .ok_or_else(|| AppError::invalid_input(format!("unknown day {from_day}")))?
                .tasks
                .iter()
                .map(TaskDraft::from)
                .collect();

            let template_id = session.store.create_template(&name, &icon, drafts);
            if json {
                let created = session.store.state().template(&template_id);
                println!(
                    "{}",
                    serde_json::json!({ "status": "applied", "template": created })
                );
            } else {
                println!("Created template: {name} ({template_id})");
            }
        }
        TemplateCommand::Delete { template } => {
            let outcome = session.store.delete_template(&template);
            print_outcome(outcome, &format!("Deleted template: {template}"), json);
        }
    }
    Ok(())
}

fn run_command(session: &mut Session, cli: Cli) -> Result<(), AppError> {
    let overrides = overrides_from_args(&cli.config_override)?;
    let config = merge_overrides(&session.config, &overrides);
    let palette = palette_for_theme(config.theme.as_deref());

    session
        .store
        .ensure_current_week(today_local(), config.week_start)?;

    match cli.command {
        Command::Week { week } => run_week(session, week, &palette, cli.json),
        Command::Task { task } => run_task(session, task, cli.json),
        Command::Subtask { subtask } => run_subtask(session, subtask, cli.json),
        Command::Template { template } => run_template(session, template, &palette, cli.json),
    }
}

/// `Ok(None)` when clap already handled the request (help or version).
fn parse_cli<I, T>(argv: I) -> Result<Option<Cli>, AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(argv) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            Ok(None)
        }
        Err(err) => Err(normalize_parse_error(err)),
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_interactive(session: &mut Session) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock.read_line(&mut input)?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("planner".to_string());
        argv.extend(args);

        let cli = match parse_cli(argv) {
            Ok(Some(cli)) => cli,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if let Err(err) = run_command(session, cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn start_logging(config: &Config) {
    let log_dir = match data_dir() {
        Ok(dir) => dir.join(LOG_DIR_NAME),
        Err(err) => {
            eprintln!("WARNING: logging disabled: {err}");
            return;
        }
    };
    if let Err(err) = planner_core::logging::init_logging(config.log_level(), &log_dir) {
        eprintln!("WARNING: logging disabled: {err}");
    }
}

fn run() -> Result<(), AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error.as_ref() {
        eprintln!("WARNING: using default config: {err}");
    }

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        start_logging(&loaded.config);
        if let Some(err) = loaded.error {
            warn!("event=config_load module=cli status=fallback error={err}");
        }
        let mut session = Session::open(loaded.config)?;
        run_interactive(&mut session)?;
        session.store.flush();
        return Ok(());
    }

    let Some(cli) = parse_cli(std::env::args_os())? else {
        return Ok(());
    };
    let overrides = overrides_from_args(&cli.config_override)?;
    start_logging(&merge_overrides(&loaded.config, &overrides));
    if let Some(err) = loaded.error {
        warn!("event=config_load module=cli status=fallback error={err}");
    }

    let mut session = Session::open(loaded.config)?;
    let result = run_command(&mut session, cli);
    session.store.flush();
    result
}

fn main() {
    if let Err(err) = run() {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{overrides_from_args, required_text, split_command_line, zero_based};
    use planner_core::calendar::WeekStart;

    #[test]
    fn split_command_line_honours_quotes() {
        let args = split_command_line(r#"task add mon "Buy \"fresh\" bread" -p high"#).unwrap();
        assert_eq!(
            args,
            ["task", "add", "mon", "Buy \"fresh\" bread", "-p", "high"]
        );
    }

    #[test]
    fn split_command_line_rejects_open_quote() {
        let err = split_command_line("task add mon \"oops").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn overrides_parse_week_start_and_theme() {
        let overrides = overrides_from_args(&[
            "week_start=monday".to_string(),
            "theme=dark".to_string(),
        ])
        .unwrap();

        assert_eq!(overrides.week_start, Some(WeekStart::Monday));
        assert_eq!(overrides.theme.as_deref(), Some("dark"));
        assert!(overrides_from_args(&["week_start=friday".to_string()]).is_err());
    }

    #[test]
    fn zero_based_shifts_positions_and_rejects_zero() {
        assert_eq!(zero_based(1, "source position").unwrap(), 0);
        assert_eq!(zero_based(3, "target position").unwrap(), 2);
        assert_eq!(
            zero_based(0, "source position").unwrap_err().to_string(),
            "invalid_input - source position starts at 1"
        );
    }

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("  Gym ", "task text").unwrap(), "Gym");
        assert_eq!(
            required_text("   ", "task text").unwrap_err().to_string(),
            "invalid_input - task text is required"
        );
    }
}
