use clap::{ArgGroup, Parser, Subcommand};
use planner_core::model::Priority;

#[derive(Parser, Debug)]
#[command(name = "planner", author, version, about = "Plan your week: days, tasks and templates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show and navigate weeks
    ///
    /// Example: planner week show
    Week {
        #[command(subcommand)]
        week: WeekCommand,
    },
    /// Add, edit and move tasks
    ///
    /// Example: planner task add mon "Gym" --priority highest
    Task {
        #[command(subcommand)]
        task: TaskCommand,
    },
    /// Manage the subtasks of a task
    ///
    /// Example: planner subtask add mon 1 "Stretch"
    Subtask {
        #[command(subcommand)]
        subtask: SubtaskCommand,
    },
    /// List, create and apply day templates
    ///
    /// Example: planner template apply work-day mon --merge
    Template {
        #[command(subcommand)]
        template: TemplateCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum WeekCommand {
    /// Show the current week
    Show,
    /// Go to the next week, creating it if needed
    Next,
    /// Go to the previous week
    Prev,
    /// List all weeks
    List,
    /// Jump to a week by its position in `week list`
    ///
    /// Example: planner week goto 0
    Goto { index: usize },
    /// Delete a week
    ///
    /// Example: planner week delete week-2025-01-05
    Delete { week_id: String },
}

/// `<DAY>` is a day id or a weekday name (`mon`) in the current week.
/// `<TASK>` is a task id or the task's 1-based position on that day.
#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Add a task to a day
    ///
    /// Example: planner task add tue "Groceries" -p nutrition --subtask Milk
    Add {
        day: String,
        text: String,
        #[arg(short, long, default_value = "medium", value_parser = parse_priority)]
        priority: Priority,
        #[arg(long = "subtask", value_name = "TEXT")]
        subtasks: Vec<String>,
    },
    /// Change a task's text or priority
    ///
    /// Example: planner task edit tue 1 --text "Weekly groceries"
    Edit {
        day: String,
        task: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<Priority>,
    },
    /// Toggle a task's completion
    Done { day: String, task: String },
    /// Toggle whether a task's subtasks are shown
    Expand { day: String, task: String },
    /// Delete a task
    Delete { day: String, task: String },
    /// Move a task to a position on the same or another day
    ///
    /// Positions are 1-based. Example: planner task move mon 1 wed 3
    Move {
        source_day: String,
        source_position: usize,
        target_day: String,
        target_position: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    /// Add a subtask
    Add {
        day: String,
        task: String,
        text: String,
    },
    /// Toggle a subtask's completion
    Toggle {
        day: String,
        task: String,
        subtask: String,
    },
    /// Remove a subtask
    Remove {
        day: String,
        task: String,
        subtask: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// List templates
    List,
    /// Show a template's tasks
    Show { template: String },
    /// Apply a template to a day
    ///
    /// Example: planner template apply school-day wed --replace
    #[command(group(ArgGroup::new("mode").required(true).args(["replace", "merge"])))]
    Apply {
        template: String,
        day: String,
        /// Replace the day's tasks
        #[arg(long)]
        replace: bool,
        /// Append after the day's tasks
        #[arg(long)]
        merge: bool,
    },
    /// Save a day's tasks as a new template
    ///
    /// Example: planner template create "Gym Day" --icon 💪 --from-day mon
    Create {
        name: String,
        #[arg(long, default_value = "📋")]
        icon: String,
        #[arg(long = "from-day", value_name = "DAY")]
        from_day: String,
    },
    /// Delete a template
    Delete { template: String },
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    raw.parse::<Priority>()
        .map_err(|err| err.message().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    WeekStart,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;
    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "week_start" | "week_starts_on" => ConfigOverrideTarget::WeekStart,
        "log_level" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride {
        target,
        value: value_raw.trim().to_string(),
    })
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
