use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub priority: Priority,
    pub completed: bool,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub expanded: bool,
}

/// Task category shown next to each task.
///
/// The four labels are fixed and carry no ordering: `Highest` is the
/// emergency label and `Nutrition` marks meals, neither outranks the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Highest,
    Nutrition,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::High,
        Priority::Medium,
        Priority::Highest,
        Priority::Nutrition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Highest => "highest",
            Self::Nutrition => "nutrition",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High Priority",
            Self::Medium => "Medium Priority",
            Self::Highest => "Emergency/Highest",
            Self::Nutrition => "Nutrition",
        }
    }

    /// Hex display color used by graphical renderers.
    pub fn color(self) -> &'static str {
        match self {
            Self::High => "#FF6B6B",
            Self::Medium => "#FFD93D",
            Self::Highest => "#4ECDC4",
            Self::Nutrition => "#6C5CE7",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::High => "🔴",
            Self::Medium => "🟡",
            Self::Highest => "🟢",
            Self::Nutrition => "🔵",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                AppError::invalid_input(format!(
                    "unknown priority '{trimmed}' (expected high, medium, highest or nutrition)"
                ))
            })
    }
}

/// A subtask that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskDraft {
    pub text: String,
    pub completed: bool,
}

impl SubtaskDraft {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }
}

/// A task that has not been assigned an id yet; the store assigns ids to the
/// task and each of its subtasks when it is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub priority: Priority,
    pub completed: bool,
    pub expanded: bool,
    pub subtasks: Vec<SubtaskDraft>,
}

impl TaskDraft {
    pub fn new<T: Into<String>>(text: T, priority: Priority) -> Self {
        Self {
            text: text.into(),
            priority,
            completed: false,
            expanded: false,
            subtasks: Vec::new(),
        }
    }

    pub fn with_subtask<T: Into<String>>(mut self, text: T) -> Self {
        self.subtasks.push(SubtaskDraft::new(text));
        self
    }

    pub(crate) fn into_task(
        self,
        task_id: String,
        mut subtask_id: impl FnMut() -> String,
    ) -> Task {
        Task {
            id: task_id,
            text: self.text,
            priority: self.priority,
            completed: self.completed,
            subtasks: self
                .subtasks
                .into_iter()
                .map(|draft| Subtask {
                    id: subtask_id(),
                    text: draft.text,
                    completed: draft.completed,
                })
                .collect(),
            expanded: self.expanded,
        }
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            priority: task.priority,
            completed: task.completed,
            expanded: task.expanded,
            subtasks: task
                .subtasks
                .iter()
                .map(|subtask| SubtaskDraft {
                    text: subtask.text.clone(),
                    completed: subtask.completed,
                })
                .collect(),
        }
    }
}

/// One field change applied by `PlannerStore::update_task`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    SetText(String),
    SetPriority(Priority),
    SetCompleted(bool),
    SetExpanded(bool),
    AddSubtask(String),
    RemoveSubtask(String),
}
