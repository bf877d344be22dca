use crate::model::Task;
use serde::{Deserialize, Serialize};

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    /// Calendar date as `YYYY-MM-DD`.
    pub date: String,
    pub day_name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    pub id: String,
    pub start_date: String,
    /// Inclusive; always six days after `start_date`.
    pub end_date: String,
    pub days: Vec<Day>,
}

impl Week {
    pub fn day(&self, day_id: &str) -> Option<&Day> {
        self.days.iter().find(|day| day.id == day_id)
    }

    /// Looks a day up by its short weekday label, ignoring case.
    pub fn day_by_name(&self, name: &str) -> Option<&Day> {
        let wanted = name.trim();
        self.days
            .iter()
            .find(|day| day.day_name.eq_ignore_ascii_case(wanted))
    }

    pub fn task_count(&self) -> usize {
        self.days.iter().map(|day| day.tasks.len()).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|day| day.tasks.iter())
            .filter(|task| task.completed)
            .count()
    }
}
