use crate::id::IdGenerator;
use crate::model::{Day, Task, Template, Week};
use crate::store::defaults::builtin_templates;

/// A complete value of the planner at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerState {
    pub weeks: Vec<Week>,
    pub templates: Vec<Template>,
    pub current_week_index: usize,
    /// Set while persisted state is being read; never persisted itself.
    pub is_loading: bool,
}

impl Default for PlannerState {
    fn default() -> Self {
        Self {
            weeks: Vec::new(),
            templates: builtin_templates(),
            current_week_index: 0,
            is_loading: false,
        }
    }
}

/// Result of a store mutation. Unknown ids produce `NoOp` rather than an
/// error, and a `NoOp` leaves the snapshot untouched.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    NoOp,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    pub(crate) fn applied_if(changed: bool) -> Self {
        if changed { Self::Applied } else { Self::NoOp }
    }
}

impl PlannerState {
    pub fn current_week(&self) -> Option<&Week> {
        self.weeks.get(self.current_week_index)
    }

    pub fn week(&self, week_id: &str) -> Option<&Week> {
        self.weeks.iter().find(|week| week.id == week_id)
    }

    /// First day with `day_id` across all weeks.
    pub fn find_day(&self, day_id: &str) -> Option<&Day> {
        self.weeks
            .iter()
            .flat_map(|week| week.days.iter())
            .find(|day| day.id == day_id)
    }

    pub fn find_task(&self, day_id: &str, task_id: &str) -> Option<&Task> {
        self.find_day(day_id)?
            .tasks
            .iter()
            .find(|task| task.id == task_id)
    }

    pub fn template(&self, template_id: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|template| template.id == template_id)
    }

    pub fn task_count(&self) -> usize {
        self.weeks.iter().map(Week::task_count).sum()
    }

    pub(crate) fn find_day_mut(&mut self, day_id: &str) -> Option<&mut Day> {
        self.weeks
            .iter_mut()
            .flat_map(|week| week.days.iter_mut())
            .find(|day| day.id == day_id)
    }

    pub(crate) fn find_task_mut(&mut self, day_id: &str, task_id: &str) -> Option<&mut Task> {
        self.find_day_mut(day_id)?
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
    }

    /// Whether `id` is already used by any task, subtask or template.
    pub(crate) fn contains_id(&self, id: &str) -> bool {
        let in_tasks = |tasks: &[Task]| {
            tasks.iter().any(|task| {
                task.id == id || task.subtasks.iter().any(|subtask| subtask.id == id)
            })
        };

        self.weeks
            .iter()
            .flat_map(|week| week.days.iter())
            .any(|day| in_tasks(&day.tasks))
            || self
                .templates
                .iter()
                .any(|template| template.id == id || in_tasks(&template.tasks))
    }

    /// Draws ids until one is unused in this snapshot.
    pub(crate) fn fresh_id(&self, ids: &mut IdGenerator, prefix: &str) -> String {
        loop {
            let id = ids.next_id(prefix);
            if !self.contains_id(&id) {
                return id;
            }
            log::warn!("event=id_collision module=store prefix={prefix}");
        }
    }

    /// Copies `tasks` with fresh ids for every task and subtask. Copies start
    /// open and collapsed whatever state the blueprint was saved in.
    pub(crate) fn clone_with_fresh_ids(&self, tasks: &[Task], ids: &mut IdGenerator) -> Vec<Task> {
        tasks
            .iter()
            .map(|task| {
                let mut copy = task.clone();
                copy.id = self.fresh_id(ids, "task");
                copy.completed = false;
                copy.expanded = false;
                for subtask in &mut copy.subtasks {
                    subtask.id = self.fresh_id(ids, "subtask");
                    subtask.completed = false;
                }
                copy
            })
            .collect()
    }
}
