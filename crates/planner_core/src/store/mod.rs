//! The planner store: owner of weeks, days, tasks and templates.
//!
//! # Invariants
//! - Every mutation builds the next snapshot from a copy of the current one
//!   and swaps it in only when something changed. Snapshots handed out by
//!   [`PlannerStore::snapshot`] are never modified afterwards.
//! - Unknown ids never raise; they yield [`Outcome::NoOp`] and leave the
//!   snapshot pointer unchanged.
//! - Task and subtask ids are unique across the whole store, so a task is
//!   addressed by `(day_id, task_id)` without naming its week.
//! - Every applied mutation other than `set_loading` queues a write on the
//!   persister; a failed write is logged and leaves memory untouched.

mod defaults;
mod state;

use crate::calendar::{WeekStart, current_week_start, generate_week, next_week_start};
use crate::error::AppError;
use crate::id::IdGenerator;
use crate::model::{
    DAYS_PER_WEEK, Subtask, Task, TaskDraft, TaskUpdate, Template, TemplateApplication, Week,
};
use crate::storage::json_store::{STORE_KEY, decode_state};
use crate::storage::{Persister, StorageBackend};
use log::{debug, info, warn};
use std::sync::Arc;
use time::Date;

pub use defaults::builtin_templates;
pub use state::{Outcome, PlannerState};

pub struct PlannerStore {
    state: Arc<PlannerState>,
    ids: IdGenerator,
    persister: Option<Persister>,
}

impl Default for PlannerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerStore {
    /// A store with the initial snapshot and no persistence.
    pub fn new() -> Self {
        Self::with_state(PlannerState::default())
    }

    pub fn with_state(state: PlannerState) -> Self {
        Self {
            state: Arc::new(state),
            ids: IdGenerator::new(),
            persister: None,
        }
    }

    /// Rehydrates from `backend` and persists every later change to it.
    ///
    /// Returns once the stored snapshot has been read; unreadable or invalid
    /// data is logged and replaced by the initial snapshot.
    pub fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, AppError> {
        let mut store = Self::with_state(PlannerState {
            is_loading: true,
            ..PlannerState::default()
        });

        let mut loaded = load_snapshot(backend.as_ref());
        loaded.is_loading = false;
        store.state = Arc::new(loaded);
        store.persister = Some(Persister::spawn(backend, STORE_KEY)?);

        Ok(store)
    }

    pub fn snapshot(&self) -> Arc<PlannerState> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn current_week(&self) -> Option<&Week> {
        self.state.current_week()
    }

    /// Blocks until queued writes have reached the backend.
    pub fn flush(&self) {
        if let Some(persister) = self.persister.as_ref() {
            persister.flush();
        }
    }

    fn commit_with<R>(
        &mut self,
        operation: &'static str,
        persist: bool,
        apply: impl FnOnce(&mut PlannerState, &mut IdGenerator) -> Option<R>,
    ) -> Option<R> {
        let mut next = PlannerState::clone(&self.state);
        let result = apply(&mut next, &mut self.ids);

        if result.is_none() {
            debug!("event=store_op module=store op={operation} status=noop");
            return None;
        }

        self.state = Arc::new(next);
        debug!("event=store_op module=store op={operation} status=applied");
        if persist && let Some(persister) = self.persister.as_ref() {
            persister.schedule(Arc::clone(&self.state));
        }
        result
    }

    fn commit(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&mut PlannerState, &mut IdGenerator) -> Outcome,
    ) -> Outcome {
        self.commit_with(operation, true, |state, ids| {
            apply(state, ids).is_applied().then_some(())
        })
        .map_or(Outcome::NoOp, |()| Outcome::Applied)
    }

    /// Appends a week and makes it current. Weeks without seven days are
    /// rejected.
    pub fn add_week(&mut self, week: Week) -> Outcome {
        self.commit("add_week", |state, _| {
            if week.days.len() != DAYS_PER_WEEK {
                warn!(
                    "event=store_op module=store op=add_week status=rejected days={}",
                    week.days.len()
                );
                return Outcome::NoOp;
            }
            state.weeks.push(week);
            state.current_week_index = state.weeks.len() - 1;
            Outcome::Applied
        })
    }

    /// Out-of-range indices are ignored so the current index stays valid.
    pub fn set_current_week(&mut self, index: usize) -> Outcome {
        self.commit("set_current_week", |state, _| {
            if index >= state.weeks.len() || index == state.current_week_index {
                return Outcome::NoOp;
            }
            state.current_week_index = index;
            Outcome::Applied
        })
    }

    pub fn update_week(&mut self, week_id: &str, week: Week) -> Outcome {
        self.commit("update_week", |state, _| {
            if week.days.len() != DAYS_PER_WEEK {
                return Outcome::NoOp;
            }
            match state.weeks.iter_mut().find(|existing| existing.id == week_id) {
                Some(existing) => {
                    *existing = week;
                    Outcome::Applied
                }
                None => Outcome::NoOp,
            }
        })
    }

    /// Removes a week and steps the current index back by one, clamped to
    /// the remaining weeks.
    pub fn delete_week(&mut self, week_id: &str) -> Outcome {
        self.commit("delete_week", |state, _| {
            let Some(index) = state.weeks.iter().position(|week| week.id == week_id) else {
                return Outcome::NoOp;
            };
            state.weeks.remove(index);
            state.current_week_index = state
                .current_week_index
                .saturating_sub(1)
                .min(state.weeks.len().saturating_sub(1));
            Outcome::Applied
        })
    }

    /// Adds a task to the first day with `day_id` and returns the new task
    /// id, or `None` when no day matches.
    pub fn add_task(&mut self, day_id: &str, draft: TaskDraft) -> Option<String> {
        self.commit_with("add_task", true, |state, ids| {
            state.find_day(day_id)?;
            let task_id = state.fresh_id(ids, "task");
            let task = draft.into_task(task_id.clone(), || state.fresh_id(ids, "subtask"));
            state.find_day_mut(day_id)?.tasks.push(task);
            Some(task_id)
        })
    }

    pub fn update_task(&mut self, day_id: &str, task_id: &str, updates: &[TaskUpdate]) -> Outcome {
        self.commit("update_task", |state, ids| {
            if state.find_task(day_id, task_id).is_none() {
                return Outcome::NoOp;
            }
            let new_subtask_ids: Vec<String> = updates
                .iter()
                .filter(|update| matches!(update, TaskUpdate::AddSubtask(_)))
                .map(|_| state.fresh_id(ids, "subtask"))
                .collect();
            let mut new_subtask_ids = new_subtask_ids.into_iter();

            let Some(task) = state.find_task_mut(day_id, task_id) else {
                return Outcome::NoOp;
            };
            let mut changed = false;
            for update in updates {
                changed |= apply_update(task, update, &mut new_subtask_ids);
            }
            Outcome::applied_if(changed)
        })
    }

    pub fn delete_task(&mut self, day_id: &str, task_id: &str) -> Outcome {
        self.commit("delete_task", |state, _| {
            let Some(day) = state.find_day_mut(day_id) else {
                return Outcome::NoOp;
            };
            let before = day.tasks.len();
            day.tasks.retain(|task| task.id != task_id);
            Outcome::applied_if(day.tasks.len() != before)
        })
    }

    pub fn toggle_task_completion(&mut self, day_id: &str, task_id: &str) -> Outcome {
        self.commit("toggle_task_completion", |state, _| {
            match state.find_task_mut(day_id, task_id) {
                Some(task) => {
                    task.completed = !task.completed;
                    Outcome::Applied
                }
                None => Outcome::NoOp,
            }
        })
    }

    pub fn toggle_subtask_completion(
        &mut self,
        day_id: &str,
        task_id: &str,
        subtask_id: &str,
    ) -> Outcome {
        self.commit("toggle_subtask_completion", |state, _| {
            let subtask = state
                .find_task_mut(day_id, task_id)
                .and_then(|task| task.subtasks.iter_mut().find(|s| s.id == subtask_id));
            match subtask {
                Some(subtask) => {
                    subtask.completed = !subtask.completed;
                    Outcome::Applied
                }
                None => Outcome::NoOp,
            }
        })
    }

    pub fn toggle_task_expansion(&mut self, day_id: &str, task_id: &str) -> Outcome {
        self.commit("toggle_task_expansion", |state, _| {
            match state.find_task_mut(day_id, task_id) {
                Some(task) => {
                    task.expanded = !task.expanded;
                    Outcome::Applied
                }
                None => Outcome::NoOp,
            }
        })
    }

    /// Appends a template whose id the caller already assigned.
    pub fn add_template(&mut self, template: Template) -> Outcome {
        self.commit("add_template", |state, _| {
            state.templates.push(template);
            Outcome::Applied
        })
    }

    /// Builds a template from drafts, assigning the template, task and
    /// subtask ids. Returns the template id.
    pub fn create_template(&mut self, name: &str, icon: &str, drafts: Vec<TaskDraft>) -> String {
        let template_id = self.state.fresh_id(&mut self.ids, "template");
        let outcome = self.commit("create_template", |state, ids| {
            let tasks: Vec<Task> = drafts
                .into_iter()
                .map(|draft| {
                    let task_id = state.fresh_id(ids, "task");
                    draft.into_task(task_id, || state.fresh_id(ids, "subtask"))
                })
                .collect();
            state.templates.push(Template {
                id: template_id.clone(),
                name: name.to_string(),
                icon: icon.to_string(),
                tasks,
            });
            Outcome::Applied
        });
        debug_assert!(outcome.is_applied());
        template_id
    }

    pub fn update_template(&mut self, template_id: &str, template: Template) -> Outcome {
        self.commit("update_template", |state, _| {
            match state.templates.iter_mut().find(|existing| existing.id == template_id) {
                Some(existing) => {
                    *existing = template;
                    Outcome::Applied
                }
                None => Outcome::NoOp,
            }
        })
    }

    pub fn delete_template(&mut self, template_id: &str) -> Outcome {
        self.commit("delete_template", |state, _| {
            let before = state.templates.len();
            state.templates.retain(|template| template.id != template_id);
            Outcome::applied_if(state.templates.len() != before)
        })
    }

    /// Copies a template's tasks onto a day with fresh task and subtask ids.
    ///
    /// `replace_existing` swaps the day's tasks for the copies,
    /// `merge_with_existing` appends them. With neither flag the day is left
    /// unchanged.
    pub fn apply_template(
        &mut self,
        template_id: &str,
        day_id: &str,
        options: TemplateApplication,
    ) -> Outcome {
        self.commit("apply_template", |state, ids| {
            if !options.replace_existing && !options.merge_with_existing {
                return Outcome::NoOp;
            }
            let Some(template) = state.template(template_id) else {
                return Outcome::NoOp;
            };
            if state.find_day(day_id).is_none() {
                return Outcome::NoOp;
            }

            let blueprints = template.tasks.clone();
            let copies = state.clone_with_fresh_ids(&blueprints, ids);
            let Some(day) = state.find_day_mut(day_id) else {
                return Outcome::NoOp;
            };
            if options.replace_existing {
                day.tasks = copies;
            } else {
                day.tasks.extend(copies);
            }
            Outcome::Applied
        })
    }

    /// Moves the task at `source_index` of one day to `target_index` of
    /// another (or the same) day.
    ///
    /// Both indices refer to the lists as they were before the move, so on
    /// the same day a target after the source lands one slot earlier once
    /// the task has been taken out. Targets past the end append.
    pub fn move_task(
        &mut self,
        source_day_id: &str,
        source_index: usize,
        target_day_id: &str,
        target_index: usize,
    ) -> Outcome {
        self.commit("move_task", |state, _| {
            let Some(source) = state.find_day(source_day_id) else {
                return Outcome::NoOp;
            };
            let source_len = source.tasks.len();
            if source_index >= source_len || state.find_day(target_day_id).is_none() {
                return Outcome::NoOp;
            }

            let same_day = source_day_id == target_day_id;
            let insert_at = if same_day && target_index > source_index {
                target_index - 1
            } else {
                target_index
            };
            if same_day && insert_at.min(source_len - 1) == source_index {
                return Outcome::NoOp;
            }

            let Some(source) = state.find_day_mut(source_day_id) else {
                return Outcome::NoOp;
            };
            let task = source.tasks.remove(source_index);
            let Some(target) = state.find_day_mut(target_day_id) else {
                return Outcome::NoOp;
            };
            let insert_at = insert_at.min(target.tasks.len());
            target.tasks.insert(insert_at, task);
            Outcome::Applied
        })
    }

    /// Transient flag; changing it does not schedule a write.
    pub fn set_loading(&mut self, loading: bool) -> Outcome {
        self.commit_with("set_loading", false, |state, _| {
            if state.is_loading == loading {
                return None;
            }
            state.is_loading = loading;
            Some(())
        })
        .map_or(Outcome::NoOp, |()| Outcome::Applied)
    }

    /// Adds the week containing `today` when the planner has no weeks yet.
    pub fn ensure_current_week(
        &mut self,
        today: Date,
        week_start: WeekStart,
    ) -> Result<Outcome, AppError> {
        if !self.state.weeks.is_empty() {
            return Ok(Outcome::NoOp);
        }
        let week = generate_week(current_week_start(today, week_start))?;
        Ok(self.add_week(week))
    }

    /// Moves to the following week, creating it after the last week when
    /// needed.
    pub fn next_week(&mut self) -> Result<Outcome, AppError> {
        let next_index = self.state.current_week_index + 1;
        if next_index < self.state.weeks.len() {
            return Ok(self.set_current_week(next_index));
        }
        let Some(last) = self.state.weeks.last() else {
            return Ok(Outcome::NoOp);
        };
        let week = generate_week(next_week_start(last)?)?;
        Ok(self.add_week(week))
    }

    pub fn previous_week(&mut self) -> Outcome {
        match self.state.current_week_index.checked_sub(1) {
            Some(index) => self.set_current_week(index),
            None => Outcome::NoOp,
        }
    }
}

fn apply_update(
    task: &mut Task,
    update: &TaskUpdate,
    new_subtask_ids: &mut impl Iterator<Item = String>,
) -> bool {
    match update {
        TaskUpdate::SetText(text) => replace(&mut task.text, text.clone()),
        TaskUpdate::SetPriority(priority) => replace(&mut task.priority, *priority),
        TaskUpdate::SetCompleted(completed) => replace(&mut task.completed, *completed),
        TaskUpdate::SetExpanded(expanded) => replace(&mut task.expanded, *expanded),
        TaskUpdate::AddSubtask(text) => match new_subtask_ids.next() {
            Some(id) => {
                task.subtasks.push(Subtask {
                    id,
                    text: text.clone(),
                    completed: false,
                });
                true
            }
            None => false,
        },
        TaskUpdate::RemoveSubtask(subtask_id) => {
            let before = task.subtasks.len();
            task.subtasks.retain(|subtask| &subtask.id != subtask_id);
            task.subtasks.len() != before
        }
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

fn load_snapshot(backend: &dyn StorageBackend) -> PlannerState {
    let loaded = backend
        .get_item(STORE_KEY)
        .and_then(|content| content.map(|content| decode_state(&content)).transpose());

    match loaded {
        Ok(Some(state)) => {
            info!(
                "event=rehydrate module=store status=ok weeks={} templates={}",
                state.weeks.len(),
                state.templates.len()
            );
            state
        }
        Ok(None) => {
            info!("event=rehydrate module=store status=empty");
            PlannerState::default()
        }
        Err(err) => {
            warn!(
                "event=rehydrate module=store status=error code={} message={}",
                err.code(),
                err.message()
            );
            PlannerState::default()
        }
    }
}
