mod task;
mod template;
mod week;

pub use task::{Priority, Subtask, SubtaskDraft, Task, TaskDraft, TaskUpdate};
pub use template::{Template, TemplateApplication};
pub use week::{DAYS_PER_WEEK, Day, Week};
