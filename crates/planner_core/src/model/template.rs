use crate::model::Task;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// How template tasks combine with the tasks already on a day.
///
/// When both flags are set, replacing wins. When neither is set the day is
/// left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateApplication {
    pub replace_existing: bool,
    pub merge_with_existing: bool,
}

impl TemplateApplication {
    pub fn replace() -> Self {
        Self {
            replace_existing: true,
            merge_with_existing: false,
        }
    }

    pub fn merge() -> Self {
        Self {
            replace_existing: false,
            merge_with_existing: true,
        }
    }
}
