use crate::error::AppError;
use crate::model::{DAYS_PER_WEEK, Template, Week};
use crate::storage::StorageBackend;
use crate::store::PlannerState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
pub const STORE_KEY: &str = "weekly-planner-storage";
const DATA_DIR_ENV_VAR: &str = "WEEKLY_PLANNER_DATA_DIR";
const APP_DIR_NAME: &str = "weekly-planner";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPlanner {
    schema_version: u32,
    weeks: Vec<Week>,
    templates: Vec<Template>,
    #[serde(default)]
    current_week_index: usize,
}

/// Write-side twin of [`StoredPlanner`] that borrows from the snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredPlannerRef<'a> {
    schema_version: u32,
    weeks: &'a [Week],
    templates: &'a [Template],
    current_week_index: usize,
}

pub fn data_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(DATA_DIR_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

/// Serializes the persistent part of a snapshot. `is_loading` is dropped.
pub fn encode_state(state: &PlannerState) -> Result<String, AppError> {
    let stored = StoredPlannerRef {
        schema_version: SCHEMA_VERSION,
        weeks: &state.weeks,
        templates: &state.templates,
        current_week_index: state.current_week_index,
    };
    Ok(serde_json::to_string_pretty(&stored)?)
}

pub fn decode_state(content: &str) -> Result<PlannerState, AppError> {
    let stored: StoredPlanner = serde_json::from_str(content)?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schemaVersion mismatch"));
    }

    if let Some(week) = stored
        .weeks
        .iter()
        .find(|week| week.days.len() != DAYS_PER_WEEK)
    {
        return Err(AppError::invalid_data(format!(
            "week {} must have {DAYS_PER_WEEK} days, found {}",
            week.id,
            week.days.len()
        )));
    }

    if !stored.weeks.is_empty() && stored.current_week_index >= stored.weeks.len() {
        return Err(AppError::invalid_data("currentWeekIndex out of range"));
    }

    Ok(PlannerState {
        weeks: stored.weeks,
        templates: stored.templates,
        current_week_index: stored.current_week_index,
        is_loading: false,
    })
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self::new(data_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for JsonFileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
        Ok(Some(content))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path_for(key);
        let staging = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&staging, value)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&staging, permissions)?;
        }

        std::fs::rename(&staging, &path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
        Ok(())
    }
}
