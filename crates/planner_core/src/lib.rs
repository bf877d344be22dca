pub mod calendar;
pub mod config;
pub mod error;
pub mod id;
pub mod logging;
pub mod model;
pub mod storage;
pub mod store;

pub use store::{Outcome, PlannerState, PlannerStore};
