//! Shared utilities for KaiSheng
//!
//! This crate provides:
//! - ID types (AppId, ScheduleId)
//! - Wall-clock time windows with weekday recurrence
//! - Error types
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
