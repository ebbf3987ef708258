//! Error types for KaiSheng

use thiserror::Error;

use crate::ScheduleId;

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum KaishengError {
    #[error("Unknown schedule: {0}")]
    ScheduleNotFound(ScheduleId),

    /// Usage ledger or audit log failure
    #[error("Store error: {0}")]
    Store(String),
}

impl KaishengError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, KaishengError>;
