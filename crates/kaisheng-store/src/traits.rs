//! Store trait definitions

use chrono::NaiveDate;
use kaisheng_util::AppId;
use std::time::Duration;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Usage accounting

    /// Get total usage for an app on a specific day
    fn get_usage(&self, app_id: &AppId, day: NaiveDate) -> StoreResult<Duration>;

    /// Add usage for an app on a specific day, returning the new total
    fn add_usage(&self, app_id: &AppId, day: NaiveDate, duration: Duration) -> StoreResult<Duration>;

    /// All recorded usage for a day, ordered by app
    fn get_usage_for_day(&self, day: NaiveDate) -> StoreResult<Vec<(AppId, Duration)>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
