//! Audit event types

use chrono::{DateTime, Local};
use kaisheng_util::{AppId, ScheduleId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Enforcement loop started
    ServiceStarted,

    /// Enforcement loop stopped
    ServiceStopped,

    /// Policy loaded/reloaded
    PolicyLoaded {
        schedule_count: usize,
        limit_count: usize,
    },

    /// A downtime schedule became the enforced policy
    DowntimeStarted {
        schedule_id: ScheduleId,
        device_wide: bool,
    },

    /// Downtime no longer enforced
    DowntimeEnded { schedule_id: ScheduleId },

    /// Schedule toggled at runtime
    ScheduleToggled {
        schedule_id: ScheduleId,
        enabled: bool,
    },

    /// Usage limit warning issued
    LimitWarning {
        app_id: AppId,
        remaining: Duration,
    },

    /// Daily usage limit reached
    LimitReached { app_id: AppId, used: Duration },

    /// Walking restriction turned on or off
    MotionRestriction { restricting: bool },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(kaisheng_util::now(), event)
    }

    /// Event stamped with an explicit time (engine decisions carry their own clock)
    pub fn at(timestamp: DateTime<Local>, event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
