//! Core events emitted by the engine

use chrono::{DateTime, Local};
use kaisheng_api::{EnforcedDowntime, WarningSeverity};
use kaisheng_util::{AppId, ScheduleId};
use std::time::Duration;

/// Events emitted by the core engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Downtime began (nothing was enforced before)
    DowntimeStarted { downtime: EnforcedDowntime },

    /// A different schedule now wins conflict resolution
    DowntimeChanged {
        previous: ScheduleId,
        downtime: EnforcedDowntime,
    },

    /// No downtime is enforced any more
    DowntimeEnded { schedule_id: ScheduleId, name: String },

    /// Usage crossed a warning threshold
    LimitWarning {
        app_id: AppId,
        remaining: Duration,
        severity: WarningSeverity,
        message: Option<String>,
    },

    /// Daily limit reached
    LimitReached {
        app_id: AppId,
        used: Duration,
        limit: Duration,
    },

    /// Walking restriction engaged or released
    MotionRestrictionChanged {
        restricting: bool,
        at: DateTime<Local>,
    },

    /// Schedule enabled or disabled at runtime
    ScheduleToggled { schedule_id: ScheduleId, enabled: bool },

    /// Policy was reloaded
    PolicyReloaded {
        schedule_count: usize,
        limit_count: usize,
    },
}
