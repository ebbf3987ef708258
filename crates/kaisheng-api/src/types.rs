//! Shared types for the KaiSheng API

use chrono::{DateTime, Local};
use kaisheng_util::{AppId, ScheduleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// What a downtime schedule blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockScope {
    /// Every app on the device
    Device,
    /// Only the listed apps
    Apps { apps: BTreeSet<AppId> },
}

impl BlockScope {
    pub fn apps(apps: impl IntoIterator<Item = AppId>) -> Self {
        Self::Apps {
            apps: apps.into_iter().collect(),
        }
    }

    pub fn is_device(&self) -> bool {
        matches!(self, Self::Device)
    }

    /// Number of distinct apps blocked. `None` for a device-wide block.
    pub fn blocked_app_count(&self) -> Option<usize> {
        match self {
            Self::Device => None,
            Self::Apps { apps } => Some(apps.len()),
        }
    }

    pub fn blocks(&self, app: &AppId) -> bool {
        match self {
            Self::Device => true,
            Self::Apps { apps } => apps.contains(app),
        }
    }
}

/// The single downtime policy in force at an instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcedDowntime {
    pub schedule_id: ScheduleId,
    pub name: String,
    pub scope: BlockScope,
    /// When the winning schedule's current occurrence closes
    pub ends_at: Option<DateTime<Local>>,
    /// Other active schedules that lost conflict resolution
    pub overlapping: Vec<ScheduleId>,
}

impl EnforcedDowntime {
    pub fn blocks(&self, app: &AppId) -> bool {
        self.scope.blocks(app)
    }
}

/// Structured reason codes for why an app is blocked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReasonCode {
    /// A downtime schedule blocks the app
    Downtime {
        schedule_id: ScheduleId,
        name: String,
        ends_at: Option<DateTime<Local>>,
    },
    /// Daily usage limit reached
    LimitReached { used: Duration, limit: Duration },
    /// The user is walking and the app is motion-restricted
    WalkingRestriction,
}

/// Evaluation of a single app at an instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppView {
    pub app_id: AppId,
    pub allowed: bool,
    pub reasons: Vec<ReasonCode>,
    /// Remaining daily allowance, if the app has a limit
    pub remaining_today: Option<Duration>,
}

/// Daily usage against a limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStatus {
    pub app_id: AppId,
    pub used: Duration,
    pub limit: Duration,
    pub remaining: Duration,
    pub exceeded: bool,
}

/// Reported motion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Stationary,
    Walking,
}

/// Motion gate status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionStatus {
    pub state: MotionState,
    /// Whether motion-restricted apps are currently blocked
    pub restricting: bool,
    /// When a pending restriction will lift after walking stopped
    pub release_at: Option<DateTime<Local>>,
}

/// Warning severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Warn,
    Critical,
}

/// Warning threshold for an app limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningThreshold {
    /// Seconds of allowance left when this warning fires
    pub seconds_before: u64,
    pub severity: WarningSeverity,
    pub message_template: Option<String>,
}

/// Schedule summary for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleView {
    pub schedule_id: ScheduleId,
    pub name: String,
    pub window: String,
    pub scope: BlockScope,
    pub enabled: bool,
    pub active: bool,
    pub next_start: Option<DateTime<Local>>,
}

/// Full status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub api_version: u32,
    pub at: DateTime<Local>,
    pub downtime: Option<EnforcedDowntime>,
    /// Earliest upcoming downtime start, if any
    pub next_downtime: Option<(ScheduleId, DateTime<Local>)>,
    pub motion: MotionStatus,
    pub limits: Vec<LimitStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_scope_blocks_everything() {
        let scope = BlockScope::Device;
        assert!(scope.blocks(&AppId::new("anything")));
        assert_eq!(scope.blocked_app_count(), None);
    }

    #[test]
    fn app_scope_blocks_listed_apps_only() {
        let scope = BlockScope::apps([AppId::new("video"), AppId::new("games"), AppId::new("video")]);
        assert!(scope.blocks(&AppId::new("video")));
        assert!(!scope.blocks(&AppId::new("maps")));
        assert_eq!(scope.blocked_app_count(), Some(2));
    }

    #[test]
    fn reason_code_serialization() {
        let reason = ReasonCode::WalkingRestriction;
        let json = serde_json::to_string(&reason).unwrap();
        assert_eq!(json, r#"{"code":"walking_restriction"}"#);

        let scope: BlockScope = serde_json::from_str(r#"{"type":"device"}"#).unwrap();
        assert!(scope.is_device());
    }
}
