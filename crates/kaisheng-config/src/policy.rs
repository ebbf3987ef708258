//! Validated policy structures

use crate::schema::{RawAppLimit, RawBlock, RawConfig, RawMotion, RawSchedule, RawServiceConfig, RawWarningThreshold};
use crate::validation::{parse_days, parse_time};
use chrono::{DateTime, Local};
use kaisheng_api::{BlockScope, LimitStatus, WarningSeverity, WarningThreshold};
use kaisheng_util::{AppId, DaysOfWeek, ScheduleId, TimeWindow, WallClock, default_data_dir};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default enforcement loop interval
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(15);

/// Default lingering time of the walking restriction
pub const DEFAULT_MOTION_RELEASE_DELAY: Duration = Duration::from_secs(30);

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub service: ServiceConfig,

    /// Downtime schedules in configuration order
    pub schedules: Vec<DowntimeSchedule>,

    pub limits: Vec<AppLimit>,

    pub motion: MotionPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let default_warnings = raw
            .service
            .default_warnings
            .clone()
            .map(|w| w.into_iter().map(convert_warning).collect())
            .unwrap_or_else(default_warning_thresholds);

        let limits = raw
            .limits
            .into_iter()
            .map(|l| AppLimit::from_raw(l, &default_warnings))
            .collect();

        Self {
            service: ServiceConfig::from_raw(raw.service),
            schedules: raw.schedules.into_iter().map(DowntimeSchedule::from_raw).collect(),
            limits,
            motion: MotionPolicy::from_raw(raw.motion),
        }
    }

    pub fn get_schedule(&self, id: &ScheduleId) -> Option<&DowntimeSchedule> {
        self.schedules.iter().find(|s| &s.id == id)
    }

    pub fn get_schedule_mut(&mut self, id: &ScheduleId) -> Option<&mut DowntimeSchedule> {
        self.schedules.iter_mut().find(|s| &s.id == id)
    }

    /// Get the enabled limit for an app, if any
    pub fn get_limit(&self, app_id: &AppId) -> Option<&AppLimit> {
        self.limits.iter().find(|l| l.enabled && &l.app_id == app_id)
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            tick_interval: raw
                .tick_interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TICK_INTERVAL),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// A named, recurring downtime window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DowntimeSchedule {
    pub id: ScheduleId,
    pub name: String,
    pub window: TimeWindow,
    pub scope: BlockScope,
    pub enabled: bool,
}

impl DowntimeSchedule {
    fn from_raw(raw: RawSchedule) -> Self {
        let days_mask = raw
            .days
            .as_ref()
            .and_then(|d| parse_days(d).ok())
            .unwrap_or(0x7F);
        let (start_h, start_m) = parse_time(&raw.start).unwrap_or((0, 0));
        let (end_h, end_m) = parse_time(&raw.end).unwrap_or((23, 59));

        let scope = match raw.block {
            RawBlock::Device => BlockScope::Device,
            RawBlock::Apps { apps } => BlockScope::apps(
                apps.into_iter()
                    .map(|a| a.trim().to_string())
                    .filter(|a| !a.is_empty())
                    .map(AppId::new),
            ),
        };

        Self {
            name: raw.name.unwrap_or_else(|| raw.id.clone()),
            id: ScheduleId::new(raw.id),
            window: TimeWindow {
                days: DaysOfWeek::new(days_mask),
                start: WallClock { hour: start_h, minute: start_m },
                end: WallClock { hour: end_h, minute: end_m },
            },
            scope,
            enabled: raw.enabled,
        }
    }

    pub fn is_active_at(&self, dt: &DateTime<Local>) -> bool {
        self.enabled && self.window.contains(dt)
    }

    /// When the current occurrence ends, if active
    pub fn ends_at(&self, dt: &DateTime<Local>) -> Option<DateTime<Local>> {
        if !self.enabled {
            return None;
        }
        self.window.ends_at(dt)
    }

    pub fn next_start_after(&self, dt: &DateTime<Local>) -> Option<DateTime<Local>> {
        if !self.enabled {
            return None;
        }
        self.window.next_start_after(dt)
    }
}

/// Per-app daily usage ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLimit {
    pub app_id: AppId,
    pub daily_limit: Duration,
    /// Sorted by `seconds_before`, largest first
    pub warnings: Vec<WarningThreshold>,
    pub enabled: bool,
}

impl AppLimit {
    fn from_raw(raw: RawAppLimit, default_warnings: &[WarningThreshold]) -> Self {
        let daily_limit = Duration::from_secs(raw.daily_limit_seconds);
        let mut warnings: Vec<WarningThreshold> = match raw.warnings {
            Some(w) => w.into_iter().map(convert_warning).collect(),
            None => default_warnings
                .iter()
                .filter(|w| w.seconds_before < raw.daily_limit_seconds)
                .cloned()
                .collect(),
        };
        warnings.sort_by(|a, b| b.seconds_before.cmp(&a.seconds_before));

        Self {
            app_id: AppId::new(raw.app.trim()),
            daily_limit,
            warnings,
            enabled: raw.enabled,
        }
    }

    /// Usage status given the time already spent today
    pub fn status(&self, used: Duration) -> LimitStatus {
        LimitStatus {
            app_id: self.app_id.clone(),
            used,
            limit: self.daily_limit,
            remaining: self.daily_limit.saturating_sub(used),
            exceeded: used >= self.daily_limit,
        }
    }

    /// Warnings whose mark was passed when usage went from `before` to `after`
    pub fn crossed_warnings(&self, before: Duration, after: Duration) -> Vec<&WarningThreshold> {
        self.warnings
            .iter()
            .filter(|w| {
                let mark = self
                    .daily_limit
                    .saturating_sub(Duration::from_secs(w.seconds_before));
                before < mark && after >= mark
            })
            .collect()
    }
}

/// Walking restriction settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionPolicy {
    pub enabled: bool,
    pub restricted_apps: BTreeSet<AppId>,
    pub release_delay: Duration,
}

impl MotionPolicy {
    fn from_raw(raw: RawMotion) -> Self {
        Self {
            enabled: raw.enabled,
            restricted_apps: raw
                .restricted_apps
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .map(AppId::new)
                .collect(),
            release_delay: raw
                .release_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_MOTION_RELEASE_DELAY),
        }
    }

    pub fn covers(&self, app_id: &AppId) -> bool {
        self.enabled && self.restricted_apps.contains(app_id)
    }
}

impl Default for MotionPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            restricted_apps: BTreeSet::new(),
            release_delay: DEFAULT_MOTION_RELEASE_DELAY,
        }
    }
}

// Conversion helpers

fn convert_warning(raw: RawWarningThreshold) -> WarningThreshold {
    let severity = match raw.severity.to_lowercase().as_str() {
        "info" => WarningSeverity::Info,
        "critical" => WarningSeverity::Critical,
        _ => WarningSeverity::Warn,
    };

    WarningThreshold {
        seconds_before: raw.seconds_before,
        severity,
        message_template: raw.message,
    }
}

fn default_warning_thresholds() -> Vec<WarningThreshold> {
    vec![
        WarningThreshold {
            seconds_before: 900, // 15 minutes
            severity: WarningSeverity::Info,
            message_template: Some("15 minutes left today".into()),
        },
        WarningThreshold {
            seconds_before: 300,
            severity: WarningSeverity::Warn,
            message_template: Some("5 minutes left today".into()),
        },
        WarningThreshold {
            seconds_before: 60,
            severity: WarningSeverity::Critical,
            message_template: Some("1 minute left today".into()),
        },
    ]
}
