//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Downtime schedules, in priority order for tie-breaking
    #[serde(default)]
    pub schedules: Vec<RawSchedule>,

    /// Per-app daily limits
    #[serde(default)]
    pub limits: Vec<RawAppLimit>,

    /// Walking restriction
    #[serde(default)]
    pub motion: RawMotion,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the usage ledger
    pub data_dir: Option<PathBuf>,

    /// How often the enforcement loop re-evaluates, in seconds
    pub tick_interval_seconds: Option<u64>,

    /// Default warning thresholds (can be overridden per limit)
    pub default_warnings: Option<Vec<RawWarningThreshold>>,
}

/// Raw downtime schedule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawSchedule {
    /// Unique stable ID
    pub id: String,

    /// Display name (defaults to the ID)
    pub name: Option<String>,

    /// Days of week: "weekdays", "weekends", "all", or list like ["mon", "tue"].
    /// Omitted means every day.
    pub days: Option<RawDays>,

    /// Start time (HH:MM format)
    pub start: String,

    /// End time (HH:MM format). Earlier than `start` means the window
    /// runs past midnight.
    pub end: String,

    /// What is blocked while the schedule is active
    #[serde(default)]
    pub block: RawBlock,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Days specification
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawDays {
    Preset(String),
    List(Vec<String>),
}

/// Block scope
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawBlock {
    #[default]
    Device,
    Apps { apps: Vec<String> },
}

/// Per-app daily limit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAppLimit {
    /// App identifier
    pub app: String,

    /// Daily allowance in seconds
    pub daily_limit_seconds: u64,

    /// Warning configuration
    #[serde(default)]
    pub warnings: Option<Vec<RawWarningThreshold>>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Walking restriction settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMotion {
    #[serde(default)]
    pub enabled: bool,

    /// Apps blocked while walking
    #[serde(default)]
    pub restricted_apps: Vec<String>,

    /// How long the restriction lingers after walking stops
    pub release_delay_seconds: Option<u64>,
}

/// Warning threshold
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawWarningThreshold {
    /// Seconds of allowance left when the warning fires
    pub seconds_before: u64,

    /// Severity: "info", "warn", "critical"
    #[serde(default = "default_severity")]
    pub severity: String,

    /// Message template
    pub message: Option<String>,
}

fn default_severity() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_schedules() {
        let toml_str = r#"
            config_version = 1

            [[schedules]]
            id = "bedtime"
            start = "22:00"
            end = "07:00"

            [[schedules]]
            id = "homework"
            name = "Homework"
            days = ["mon", "tue", "wed"]
            start = "16:00"
            end = "18:00"
            block = { type = "apps", apps = ["com.example.video", "com.example.games"] }
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.schedules.len(), 2);
        assert!(matches!(config.schedules[0].block, RawBlock::Device));
        assert!(config.schedules[0].enabled);
        assert!(config.schedules[0].days.is_none());
        match &config.schedules[1].block {
            RawBlock::Apps { apps } => assert_eq!(apps.len(), 2),
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn parse_limits_and_motion() {
        let toml_str = r#"
            config_version = 1

            [[limits]]
            app = "com.example.social"
            daily_limit_seconds = 3600

            [[limits.warnings]]
            seconds_before = 300
            severity = "info"

            [motion]
            enabled = true
            restricted_apps = ["com.example.social"]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.limits.len(), 1);
        assert_eq!(config.limits[0].warnings.as_ref().unwrap().len(), 1);
        assert!(config.motion.enabled);
        assert!(config.motion.release_delay_seconds.is_none());
    }
}
