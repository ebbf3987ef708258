//! Configuration parsing and validation for KaiSheng
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Downtime schedules with weekday recurrence and overnight windows
//! - Per-app daily limits and warnings
//! - Walking restriction settings
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading config");
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use kaisheng_api::BlockScope;
    use kaisheng_util::{AppId, ScheduleId};
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [[schedules]]
            id = "bedtime"
            start = "22:00"
            end = "07:00"
        "#;

        let policy = parse_config(config).unwrap();
        assert_eq!(policy.schedules.len(), 1);
        assert_eq!(policy.schedules[0].id.as_str(), "bedtime");
        assert_eq!(policy.schedules[0].scope, BlockScope::Device);
        assert!(policy.limits.is_empty());
        assert!(!policy.motion.enabled);
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [service]
            tick_interval_seconds = 5

            [[schedules]]
            id = "homework"
            name = "Homework time"
            days = "weekdays"
            start = "16:00"
            end = "18:00"
            block = { type = "apps", apps = ["video", "games"] }

            [[limits]]
            app = "social"
            daily_limit_seconds = 1800

            [motion]
            enabled = true
            restricted_apps = ["social"]
            release_delay_seconds = 10
        "#;

        let policy = parse_config(config).unwrap();
        assert_eq!(policy.service.tick_interval, Duration::from_secs(5));

        let homework = policy.get_schedule(&ScheduleId::new("homework")).unwrap();
        assert_eq!(homework.name, "Homework time");
        assert_eq!(homework.scope.blocked_app_count(), Some(2));

        let limit = policy.get_limit(&AppId::new("social")).unwrap();
        assert_eq!(limit.daily_limit, Duration::from_secs(1800));
        assert_eq!(limit.warnings.len(), 3);

        assert!(policy.motion.covers(&AppId::new("social")));
        assert_eq!(policy.motion.release_delay, Duration::from_secs(10));
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_config() {
        let config = r#"
            config_version = 1

            [[schedules]]
            id = "broken"
            start = "7pm"
            end = "07:00"
        "#;

        match parse_config(config) {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 1),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "config_version = 1").unwrap();
        writeln!(file, "[[limits]]").unwrap();
        writeln!(file, "app = \"games\"").unwrap();
        writeln!(file, "daily_limit_seconds = 3600").unwrap();

        let policy = load_config(file.path()).unwrap();
        assert_eq!(policy.limits.len(), 1);

        let missing = load_config("/nonexistent/kaisheng/config.toml");
        assert!(matches!(missing, Err(ConfigError::ReadError(_))));
    }
}
