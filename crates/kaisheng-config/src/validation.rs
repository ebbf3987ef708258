//! Configuration validation

use crate::schema::{RawAppLimit, RawBlock, RawConfig, RawDays, RawSchedule};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Schedule '{schedule_id}': {message}")]
    ScheduleError { schedule_id: String, message: String },

    #[error("Limit for '{app}': {message}")]
    LimitError { app: String, message: String },

    #[error("Duplicate schedule ID: {0}")]
    DuplicateScheduleId(String),

    #[error("Duplicate limit for app: {0}")]
    DuplicateLimit(String),

    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Warning threshold {seconds}s >= daily limit {limit}s for app '{app}'")]
    WarningExceedsLimit { app: String, seconds: u64, limit: u64 },

    #[error("Motion config error: {0}")]
    MotionError(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen_ids = HashSet::new();
    for schedule in &config.schedules {
        if !seen_ids.insert(&schedule.id) {
            errors.push(ValidationError::DuplicateScheduleId(schedule.id.clone()));
        }
    }

    let mut seen_apps = HashSet::new();
    for limit in &config.limits {
        if !seen_apps.insert(limit.app.trim()) {
            errors.push(ValidationError::DuplicateLimit(limit.app.clone()));
        }
    }

    for schedule in &config.schedules {
        errors.extend(validate_schedule(schedule));
    }

    for limit in &config.limits {
        errors.extend(validate_limit(limit));
    }

    if config.motion.enabled && config.motion.restricted_apps.is_empty() {
        errors.push(ValidationError::MotionError(
            "motion restriction enabled with no restricted_apps".into(),
        ));
    }

    if config.service.tick_interval_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "tick_interval_seconds must be greater than 0".into(),
        ));
    }

    errors
}

fn validate_schedule(schedule: &RawSchedule) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if schedule.id.trim().is_empty() {
        errors.push(ValidationError::ScheduleError {
            schedule_id: schedule.id.clone(),
            message: "id cannot be empty".into(),
        });
    }

    if let Some(days) = &schedule.days {
        match parse_days(days) {
            Ok(0) => errors.push(ValidationError::ScheduleError {
                schedule_id: schedule.id.clone(),
                message: "days list cannot be empty".into(),
            }),
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::ScheduleError {
                schedule_id: schedule.id.clone(),
                message: e,
            }),
        }
    }

    let start = parse_time(&schedule.start);
    if let Err(e) = &start {
        errors.push(ValidationError::InvalidTimeFormat {
            value: schedule.start.clone(),
            message: e.clone(),
        });
    }

    let end = parse_time(&schedule.end);
    if let Err(e) = &end {
        errors.push(ValidationError::InvalidTimeFormat {
            value: schedule.end.clone(),
            message: e.clone(),
        });
    }

    if let (Ok(start), Ok(end)) = (start, end)
        && start == end
    {
        errors.push(ValidationError::ScheduleError {
            schedule_id: schedule.id.clone(),
            message: "start and end must differ".into(),
        });
    }

    if let RawBlock::Apps { apps } = &schedule.block
        && apps.iter().all(|app| app.trim().is_empty())
    {
        errors.push(ValidationError::ScheduleError {
            schedule_id: schedule.id.clone(),
            message: "app block must list at least one app".into(),
        });
    }

    errors
}

fn validate_limit(limit: &RawAppLimit) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if limit.app.trim().is_empty() {
        errors.push(ValidationError::LimitError {
            app: limit.app.clone(),
            message: "app cannot be empty".into(),
        });
    }

    if limit.daily_limit_seconds == 0 {
        errors.push(ValidationError::LimitError {
            app: limit.app.clone(),
            message: "daily_limit_seconds must be greater than 0".into(),
        });
        return errors;
    }

    // Service-wide defaults that don't fit a small limit are dropped at
    // conversion; only explicit thresholds are rejected here
    if let Some(warnings) = &limit.warnings {
        for warning in warnings {
            if warning.seconds_before >= limit.daily_limit_seconds {
                errors.push(ValidationError::WarningExceedsLimit {
                    app: limit.app.clone(),
                    seconds: warning.seconds_before,
                    limit: limit.daily_limit_seconds,
                });
            }
        }
    }

    errors
}

/// Parse HH:MM time format
pub fn parse_time(s: &str) -> Result<(u8, u8), String> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 {
        return Err("Expected HH:MM format".into());
    }

    let hour: u8 = parts[0]
        .parse()
        .map_err(|_| "Invalid hour".to_string())?;
    let minute: u8 = parts[1]
        .parse()
        .map_err(|_| "Invalid minute".to_string())?;

    if hour >= 24 {
        return Err("Hour must be 0-23".into());
    }
    if minute >= 60 {
        return Err("Minute must be 0-59".into());
    }

    Ok((hour, minute))
}

/// Parse days specification into a Monday-first bit mask
pub fn parse_days(days: &RawDays) -> Result<u8, String> {
    match days {
        RawDays::Preset(preset) => match preset.to_lowercase().as_str() {
            "all" | "every" | "daily" => Ok(0x7F),
            "weekdays" => Ok(0x1F), // Mon-Fri
            "weekends" => Ok(0x60), // Sat-Sun
            // Nights followed by a school day
            "school_nights" => Ok(0x4F), // Sun-Thu
            other => Err(format!("Unknown day preset: {}", other)),
        },
        RawDays::List(list) => {
            let mut mask = 0u8;
            for day in list {
                let bit = match day.to_lowercase().as_str() {
                    "mon" | "monday" => 1 << 0,
                    "tue" | "tuesday" => 1 << 1,
                    "wed" | "wednesday" => 1 << 2,
                    "thu" | "thursday" => 1 << 3,
                    "fri" | "friday" => 1 << 4,
                    "sat" | "saturday" => 1 << 5,
                    "sun" | "sunday" => 1 << 6,
                    other => return Err(format!("Unknown day: {}", other)),
                };
                mask |= bit;
            }
            Ok(mask)
        }
    }
}
