//! Config validation CLI tool
//!
//! Validates a KaiSheng configuration file and reports any errors.

use kaisheng_api::BlockScope;
use kaisheng_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a KaiSheng configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match kaisheng_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", kaisheng_config::CURRENT_CONFIG_VERSION);
            println!("  Schedules: {}", policy.schedules.len());
            println!("  App limits: {}", policy.limits.len());
            println!(
                "  Walking restriction: {}",
                if policy.motion.enabled { "on" } else { "off" }
            );

            if !policy.schedules.is_empty() {
                println!();
                println!("Schedules:");
                for schedule in &policy.schedules {
                    let scope = match &schedule.scope {
                        BlockScope::Device => "whole device".to_string(),
                        BlockScope::Apps { apps } => format!("{} app(s)", apps.len()),
                    };
                    let state = if schedule.enabled { "" } else { " [disabled]" };
                    println!(
                        "  - {} \"{}\" {} blocks {}{}",
                        schedule.id, schedule.name, schedule.window, scope, state
                    );
                }
            }

            if !policy.limits.is_empty() {
                println!();
                println!("Limits:");
                for limit in &policy.limits {
                    println!(
                        "  - {}: {} per day",
                        limit.app_id,
                        format_duration(limit.daily_limit)
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                kaisheng_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                kaisheng_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                kaisheng_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                kaisheng_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        kaisheng_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
