//! kaisheng - screen-time manager
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - Core engine
//! - One-shot queries and the long-running enforcement loop

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use kaisheng_api::{BlockScope, ReasonCode, StatusSnapshot};
use kaisheng_config::{Policy, load_config};
use kaisheng_core::{CoreEngine, CoreEvent};
use kaisheng_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use kaisheng_util::{
    AppId, ScheduleId, default_config_path, format_clock_time, format_datetime_full, format_duration,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// kaisheng - downtime schedules, app limits and walking restriction
#[derive(Parser, Debug)]
#[command(name = "kaisheng")]
#[command(about = "Screen-time manager", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/kaisheng/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set KAISHENG_DATA_DIR env var)
    #[arg(short, long, env = "KAISHENG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show enforced downtime, limits and motion state
    Status {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decide whether an app may be opened now
    Check {
        app: String,

        /// Treat the user as currently walking
        #[arg(long)]
        walking: bool,
    },

    /// List configured schedules
    Schedules,

    /// Record foreground usage for an app
    Usage { app: String, seconds: u64 },

    /// Show recent audit events
    Audit {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Run the enforcement loop until interrupted
    Run {
        /// Tick interval override in seconds
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn open(args: &Args) -> Result<(CoreEngine, Arc<dyn Store>)> {
    let policy = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        schedule_count = policy.schedules.len(),
        limit_count = policy.limits.len(),
        "Configuration loaded"
    );

    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| policy.service.data_dir.clone());

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join("kaisheng.db");
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );

    if !store.is_healthy() {
        bail!("Store at {:?} is not usable", db_path);
    }

    debug!(db_path = %db_path.display(), "Store initialized");

    Ok((CoreEngine::new(policy, store.clone()), store))
}

fn describe_scope(scope: &BlockScope) -> String {
    match scope {
        BlockScope::Device => "device".to_string(),
        BlockScope::Apps { apps } => {
            let names: Vec<&str> = apps.iter().map(|a| a.as_str()).collect();
            format!("apps: {}", names.join(", "))
        }
    }
}

fn describe_reason(reason: &ReasonCode) -> String {
    match reason {
        ReasonCode::Downtime { name, ends_at, .. } => match ends_at {
            Some(end) => format!("downtime \"{}\" until {}", name, format_clock_time(end)),
            None => format!("downtime \"{}\"", name),
        },
        ReasonCode::LimitReached { used, limit } => format!(
            "daily limit reached ({} of {})",
            format_duration(*used),
            format_duration(*limit)
        ),
        ReasonCode::WalkingRestriction => "walking".to_string(),
    }
}

fn describe_event(event: &CoreEvent) -> String {
    match event {
        CoreEvent::DowntimeStarted { downtime } => format!(
            "Downtime \"{}\" started ({})",
            downtime.name,
            describe_scope(&downtime.scope)
        ),
        CoreEvent::DowntimeChanged { previous, downtime } => format!(
            "Downtime switched from {} to \"{}\" ({})",
            previous,
            downtime.name,
            describe_scope(&downtime.scope)
        ),
        CoreEvent::DowntimeEnded { name, .. } => format!("Downtime \"{}\" ended", name),
        CoreEvent::LimitWarning {
            app_id,
            remaining,
            message,
            ..
        } => match message {
            Some(message) => format!("{}: {}", app_id, message),
            None => format!("{}: {} left today", app_id, format_duration(*remaining)),
        },
        CoreEvent::LimitReached { app_id, limit, .. } => format!(
            "{}: daily limit of {} reached",
            app_id,
            format_duration(*limit)
        ),
        CoreEvent::MotionRestrictionChanged { restricting, .. } => {
            if *restricting {
                "Walking restriction engaged".to_string()
            } else {
                "Walking restriction released".to_string()
            }
        }
        CoreEvent::ScheduleToggled {
            schedule_id,
            enabled,
        } => format!(
            "Schedule {} {}",
            schedule_id,
            if *enabled { "enabled" } else { "disabled" }
        ),
        CoreEvent::PolicyReloaded {
            schedule_count,
            limit_count,
        } => format!(
            "Policy reloaded ({} schedules, {} limits)",
            schedule_count, limit_count
        ),
    }
}

fn print_status(snapshot: &StatusSnapshot, usage: &[(AppId, Duration)]) {
    match &snapshot.downtime {
        Some(downtime) => {
            print!(
                "Downtime: {} ({})",
                downtime.name,
                describe_scope(&downtime.scope)
            );
            if let Some(end) = &downtime.ends_at {
                print!(" until {}", format_clock_time(end));
            }
            println!();
            if !downtime.overlapping.is_empty() {
                let ids: Vec<&str> = downtime.overlapping.iter().map(|s| s.as_str()).collect();
                println!("  also active: {}", ids.join(", "));
            }
        }
        None => println!("Downtime: none"),
    }

    if let Some((id, start)) = &snapshot.next_downtime {
        println!("Next downtime: {} at {}", id, start.format("%a %H:%M"));
    }

    println!(
        "Walking restriction: {}",
        if snapshot.motion.restricting { "on" } else { "off" }
    );

    if !snapshot.limits.is_empty() {
        println!("Limits:");
        for limit in &snapshot.limits {
            println!(
                "  {:<20} {} / {}{}",
                limit.app_id.as_str(),
                format_duration(limit.used),
                format_duration(limit.limit),
                if limit.exceeded { " (reached)" } else { "" }
            );
        }
    }

    if !usage.is_empty() {
        println!("Usage today:");
        for (app_id, used) in usage {
            println!("  {:<20} {}", app_id.as_str(), format_duration(*used));
        }
    }
}

fn print_audit(event: &AuditEvent) -> Result<()> {
    println!(
        "{}  {}",
        format_datetime_full(&event.timestamp),
        serde_json::to_string(&event.event)?
    );
    Ok(())
}

/// Apply one line of input from stdin to the running engine.
///
/// Accepted lines: `walking`, `stationary`, `usage <app> <seconds>`,
/// `enable <schedule>`, `disable <schedule>`.
fn handle_input(engine: &mut CoreEngine, line: &str) -> Result<Vec<CoreEvent>> {
    let now = kaisheng_util::now();
    let mut parts = line.split_whitespace();

    let events = match (parts.next(), parts.next(), parts.next()) {
        (None, _, _) => Vec::new(),
        (Some("walking"), None, _) => engine.report_motion(true, now).into_iter().collect(),
        (Some("stationary"), None, _) => engine.report_motion(false, now).into_iter().collect(),
        (Some("usage"), Some(app), Some(seconds)) => {
            let seconds: u64 = seconds
                .parse()
                .with_context(|| format!("Invalid seconds: {}", seconds))?;
            engine.record_usage(&AppId::new(app), Duration::from_secs(seconds), now)?
        }
        (Some("enable"), Some(id), None) => {
            vec![engine.set_schedule_enabled(&ScheduleId::new(id), true)?]
        }
        (Some("disable"), Some(id), None) => {
            vec![engine.set_schedule_enabled(&ScheduleId::new(id), false)?]
        }
        _ => bail!("Unrecognized input: {}", line),
    };

    Ok(events)
}

async fn run(
    mut engine: CoreEngine,
    store: Arc<dyn Store>,
    config_path: &Path,
    interval_override: Option<Duration>,
) -> Result<()> {
    store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;
    engine.audit_policy_loaded(kaisheng_util::now());

    let mut sigterm = signal(SignalKind::terminate())
        .context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt())
        .context("Failed to create SIGINT handler")?;
    let mut sighup = signal(SignalKind::hangup())
        .context("Failed to create SIGHUP handler")?;

    let mut interval = tick_interval(engine.policy(), interval_override);
    let mut tick_timer = tokio::time::interval(interval);
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    info!(interval_secs = interval.as_secs(), "Enforcement loop running");

    loop {
        let events = tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }

            // Data directory changes need a restart
            _ = sighup.recv() => match load_config(config_path) {
                Ok(policy) => {
                    let next = tick_interval(&policy, interval_override);
                    let event = engine.reload_policy(policy);
                    if next != interval {
                        info!(interval_secs = next.as_secs(), "Tick interval changed");
                        interval = next;
                        tick_timer = tokio::time::interval(next);
                    }
                    vec![event]
                }
                Err(e) => {
                    warn!(error = %e, "Reload failed, keeping current policy");
                    Vec::new()
                }
            },

            _ = tick_timer.tick() => engine.tick(kaisheng_util::now()),

            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) => match handle_input(&mut engine, &line) {
                    Ok(events) => events,
                    Err(e) => {
                        warn!(error = %e, "Ignoring input");
                        Vec::new()
                    }
                },
                Ok(None) => {
                    debug!("Input closed");
                    input_open = false;
                    Vec::new()
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    input_open = false;
                    Vec::new()
                }
            },
        };

        for event in &events {
            debug!(event = ?event, "Core event");
            println!(
                "[{}] {}",
                format_clock_time(&kaisheng_util::now()),
                describe_event(event)
            );
        }
    }

    store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped))?;
    info!("Enforcement loop stopped");
    Ok(())
}

/// The command-line override wins over the configured interval
fn tick_interval(policy: &Policy, interval_override: Option<Duration>) -> Duration {
    interval_override.unwrap_or(policy.service.tick_interval)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        mock_time = kaisheng_util::is_mock_time_active(),
        "kaisheng starting"
    );

    let (mut engine, store) = open(&args)?;
    let now = kaisheng_util::now();

    match args.command {
        Command::Status { json } => {
            let snapshot = engine.snapshot(now)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                let usage = store.get_usage_for_day(now.date_naive())?;
                print_status(&snapshot, &usage);
            }
        }
        Command::Check { app, walking } => {
            let app_id = AppId::new(app);
            let view = if walking {
                engine.evaluate_app_while_walking(&app_id, now)?
            } else {
                engine.evaluate_app(&app_id, now)?
            };
            if view.allowed {
                print!("{}: allowed", view.app_id);
                if let Some(remaining) = view.remaining_today {
                    print!(" ({} left today)", format_duration(remaining));
                }
                println!();
            } else {
                let reasons: Vec<String> = view.reasons.iter().map(describe_reason).collect();
                println!("{}: blocked ({})", view.app_id, reasons.join("; "));
            }
        }
        Command::Schedules => {
            for view in engine.schedules(now) {
                println!(
                    "{:<16} {:<36} {:<24} {}{}",
                    view.schedule_id.as_str(),
                    view.window,
                    describe_scope(&view.scope),
                    if view.enabled { "" } else { "disabled " },
                    if view.active { "active" } else { "" }
                );
            }
        }
        Command::Usage { app, seconds } => {
            let app_id = AppId::new(app);
            let events = engine.record_usage(&app_id, Duration::from_secs(seconds), now)?;
            for event in &events {
                println!("{}", describe_event(event));
            }
            if let Some(status) = engine.limit_status(&app_id, now)? {
                println!(
                    "{}: {} used, {} left today",
                    app_id,
                    format_duration(status.used),
                    format_duration(status.remaining)
                );
            }
        }
        Command::Audit { limit } => {
            for event in store.get_recent_audits(limit)? {
                print_audit(&event)?;
            }
        }
        Command::Run { interval_secs } => {
            let interval_override = match interval_secs {
                Some(0) => bail!("Tick interval must be positive"),
                secs => secs.map(Duration::from_secs),
            };
            run(engine, store, &args.config, interval_override).await?;
        }
    }

    Ok(())
}
