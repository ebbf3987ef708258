//! Downtime resolution
//!
//! Several schedules may be active at once (a device-wide bedtime that
//! overlaps an app-specific homework block, say). Exactly one of them is
//! enforced, chosen by most-restrictive-wins:
//!
//! 1. A device-wide block beats any app block.
//! 2. Among app blocks, more distinct blocked apps wins.
//! 3. Then the schedule that stays in force longer.
//! 4. Then the earlier schedule in configuration order.

use chrono::{DateTime, Local};
use kaisheng_api::{EnforcedDowntime, ScheduleView};
use kaisheng_config::DowntimeSchedule;
use kaisheng_util::ScheduleId;

/// Schedules active at `dt`, in configuration order
pub fn active_schedules<'a>(
    schedules: &'a [DowntimeSchedule],
    dt: &DateTime<Local>,
) -> Vec<&'a DowntimeSchedule> {
    schedules.iter().filter(|s| s.is_active_at(dt)).collect()
}

/// Ordering key; larger is more restrictive
fn restrictiveness(
    schedule: &DowntimeSchedule,
    dt: &DateTime<Local>,
) -> (bool, usize, Option<DateTime<Local>>) {
    (
        schedule.scope.is_device(),
        schedule.scope.blocked_app_count().unwrap_or(0),
        schedule.ends_at(dt),
    )
}

/// Resolve the single downtime policy enforced at `dt`
pub fn resolve(schedules: &[DowntimeSchedule], dt: &DateTime<Local>) -> Option<EnforcedDowntime> {
    let active = active_schedules(schedules, dt);

    // Strict comparison keeps the earlier schedule on ties
    let winner = active.iter().copied().reduce(|best, candidate| {
        if restrictiveness(candidate, dt) > restrictiveness(best, dt) {
            candidate
        } else {
            best
        }
    })?;

    let overlapping = active
        .iter()
        .filter(|s| s.id != winner.id)
        .map(|s| s.id.clone())
        .collect();

    Some(EnforcedDowntime {
        schedule_id: winner.id.clone(),
        name: winner.name.clone(),
        scope: winner.scope.clone(),
        ends_at: winner.ends_at(dt),
        overlapping,
    })
}

/// Earliest upcoming downtime start strictly after `dt`
pub fn next_downtime_start(
    schedules: &[DowntimeSchedule],
    dt: &DateTime<Local>,
) -> Option<(ScheduleId, DateTime<Local>)> {
    schedules
        .iter()
        .filter_map(|s| s.next_start_after(dt).map(|start| (s.id.clone(), start)))
        .reduce(|best, candidate| if candidate.1 < best.1 { candidate } else { best })
}

/// Listing of every schedule with its state at `dt`
pub fn schedule_views(schedules: &[DowntimeSchedule], dt: &DateTime<Local>) -> Vec<ScheduleView> {
    schedules
        .iter()
        .map(|s| ScheduleView {
            schedule_id: s.id.clone(),
            name: s.name.clone(),
            window: s.window.to_string(),
            scope: s.scope.clone(),
            enabled: s.enabled,
            active: s.is_active_at(dt),
            next_start: s.next_start_after(dt),
        })
        .collect()
}
