//! Usage limit alerts

use kaisheng_api::WarningThreshold;
use kaisheng_config::AppLimit;
use std::time::Duration;

/// Something worth telling the user after usage grew
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitAlert {
    Warning {
        threshold: WarningThreshold,
        remaining: Duration,
    },
    Reached {
        used: Duration,
        limit: Duration,
    },
}

/// Alerts produced by usage growing from `before` to `after` on the same day.
///
/// Each threshold fires only on the report that crosses it, so replaying
/// the same day's reports never repeats an alert.
pub fn usage_alerts(limit: &AppLimit, before: Duration, after: Duration) -> Vec<LimitAlert> {
    if !limit.enabled || after <= before {
        return Vec::new();
    }

    let remaining = limit.daily_limit.saturating_sub(after);
    let reached = before < limit.daily_limit && after >= limit.daily_limit;

    let mut alerts: Vec<LimitAlert> = limit
        .crossed_warnings(before, after)
        .into_iter()
        // Warnings that land together with the ceiling would be noise
        .filter(|_| !reached)
        .map(|threshold| LimitAlert::Warning {
            threshold: threshold.clone(),
            remaining,
        })
        .collect();

    if reached {
        alerts.push(LimitAlert::Reached {
            used: after,
            limit: limit.daily_limit,
        });
    }

    alerts
}
