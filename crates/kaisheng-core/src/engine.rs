//! Core policy engine

use chrono::{DateTime, Local};
use kaisheng_api::{
    AppView, EnforcedDowntime, LimitStatus, MotionStatus, ReasonCode, ScheduleView,
    StatusSnapshot, API_VERSION,
};
use kaisheng_config::Policy;
use kaisheng_store::{AuditEvent, AuditEventType, Store};
use kaisheng_util::{AppId, KaishengError, Result, ScheduleId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    CoreEvent, LimitAlert, MotionGate, MotionTransition, next_downtime_start, resolve,
    schedule_views, usage_alerts,
};

/// The core policy engine
pub struct CoreEngine {
    policy: Policy,
    store: Arc<dyn Store>,
    motion: MotionGate,
    /// Downtime seen by the last tick
    enforced: Option<EnforcedDowntime>,
}

impl CoreEngine {
    /// Create a new core engine
    pub fn new(policy: Policy, store: Arc<dyn Store>) -> Self {
        info!(
            schedule_count = policy.schedules.len(),
            limit_count = policy.limits.len(),
            motion_enabled = policy.motion.enabled,
            "Core engine initialized"
        );

        Self {
            policy,
            store,
            motion: MotionGate::new(),
            enforced: None,
        }
    }

    /// Record the policy in force when enforcement starts
    pub fn audit_policy_loaded(&self, now: DateTime<Local>) {
        self.audit(
            now,
            AuditEventType::PolicyLoaded {
                schedule_count: self.policy.schedules.len(),
                limit_count: self.policy.limits.len(),
            },
        );
    }

    /// Get current policy
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Reload policy
    pub fn reload_policy(&mut self, policy: Policy) -> CoreEvent {
        let schedule_count = policy.schedules.len();
        let limit_count = policy.limits.len();
        self.policy = policy;

        self.audit(
            kaisheng_util::now(),
            AuditEventType::PolicyLoaded {
                schedule_count,
                limit_count,
            },
        );

        info!(schedule_count, limit_count, "Policy reloaded");

        CoreEvent::PolicyReloaded {
            schedule_count,
            limit_count,
        }
    }

    fn audit(&self, at: DateTime<Local>, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::at(at, event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }

    /// The single downtime policy in force at `now`
    pub fn enforced_downtime(&self, now: DateTime<Local>) -> Option<EnforcedDowntime> {
        resolve(&self.policy.schedules, &now)
    }

    /// Every configured schedule with its state at `now`
    pub fn schedules(&self, now: DateTime<Local>) -> Vec<ScheduleView> {
        schedule_views(&self.policy.schedules, &now)
    }

    /// Decide whether an app may be used at `now`
    pub fn evaluate_app(&self, app_id: &AppId, now: DateTime<Local>) -> Result<AppView> {
        self.evaluate_with_gate(app_id, now, &self.motion)
    }

    /// Like [`evaluate_app`](Self::evaluate_app), as if walking were
    /// reported at `now`. Neither the engine's motion state nor the audit
    /// log is touched.
    pub fn evaluate_app_while_walking(
        &self,
        app_id: &AppId,
        now: DateTime<Local>,
    ) -> Result<AppView> {
        let mut gate = self.motion.clone();
        gate.report(true, now, &self.policy.motion);
        self.evaluate_with_gate(app_id, now, &gate)
    }

    fn evaluate_with_gate(
        &self,
        app_id: &AppId,
        now: DateTime<Local>,
        gate: &MotionGate,
    ) -> Result<AppView> {
        let mut reasons = Vec::new();

        if let Some(downtime) = self.enforced_downtime(now)
            && downtime.blocks(app_id)
        {
            reasons.push(ReasonCode::Downtime {
                schedule_id: downtime.schedule_id,
                name: downtime.name,
                ends_at: downtime.ends_at,
            });
        }

        let limit_status = self.limit_status(app_id, now)?;
        if let Some(status) = &limit_status
            && status.exceeded
        {
            reasons.push(ReasonCode::LimitReached {
                used: status.used,
                limit: status.limit,
            });
        }

        if gate.restricts(app_id, &self.policy.motion) {
            reasons.push(ReasonCode::WalkingRestriction);
        }

        Ok(AppView {
            app_id: app_id.clone(),
            allowed: reasons.is_empty(),
            reasons,
            remaining_today: limit_status.map(|s| s.remaining),
        })
    }

    /// Today's usage against the app's limit, if it has one
    pub fn limit_status(&self, app_id: &AppId, now: DateTime<Local>) -> Result<Option<LimitStatus>> {
        let Some(limit) = self.policy.get_limit(app_id) else {
            return Ok(None);
        };
        let used = self.store.get_usage(app_id, now.date_naive())?;
        Ok(Some(limit.status(used)))
    }

    /// Record foreground usage of an app.
    ///
    /// Usage is booked against the local day of `now`, whether or not the
    /// app has a limit.
    pub fn record_usage(
        &mut self,
        app_id: &AppId,
        duration: Duration,
        now: DateTime<Local>,
    ) -> Result<Vec<CoreEvent>> {
        let day = now.date_naive();
        let before = self.store.get_usage(app_id, day)?;
        let after = self.store.add_usage(app_id, day, duration)?;

        debug!(
            app_id = %app_id,
            added_secs = duration.as_secs(),
            total_secs = after.as_secs(),
            "Usage recorded"
        );

        let Some(limit) = self.policy.get_limit(app_id) else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        for alert in usage_alerts(limit, before, after) {
            match alert {
                LimitAlert::Warning {
                    threshold,
                    remaining,
                } => {
                    info!(
                        app_id = %app_id,
                        threshold_seconds = threshold.seconds_before,
                        remaining_secs = remaining.as_secs(),
                        "Limit warning"
                    );
                    self.audit(
                        now,
                        AuditEventType::LimitWarning {
                            app_id: app_id.clone(),
                            remaining,
                        },
                    );
                    events.push(CoreEvent::LimitWarning {
                        app_id: app_id.clone(),
                        remaining,
                        severity: threshold.severity,
                        message: threshold.message_template,
                    });
                }
                LimitAlert::Reached { used, limit } => {
                    info!(
                        app_id = %app_id,
                        used_secs = used.as_secs(),
                        limit_secs = limit.as_secs(),
                        "Daily limit reached"
                    );
                    self.audit(
                        now,
                        AuditEventType::LimitReached {
                            app_id: app_id.clone(),
                            used,
                        },
                    );
                    events.push(CoreEvent::LimitReached {
                        app_id: app_id.clone(),
                        used,
                        limit,
                    });
                }
            }
        }

        Ok(events)
    }

    /// Record a motion sample
    pub fn report_motion(&mut self, walking: bool, now: DateTime<Local>) -> Option<CoreEvent> {
        let transition = self.motion.report(walking, now, &self.policy.motion)?;
        Some(self.motion_event(transition, now))
    }

    fn motion_event(&self, transition: MotionTransition, now: DateTime<Local>) -> CoreEvent {
        let restricting = transition == MotionTransition::Engaged;
        info!(restricting, "Walking restriction changed");
        self.audit(now, AuditEventType::MotionRestriction { restricting });
        CoreEvent::MotionRestrictionChanged {
            restricting,
            at: now,
        }
    }

    pub fn motion_status(&self) -> MotionStatus {
        self.motion.status()
    }

    /// Re-evaluate time-driven state: downtime transitions and delayed
    /// motion release
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        let current = self.enforced_downtime(now);

        match (&self.enforced, &current) {
            (None, Some(downtime)) => {
                info!(
                    schedule_id = %downtime.schedule_id,
                    device_wide = downtime.scope.is_device(),
                    "Downtime started"
                );
                self.audit(
                    now,
                    AuditEventType::DowntimeStarted {
                        schedule_id: downtime.schedule_id.clone(),
                        device_wide: downtime.scope.is_device(),
                    },
                );
                events.push(CoreEvent::DowntimeStarted {
                    downtime: downtime.clone(),
                });
            }
            (Some(previous), None) => {
                info!(schedule_id = %previous.schedule_id, "Downtime ended");
                self.audit(
                    now,
                    AuditEventType::DowntimeEnded {
                        schedule_id: previous.schedule_id.clone(),
                    },
                );
                events.push(CoreEvent::DowntimeEnded {
                    schedule_id: previous.schedule_id.clone(),
                    name: previous.name.clone(),
                });
            }
            (Some(previous), Some(downtime)) if previous.schedule_id != downtime.schedule_id => {
                info!(
                    from = %previous.schedule_id,
                    to = %downtime.schedule_id,
                    "Enforced downtime changed"
                );
                self.audit(
                    now,
                    AuditEventType::DowntimeEnded {
                        schedule_id: previous.schedule_id.clone(),
                    },
                );
                self.audit(
                    now,
                    AuditEventType::DowntimeStarted {
                        schedule_id: downtime.schedule_id.clone(),
                        device_wide: downtime.scope.is_device(),
                    },
                );
                events.push(CoreEvent::DowntimeChanged {
                    previous: previous.schedule_id.clone(),
                    downtime: downtime.clone(),
                });
            }
            _ => {}
        }
        self.enforced = current;

        if let Some(transition) = self.motion.poll(now) {
            events.push(self.motion_event(transition, now));
        }

        events
    }

    /// Enable or disable a schedule until the next policy reload
    pub fn set_schedule_enabled(&mut self, schedule_id: &ScheduleId, enabled: bool) -> Result<CoreEvent> {
        let schedule = self
            .policy
            .get_schedule_mut(schedule_id)
            .ok_or_else(|| KaishengError::ScheduleNotFound(schedule_id.clone()))?;
        schedule.enabled = enabled;

        info!(schedule_id = %schedule_id, enabled, "Schedule toggled");
        self.audit(
            kaisheng_util::now(),
            AuditEventType::ScheduleToggled {
                schedule_id: schedule_id.clone(),
                enabled,
            },
        );

        Ok(CoreEvent::ScheduleToggled {
            schedule_id: schedule_id.clone(),
            enabled,
        })
    }

    /// Get current status snapshot
    pub fn snapshot(&self, now: DateTime<Local>) -> Result<StatusSnapshot> {
        let today = now.date_naive();
        let mut limits = Vec::with_capacity(self.policy.limits.len());
        for limit in self.policy.limits.iter().filter(|l| l.enabled) {
            let used = self.store.get_usage(&limit.app_id, today)?;
            limits.push(limit.status(used));
        }

        Ok(StatusSnapshot {
            api_version: API_VERSION,
            at: now,
            downtime: self.enforced_downtime(now),
            next_downtime: next_downtime_start(&self.policy.schedules, &now),
            motion: self.motion.status(),
            limits,
        })
    }
}
