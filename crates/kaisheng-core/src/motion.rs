//! Walking restriction gate
//!
//! Motion samples come from outside (a pedometer integration, or the CLI).
//! The gate turns the noisy walking/stationary signal into a restriction
//! that engages as soon as walking starts and lingers for the policy's
//! release delay after it stops.

use chrono::{DateTime, Local};
use kaisheng_api::{MotionState, MotionStatus};
use kaisheng_config::MotionPolicy;
use kaisheng_util::AppId;
use tracing::debug;

/// Change in whether the restriction is in force
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionTransition {
    Engaged,
    Released,
}

#[derive(Debug, Clone, Default)]
pub struct MotionGate {
    state: MotionState,
    restricting: bool,
    release_at: Option<DateTime<Local>>,
}

impl MotionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_restricting(&self) -> bool {
        self.restricting
    }

    /// Record a motion sample
    pub fn report(
        &mut self,
        walking: bool,
        now: DateTime<Local>,
        policy: &MotionPolicy,
    ) -> Option<MotionTransition> {
        if walking {
            self.state = MotionState::Walking;
            self.release_at = None;

            if policy.enabled && !self.restricting {
                self.restricting = true;
                debug!("Walking detected, restriction engaged");
                return Some(MotionTransition::Engaged);
            }
            return None;
        }

        if self.state == MotionState::Walking {
            self.state = MotionState::Stationary;
            if self.restricting {
                let delay = chrono::Duration::from_std(policy.release_delay)
                    .unwrap_or_else(|_| chrono::Duration::zero());
                let release_at = now + delay;
                self.release_at = Some(release_at);
                debug!(release_at = %release_at, "Walking stopped, release pending");
            }
        }

        self.poll(now)
    }

    /// Lift a pending restriction once its delay has elapsed
    pub fn poll(&mut self, now: DateTime<Local>) -> Option<MotionTransition> {
        match self.release_at {
            Some(release_at) if self.restricting && now >= release_at => {
                self.restricting = false;
                self.release_at = None;
                Some(MotionTransition::Released)
            }
            _ => None,
        }
    }

    /// Whether `app` is blocked by the walking restriction right now
    pub fn restricts(&self, app: &AppId, policy: &MotionPolicy) -> bool {
        self.restricting && policy.covers(app)
    }

    pub fn status(&self) -> MotionStatus {
        MotionStatus {
            state: self.state,
            restricting: self.restricting,
            release_at: self.release_at,
        }
    }
}
