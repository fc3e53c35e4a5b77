//! alert.rs — Cooldown gate in front of caregiver notifications.
//!
//! Scores wobble call to call; caregivers should not be paged twice for the
//! same ongoing situation. Only warning/critical results are alertable at
//! all, repeats inside the cooldown window are swallowed, and an escalation
//! (warning → critical) always passes regardless of the window.

use chrono::{DateTime, Duration, Utc};

use crate::indicator::RiskLevel;
use crate::telemetry;

#[derive(Debug, Clone)]
pub struct AlertGate {
    cooldown: Duration,
    pub last_alert_at: Option<DateTime<Utc>>,
    pub last_level: Option<RiskLevel>,
}

impl AlertGate {
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_secs.max(0)),
            last_alert_at: None,
            last_level: None,
        }
    }

    /// Returns true if the new result should page someone at time `now`.
    pub fn should_alert(&self, level: RiskLevel, now: DateTime<Utc>) -> bool {
        if !level.is_actionable() {
            return false;
        }
        match (self.last_alert_at, self.last_level) {
            (None, _) => true, // first actionable result after a quiet period
            (Some(last_at), last_level) => {
                if now - last_at >= self.cooldown {
                    return true;
                }
                // During cooldown only an escalation passes.
                match last_level.and_then(RiskLevel::severity) {
                    Some(prev) => level.severity().unwrap_or(0) > prev,
                    None => true,
                }
            }
        }
    }

    pub fn record_alert(&mut self, level: RiskLevel, now: DateTime<Utc>) {
        self.last_level = Some(level);
        self.last_alert_at = Some(now);
    }

    /// Gate + bookkeeping in one step: records the alert when it passes and
    /// counts the suppression when an actionable level is swallowed.
    pub fn evaluate(&mut self, level: RiskLevel, now: DateTime<Utc>) -> bool {
        let pass = self.should_alert(level, now);
        if pass {
            self.record_alert(level, now);
        } else if level.is_actionable() {
            tracing::debug!(
                target: "alert",
                level = %level,
                "actionable result suppressed by cooldown"
            );
            telemetry::record_suppressed_alert();
        }
        pass
    }
}
