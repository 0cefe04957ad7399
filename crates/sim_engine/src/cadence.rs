//! Cadence gate — daily operation limits and the reset window.
//!
//! All reset logic lives here: `reset_if_due` is the single source of
//! truth for the 24 h window and is applied before every cadence
//! decision. The gate never resets early — at the cap with the window
//! still open, authorization is denied until the window elapses.

use chrono::{DateTime, Duration, Utc};
use common::config::CadenceConfig;
use common::{Error, Plan, Result};

#[derive(Debug, Clone)]
pub struct CadenceGate {
    cap: u32,
    window: Duration,
}

impl CadenceGate {
    pub fn new(config: &CadenceConfig) -> Self {
        Self {
            cap: config.daily_operation_cap.max(1),
            window: Duration::hours(config.reset_window_hours.max(1)),
        }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Whether the reset window has fully elapsed for this plan.
    pub fn reset_due(&self, plan: &Plan, now: DateTime<Utc>) -> bool {
        now - plan.last_reset_at >= self.window
    }

    /// Apply the daily reset if the window has elapsed. Returns whether
    /// a reset happened. The only place cadence counters go back to 0.
    pub fn reset_if_due(&self, plan: &mut Plan, now: DateTime<Utc>) -> bool {
        if self.reset_due(plan, now) {
            plan.operations_completed_today = 0;
            plan.last_reset_at = now;
            true
        } else {
            false
        }
    }

    /// Whether the plan may start a new operation at `now`: under the
    /// cap, or a reset is due (which `authorize` will apply first).
    pub fn can_start_operation(&self, plan: &Plan, now: DateTime<Utc>) -> bool {
        plan.operations_completed_today < self.cap || self.reset_due(plan, now)
    }

    /// Apply any due reset, then authorize or deny a new operation.
    ///
    /// Denial is expected control flow, surfaced to the user as a
    /// "locked until reset" condition.
    pub fn authorize(&self, plan: &mut Plan, now: DateTime<Utc>) -> Result<()> {
        self.reset_if_due(plan, now);
        if plan.operations_completed_today < self.cap {
            Ok(())
        } else {
            Err(Error::CadenceExhausted(format!(
                "plan {}: {}/{} daily operations used, locked until {}",
                plan.id,
                plan.operations_completed_today,
                self.cap,
                self.locked_until(plan)
            )))
        }
    }

    /// Count one completed operation against today's window.
    ///
    /// Callers are expected to `authorize` first; hitting the cap here
    /// means the caller skipped the check.
    pub fn record_operation_completed(&self, plan: &mut Plan, now: DateTime<Utc>) -> Result<()> {
        self.reset_if_due(plan, now);
        if plan.operations_completed_today >= self.cap {
            return Err(Error::CadenceExhausted(format!(
                "plan {}: daily cap {} already reached",
                plan.id, self.cap
            )));
        }
        plan.operations_completed_today += 1;
        Ok(())
    }

    /// When the current window ends and the counter resets.
    pub fn locked_until(&self, plan: &Plan) -> DateTime<Utc> {
        plan.last_reset_at + self.window
    }
}
