//! Domain types shared across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Plan Types ────────────────────────────────────────────────────────

/// Subscription tier of an investment plan.
///
/// The tier determines the base number of exchange operations a full
/// run schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Starter,
    Growth,
    Pro,
}

impl PlanTier {
    /// Base operation count for a full run at this tier.
    pub fn base_operation_count(self) -> usize {
        match self {
            PlanTier::Starter => 2,
            PlanTier::Growth => 3,
            PlanTier::Pro => 4,
        }
    }
}

/// Lifecycle status of a plan. Transitions to a terminal status are
/// driven externally; the engine only simulates for `Active` plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    Completed,
    Cancelled,
}

/// An investment plan as held by the user's investment record.
///
/// Cadence fields (`operations_completed_today`, `last_reset_at`) are
/// mutated only through the cadence gate, under the plan book's write
/// lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub user_id: String,
    /// Invested capital in cents.
    pub capital_cents: i64,
    /// Contracted daily yield, percent of capital (e.g. 2.5).
    pub daily_rate_pct: f64,
    pub tier: PlanTier,
    pub status: PlanStatus,
    /// Lifetime earnings in cents.
    #[serde(default)]
    pub total_earned_cents: i64,
    /// Operations completed since the last cadence reset.
    #[serde(default)]
    pub operations_completed_today: u32,
    /// Start of the current cadence window.
    pub last_reset_at: DateTime<Utc>,
}

impl Plan {
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }
}

// ── Operation Types ───────────────────────────────────────────────────

/// Lifecycle state of a simulated exchange operation.
///
/// Strict forward order; state is derived from progress and can never
/// regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpState {
    Analyzing,
    Buying,
    Selling,
    Completed,
}

impl OpState {
    pub fn is_terminal(self) -> bool {
        self == OpState::Completed
    }

    pub fn label(self) -> &'static str {
        match self {
            OpState::Analyzing => "analyzing",
            OpState::Buying => "buying",
            OpState::Selling => "selling",
            OpState::Completed => "completed",
        }
    }
}

// ── Run Summary Types ─────────────────────────────────────────────────

/// Per-operation breakdown line in a finalized run summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    pub venue: String,
    pub pair: String,
    /// Allotted profit in cents.
    pub profit_cents: i64,
    pub final_state: OpState,
}

/// The durable record of one finalized run, handed to the run recorder
/// exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub plan_id: String,
    pub capital_cents: i64,
    pub daily_rate_pct: f64,
    /// Sum of completed operations' allotted profit, in cents.
    pub total_profit_cents: i64,
    pub operation_count: usize,
    pub completed_count: usize,
    pub elapsed_secs: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub operations: Vec<OperationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_base_counts() {
        assert_eq!(PlanTier::Starter.base_operation_count(), 2);
        assert_eq!(PlanTier::Growth.base_operation_count(), 3);
        assert_eq!(PlanTier::Pro.base_operation_count(), 4);
    }

    #[test]
    fn test_op_state_forward_order() {
        assert!(OpState::Analyzing < OpState::Buying);
        assert!(OpState::Buying < OpState::Selling);
        assert!(OpState::Selling < OpState::Completed);
        assert!(OpState::Completed.is_terminal());
        assert!(!OpState::Selling.is_terminal());
    }

    #[test]
    fn test_op_state_serde_labels() {
        let json = serde_json::to_string(&OpState::Buying).unwrap();
        assert_eq!(json, "\"buying\"");
        assert_eq!(OpState::Buying.label(), "buying");
    }
}
