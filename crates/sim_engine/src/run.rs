//! Run lifecycle and completion aggregation.
//!
//! A `Run` is one scheduling session for a plan. The completion
//! aggregator watches scheduler snapshots and finalizes the run exactly
//! once: the `finalized` flag makes a second finalize unreachable even
//! if extra ticks arrive after completion.

use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{Error, OperationRecord, Result, RunSummary};
use serde::Serialize;
use uuid::Uuid;

use crate::scheduler::{RunSnapshot, SimulationScheduler};

/// How this run accrues against the plan's daily target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// All legs of a full run split the whole daily target.
    FullCycle,
    /// One cadence-gated operation accruing its slot's share.
    SingleOperation,
}

/// One scheduling session, from start to finalize.
pub struct Run {
    pub id: String,
    pub plan_id: String,
    pub mode: RunMode,
    pub capital_cents: i64,
    pub daily_rate_pct: f64,
    pub started_at: DateTime<Utc>,
    started_instant: Instant,
    finalized: bool,
}

impl Run {
    pub fn new(
        plan_id: impl Into<String>,
        mode: RunMode,
        capital_cents: i64,
        daily_rate_pct: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            plan_id: plan_id.into(),
            mode,
            capital_cents,
            daily_rate_pct,
            started_at: Utc::now(),
            started_instant: Instant::now(),
            finalized: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Flip the at-most-once flag; a second call is an invariant
    /// violation and reports `DoubleFinalize`.
    pub fn mark_finalized(&mut self) -> Result<()> {
        if self.finalized {
            return Err(Error::DoubleFinalize(self.id.clone()));
        }
        self.finalized = true;
        Ok(())
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started_instant.elapsed().as_secs_f64()
    }
}

/// Watches scheduler output and finalizes a run exactly once.
pub struct CompletionAggregator;

impl CompletionAggregator {
    /// Observe one published snapshot.
    ///
    /// Returns the run summary on the first snapshot where every
    /// operation is terminal; `None` before completion and on any
    /// snapshot after the run has been finalized.
    pub fn observe(
        run: &mut Run,
        scheduler: &mut SimulationScheduler,
        snapshot: &RunSnapshot,
    ) -> Option<RunSummary> {
        if !snapshot.all_complete() {
            return None;
        }
        // An extra tick can race in after completion; the flag wins.
        if run.mark_finalized().is_err() {
            return None;
        }
        scheduler.stop();
        Some(Self::summarize(run, snapshot))
    }

    fn summarize(run: &Run, snapshot: &RunSnapshot) -> RunSummary {
        RunSummary {
            run_id: run.id.clone(),
            plan_id: run.plan_id.clone(),
            capital_cents: run.capital_cents,
            daily_rate_pct: run.daily_rate_pct,
            total_profit_cents: snapshot.profit_so_far_cents,
            operation_count: snapshot.total_operations,
            completed_count: snapshot.completed_count,
            elapsed_secs: run.elapsed_secs(),
            started_at: run.started_at,
            finished_at: Utc::now(),
            operations: snapshot
                .operations
                .iter()
                .map(|op| OperationRecord {
                    venue: op.venue.clone(),
                    pair: op.pair.clone(),
                    profit_cents: op.profit_cents,
                    final_state: op.state,
                })
                .collect(),
        }
    }
}
