//! Simulation scheduler.
//!
//! Owns the active set of exchange operations for one run, advances
//! every non-terminal operation on each tick, and republishes the
//! aggregate snapshot on a watch channel for observers (presentation
//! layer or tests). Deciding when a run is done is the completion
//! aggregator's job, not the scheduler's.

use common::OpState;
use serde::Serialize;
use tokio::sync::watch;

use crate::operation::ExchangeOperation;

/// Per-operation view copied out for observers.
#[derive(Debug, Clone, Serialize)]
pub struct OperationView {
    pub id: String,
    pub venue: String,
    pub pair: String,
    pub state: OpState,
    pub progress: u8,
    pub ticks_remaining: u32,
    pub profit_cents: i64,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
    pub spread_cents: i64,
}

/// Aggregate state published after every tick.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: String,
    pub tick: u64,
    pub completed_count: usize,
    pub total_operations: usize,
    /// Sum of completed operations' allotted profit, in cents.
    pub profit_so_far_cents: i64,
    pub operations: Vec<OperationView>,
}

impl RunSnapshot {
    pub fn all_complete(&self) -> bool {
        self.total_operations > 0 && self.completed_count == self.total_operations
    }
}

/// Tick-driven scheduler for one run's operations.
pub struct SimulationScheduler {
    run_id: String,
    operations: Vec<ExchangeOperation>,
    tick: u64,
    running: bool,
    snapshot_tx: watch::Sender<RunSnapshot>,
}

impl SimulationScheduler {
    pub fn new(run_id: impl Into<String>, operations: Vec<ExchangeOperation>) -> Self {
        let run_id = run_id.into();
        let initial = Self::snapshot_of(&run_id, 0, &operations);
        let (snapshot_tx, _) = watch::channel(initial);
        Self {
            run_id,
            operations,
            tick: 0,
            running: true,
            snapshot_tx,
        }
    }

    /// Subscribe to the published snapshot stream.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Advance every non-terminal operation one step and publish the
    /// resulting snapshot. A stopped scheduler republishes the current
    /// state without advancing.
    pub fn tick(&mut self) -> RunSnapshot {
        if self.running {
            self.tick += 1;
            for op in &mut self.operations {
                if !op.is_complete() {
                    op.tick();
                }
            }
        }
        let snapshot = Self::snapshot_of(&self.run_id, self.tick, &self.operations);
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn operations(&self) -> &[ExchangeOperation] {
        &self.operations
    }

    fn snapshot_of(run_id: &str, tick: u64, operations: &[ExchangeOperation]) -> RunSnapshot {
        let completed_count = operations.iter().filter(|op| op.is_complete()).count();
        let profit_so_far_cents = operations
            .iter()
            .filter(|op| op.is_complete())
            .map(|op| op.profit_cents)
            .sum();

        RunSnapshot {
            run_id: run_id.to_string(),
            tick,
            completed_count,
            total_operations: operations.len(),
            profit_so_far_cents,
            operations: operations
                .iter()
                .map(|op| OperationView {
                    id: op.id.clone(),
                    venue: op.venue.clone(),
                    pair: op.pair.clone(),
                    state: op.state(),
                    progress: op.progress(),
                    ticks_remaining: op.ticks_remaining(),
                    profit_cents: op.profit_cents,
                    buy_price_cents: op.buy_price_cents,
                    sell_price_cents: op.sell_price_cents,
                    spread_cents: op.spread_cents,
                })
                .collect(),
        }
    }
}
