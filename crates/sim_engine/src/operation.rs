//! Exchange operation state machine.
//!
//! Pure per-leg lifecycle: progress advances by a fixed step per tick
//! and the state is derived from progress thresholds, so a state can
//! never regress. No I/O, no clock access.

use common::OpState;
use uuid::Uuid;

use crate::universe::VenueLeg;

/// Progress ceiling; an operation at this progress is `Completed`.
pub const PROGRESS_MAX: u8 = 100;

/// Progress threshold at which `Analyzing` becomes `Buying`.
const BUYING_AT: u8 = 30;

/// Progress threshold at which `Buying` becomes `Selling`.
const SELLING_AT: u8 = 70;

/// A single simulated venue leg within a run.
///
/// Created fresh per run and owned exclusively by the scheduler that
/// spawned it; never reused across runs.
#[derive(Debug, Clone)]
pub struct ExchangeOperation {
    pub id: String,
    pub venue: String,
    pub pair: String,
    /// Synthetic entry price in cents (display flavor only).
    pub buy_price_cents: i64,
    /// Synthetic exit price in cents (display flavor only).
    pub sell_price_cents: i64,
    pub spread_cents: i64,
    /// Exact profit share allotted by the allocator, in cents.
    pub profit_cents: i64,
    progress: u8,
    step: u8,
}

impl ExchangeOperation {
    /// Build an operation from a synthetic venue leg and its allotted
    /// profit share. `step` below 1 is clamped to 1.
    pub fn new(leg: VenueLeg, profit_cents: i64, step: u8) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            venue: leg.venue,
            pair: leg.pair,
            buy_price_cents: leg.buy_price_cents,
            sell_price_cents: leg.sell_price_cents,
            spread_cents: leg.spread_cents,
            profit_cents,
            progress: 0,
            step: step.max(1),
        }
    }

    /// Current progress, 0–100, monotone non-decreasing.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Lifecycle state, derived from progress.
    pub fn state(&self) -> OpState {
        if self.progress < BUYING_AT {
            OpState::Analyzing
        } else if self.progress < SELLING_AT {
            OpState::Buying
        } else if self.progress < PROGRESS_MAX {
            OpState::Selling
        } else {
            OpState::Completed
        }
    }

    /// Ticks left until completion, derived from remaining progress.
    ///
    /// Reaches 0 on exactly the tick progress reaches 100, keeping the
    /// countdown and the progress bar in lockstep.
    pub fn ticks_remaining(&self) -> u32 {
        let remaining = (PROGRESS_MAX - self.progress) as u32;
        remaining.div_ceil(self.step as u32)
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= PROGRESS_MAX
    }

    /// Advance one tick. Completed operations are a no-op.
    pub fn tick(&mut self) -> OpState {
        if !self.is_complete() {
            self.progress = self.progress.saturating_add(self.step).min(PROGRESS_MAX);
        }
        self.state()
    }
}
