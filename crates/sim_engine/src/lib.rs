//! Operation simulation & earnings accrual engine.
//!
//! Simulates per-plan "arbitrage" runs: a set of exchange operations
//! advances through a progress lifecycle on a fixed tick, accrues an
//! exact share of the plan's contracted daily target, and feeds an
//! earnings ledger gated by a daily cadence limit.

pub mod allocator;
pub mod cadence;
pub mod operation;
pub mod recorder;
pub mod run;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod universe;

pub use allocator::ProfitAllocator;
pub use cadence::CadenceGate;
pub use operation::ExchangeOperation;
pub use recorder::{spawn_recorder_task, JsonlRunRecorder, NullRecorder, RunRecorder};
pub use run::{CompletionAggregator, Run, RunMode};
pub use scheduler::{OperationView, RunSnapshot, SimulationScheduler};
pub use service::{RunEvent, RunHandle, RunService, ServiceStats};
pub use store::PlanBook;
pub use universe::{UniverseBuilder, VenueLeg};
