//! Run service — authorizes, launches, and supervises simulation runs.
//!
//! Each in-flight run is its own spawned task driven by a fixed
//! interval, so ticks within a run are strictly sequential and runs for
//! different plans never share mutable state. Finalized summaries are
//! handed to the recorder over a bounded channel; a user-initiated stop
//! cancels the task with no finalize and no record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{EngineConfig, Error, Plan, Result, RunSummary};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::allocator::ProfitAllocator;
use crate::cadence::CadenceGate;
use crate::operation::ExchangeOperation;
use crate::run::{CompletionAggregator, Run, RunMode};
use crate::scheduler::{RunSnapshot, SimulationScheduler};
use crate::store::PlanBook;
use crate::universe::UniverseBuilder;

/// Terminal events a run task reports to its caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunEvent {
    Completed {
        run_id: String,
        plan_id: String,
        total_profit_cents: i64,
    },
    Stopped {
        run_id: String,
        plan_id: String,
    },
}

/// Handle to one in-flight run.
///
/// `snapshots` is the presentation-facing stream; dropping the handle
/// leaves the run running unattended.
#[derive(Debug)]
pub struct RunHandle {
    pub run_id: String,
    pub plan_id: String,
    pub snapshots: watch::Receiver<RunSnapshot>,
    pub events: mpsc::Receiver<RunEvent>,
    pub task: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl RunHandle {
    /// User-initiated cancel: the run stops where it is, with no
    /// finalize and nothing recorded.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Engine counters since the last heartbeat.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct ServiceStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub cadence_denials: u64,
}

#[derive(Default)]
struct Counters {
    started: AtomicU64,
    completed: AtomicU64,
    denied: AtomicU64,
}

#[derive(Clone)]
pub struct RunService {
    config: EngineConfig,
    plans: PlanBook,
    gate: CadenceGate,
    summary_tx: mpsc::Sender<RunSummary>,
    /// plan id → run id of the single in-flight run for that plan.
    active: Arc<DashMap<String, String>>,
    counters: Arc<Counters>,
}

impl RunService {
    pub fn new(config: EngineConfig, plans: PlanBook, summary_tx: mpsc::Sender<RunSummary>) -> Self {
        let gate = CadenceGate::new(&config.cadence);
        Self {
            config,
            plans,
            gate,
            summary_tx,
            active: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn plans(&self) -> &PlanBook {
        &self.plans
    }

    pub fn gate(&self) -> &CadenceGate {
        &self.gate
    }

    pub fn active_run_count(&self) -> usize {
        self.active.len()
    }

    /// Drain the heartbeat counters.
    pub fn take_stats(&self) -> ServiceStats {
        ServiceStats {
            runs_started: self.counters.started.swap(0, Ordering::Relaxed),
            runs_completed: self.counters.completed.swap(0, Ordering::Relaxed),
            cadence_denials: self.counters.denied.swap(0, Ordering::Relaxed),
        }
    }

    /// Start a full run: the plan's whole daily target split across
    /// tier-sized legs.
    pub async fn start_run(&self, plan_id: &str) -> Result<RunHandle> {
        let plan = self.authorize(plan_id).await?;
        let others = self.plans.other_active_plans(&plan.user_id, &plan.id).await;
        let count = ProfitAllocator::operation_count(plan.tier, others)
            .min(self.config.allocator.max_operations)
            .max(1);
        let profits = ProfitAllocator::allocate(plan.capital_cents, plan.daily_rate_pct, count)?;
        self.launch(plan, profits, RunMode::FullCycle)
    }

    /// Start one cadence-gated operation accruing its slot's share of
    /// the daily target.
    pub async fn start_single_operation(&self, plan_id: &str) -> Result<RunHandle> {
        let plan = self.authorize(plan_id).await?;
        let profit = ProfitAllocator::single_operation_profit(
            plan.capital_cents,
            plan.daily_rate_pct,
            self.gate.cap(),
            plan.operations_completed_today,
        )?;
        self.launch(plan, vec![profit], RunMode::SingleOperation)
    }

    /// Cadence check under the plan book's write lock: reset-if-due,
    /// then authorize. Denials are expected control flow.
    async fn authorize(&self, plan_id: &str) -> Result<Plan> {
        let now = Utc::now();
        let gate = self.gate.clone();
        let result = self
            .plans
            .with_plan_mut(plan_id, |plan| {
                if !plan.is_active() {
                    return Err(Error::PlanInactive(plan.id.clone()));
                }
                gate.authorize(plan, now)?;
                Ok(plan.clone())
            })
            .await;

        if matches!(result, Err(Error::CadenceExhausted(_))) {
            self.counters.denied.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn launch(&self, plan: Plan, profits: Vec<i64>, mode: RunMode) -> Result<RunHandle> {
        let mut run = Run::new(
            plan.id.clone(),
            mode,
            plan.capital_cents,
            plan.daily_rate_pct,
        );
        let run_id = run.id.clone();
        let plan_id = plan.id.clone();
        let target_cents: i64 = profits.iter().sum();

        // One in-flight run per plan; a second concurrent start could
        // otherwise outrun the cadence counter.
        match self.active.entry(plan_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::RunActive(plan_id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(run_id.clone());
            }
        }

        let step = self.config.sim.progress_step.max(1);
        let tick_interval = Duration::from_millis(self.config.sim.tick_interval_ms.max(1));
        let operations: Vec<_> = UniverseBuilder::build(profits.len())
            .into_iter()
            .zip(profits)
            .map(|(leg, profit)| ExchangeOperation::new(leg, profit, step))
            .collect();

        let mut scheduler = SimulationScheduler::new(run_id.clone(), operations);
        let snapshots = scheduler.subscribe();

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let (event_tx, events) = mpsc::channel(8);

        info!(
            "Run {} started for plan {} ({:?}): {} operations, {}¢ target",
            run_id,
            plan_id,
            mode,
            scheduler.operations().len(),
            target_cents
        );
        self.counters.started.fetch_add(1, Ordering::Relaxed);

        let plans = self.plans.clone();
        let gate = self.gate.clone();
        let summary_tx = self.summary_tx.clone();
        let active = self.active.clone();
        let counters = self.counters.clone();
        let task_run_id = run_id.clone();
        let task_plan_id = plan_id.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            // The first interval tick fires immediately; consume it so
            // tick 1 lands one full interval after start.
            interval.tick().await;
            let mut stop_closed = false;

            loop {
                tokio::select! {
                    changed = stop_rx.changed(), if !stop_closed => {
                        match changed {
                            Ok(()) if *stop_rx.borrow() => {
                                info!(
                                    "Run {} stopped before completion; nothing recorded",
                                    task_run_id
                                );
                                active.remove(&task_plan_id);
                                let _ = event_tx.try_send(RunEvent::Stopped {
                                    run_id: task_run_id.clone(),
                                    plan_id: task_plan_id.clone(),
                                });
                                return;
                            }
                            Ok(()) => {}
                            // Handle dropped: the run continues unattended.
                            Err(_) => stop_closed = true,
                        }
                    }
                    _ = interval.tick() => {
                        let snapshot = scheduler.tick();
                        let Some(summary) =
                            CompletionAggregator::observe(&mut run, &mut scheduler, &snapshot)
                        else {
                            continue;
                        };

                        // Credit earnings and consume the cadence slot
                        // under one write lock.
                        let credited = plans
                            .with_plan_mut(&task_plan_id, |p| {
                                p.total_earned_cents += summary.total_profit_cents;
                                gate.record_operation_completed(p, Utc::now())
                            })
                            .await;
                        if let Err(e) = credited {
                            warn!(
                                "Run {}: crediting plan {} failed: {}",
                                task_run_id, task_plan_id, e
                            );
                        }

                        counters.completed.fetch_add(1, Ordering::Relaxed);
                        let total_profit_cents = summary.total_profit_cents;
                        if summary_tx.send(summary).await.is_err() {
                            warn!(
                                "Recorder channel closed; run {} summary dropped",
                                task_run_id
                            );
                        }

                        active.remove(&task_plan_id);
                        let _ = event_tx.try_send(RunEvent::Completed {
                            run_id: task_run_id.clone(),
                            plan_id: task_plan_id.clone(),
                            total_profit_cents,
                        });
                        return;
                    }
                }
            }
        });

        Ok(RunHandle {
            run_id,
            plan_id,
            snapshots,
            events,
            task,
            stop_tx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{CadenceConfig, SimConfig};
    use common::{PlanStatus, PlanTier};

    fn fast_config(cap: u32, step: u8) -> EngineConfig {
        EngineConfig {
            sim: SimConfig {
                tick_interval_ms: 1,
                progress_step: step,
            },
            cadence: CadenceConfig {
                daily_operation_cap: cap,
                reset_window_hours: 24,
            },
            ..EngineConfig::default()
        }
    }

    fn make_plan(id: &str, tier: PlanTier) -> Plan {
        Plan {
            id: id.into(),
            user_id: "user-1".into(),
            capital_cents: 10_000,
            daily_rate_pct: 2.5,
            tier,
            status: PlanStatus::Active,
            total_earned_cents: 0,
            operations_completed_today: 0,
            last_reset_at: Utc::now(),
        }
    }

    async fn make_service(cap: u32, step: u8) -> (RunService, mpsc::Receiver<RunSummary>) {
        let (tx, rx) = mpsc::channel(8);
        let plans = PlanBook::new();
        plans.insert(make_plan("p1", PlanTier::Starter)).await;
        (RunService::new(fast_config(cap, step), plans, tx), rx)
    }

    #[tokio::test]
    async fn test_full_run_completes_and_credits_plan() {
        let (service, mut rx) = make_service(2, 20).await;

        let mut handle = service.start_run("p1").await.unwrap();
        handle.task.await.unwrap();

        let summary = rx.recv().await.expect("summary should reach the recorder");
        assert_eq!(summary.plan_id, "p1");
        assert_eq!(summary.operation_count, 2);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.total_profit_cents, 250);

        let plan = service.plans().get("p1").await.unwrap();
        assert_eq!(plan.total_earned_cents, 250);
        assert_eq!(plan.operations_completed_today, 1);
        assert_eq!(service.active_run_count(), 0);

        match handle.events.recv().await {
            Some(RunEvent::Completed {
                total_profit_cents, ..
            }) => assert_eq!(total_profit_cents, 250),
            other => panic!("expected completion event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cadence_denies_after_cap_reached() {
        let (service, mut rx) = make_service(1, 50).await;

        let handle = service.start_run("p1").await.unwrap();
        handle.task.await.unwrap();
        rx.recv().await.unwrap();

        let err = service.start_run("p1").await.unwrap_err();
        assert!(matches!(err, Error::CadenceExhausted(_)));

        let stats = service.take_stats();
        assert_eq!(stats.runs_started, 1);
        assert_eq!(stats.runs_completed, 1);
        assert_eq!(stats.cadence_denials, 1);
    }

    #[tokio::test]
    async fn test_stop_cancels_without_recording() {
        // Long run: 50 ticks at 20ms each.
        let (tx, mut rx) = mpsc::channel(8);
        let plans = PlanBook::new();
        plans.insert(make_plan("p1", PlanTier::Starter)).await;
        let mut cfg = fast_config(2, 2);
        cfg.sim.tick_interval_ms = 20;
        let service = RunService::new(cfg, plans, tx);

        let mut handle = service.start_run("p1").await.unwrap();
        handle.stop();
        handle.task.await.unwrap();

        assert!(rx.try_recv().is_err(), "stopped run must not be recorded");
        let plan = service.plans().get("p1").await.unwrap();
        assert_eq!(plan.total_earned_cents, 0);
        assert_eq!(plan.operations_completed_today, 0);
        assert_eq!(service.active_run_count(), 0);

        match handle.events.recv().await {
            Some(RunEvent::Stopped { .. }) => {}
            other => panic!("expected stopped event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_concurrent_run_refused() {
        let (tx, _rx) = mpsc::channel(8);
        let plans = PlanBook::new();
        plans.insert(make_plan("p1", PlanTier::Starter)).await;
        let mut cfg = fast_config(2, 2);
        cfg.sim.tick_interval_ms = 20;
        let service = RunService::new(cfg, plans, tx);

        let handle = service.start_run("p1").await.unwrap();
        let err = service.start_run("p1").await.unwrap_err();
        assert!(matches!(err, Error::RunActive(_)));

        handle.stop();
        handle.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_single_operation_accrues_slot_share() {
        let (service, mut rx) = make_service(2, 50).await;

        let handle = service.start_single_operation("p1").await.unwrap();
        handle.task.await.unwrap();

        let summary = rx.recv().await.unwrap();
        assert_eq!(summary.operation_count, 1);
        // Half of the 250¢ daily target at cap=2.
        assert_eq!(summary.total_profit_cents, 125);

        let plan = service.plans().get("p1").await.unwrap();
        assert_eq!(plan.total_earned_cents, 125);
        assert_eq!(plan.operations_completed_today, 1);
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_plans_are_rejected() {
        let (service, _rx) = make_service(2, 50).await;
        assert!(matches!(
            service.start_run("missing").await.unwrap_err(),
            Error::PlanNotFound(_)
        ));

        let mut cancelled = make_plan("p2", PlanTier::Growth);
        cancelled.status = PlanStatus::Cancelled;
        service.plans().insert(cancelled).await;
        assert!(matches!(
            service.start_run("p2").await.unwrap_err(),
            Error::PlanInactive(_)
        ));
    }

    #[tokio::test]
    async fn test_operation_count_scales_with_other_active_plans() {
        let (tx, mut rx) = mpsc::channel(8);
        let plans = PlanBook::new();
        plans.insert(make_plan("p1", PlanTier::Starter)).await;
        plans.insert(make_plan("p2", PlanTier::Starter)).await;
        let service = RunService::new(fast_config(2, 50), plans, tx);

        let handle = service.start_run("p1").await.unwrap();
        handle.task.await.unwrap();

        let summary = rx.recv().await.unwrap();
        // Starter base 2 + 1 other active plan.
        assert_eq!(summary.operation_count, 3);
        assert_eq!(summary.total_profit_cents, 250);
    }
}
