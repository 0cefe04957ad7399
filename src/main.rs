//! Arbsim daemon entry point.
//!
//! Orchestrates the tasks:
//! 1. Recorder task (durable JSONL run journal)
//! 2. Per-plan run tasks, one per in-flight simulation
//! 3. Plan sweep loop (cadence-gated run starts) + heartbeat

mod config;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use common::{Error, Plan, PlanStatus, PlanTier};
use sim_engine::{
    spawn_recorder_task, JsonlRunRecorder, NullRecorder, PlanBook, RunRecorder, RunService,
};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::load_config;

/// Simulated arbitrage earnings daemon.
#[derive(Parser)]
#[command(name = "arbsim-bot", about = "Operation simulation & earnings accrual daemon")]
struct Cli {
    /// Simulate runs but discard summaries instead of recording them.
    #[arg(long)]
    dry_run: bool,

    /// Seed this many demo plans at startup (overrides config).
    #[arg(long)]
    demo_plans: Option<usize>,
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

fn seed_demo_plans(count: usize) -> Vec<Plan> {
    let tiers = [PlanTier::Starter, PlanTier::Growth, PlanTier::Pro];
    let capitals = [10_000i64, 50_000, 100_000];
    let rates = [2.5f64, 3.0, 3.5];

    (0..count)
        .map(|i| Plan {
            id: format!("plan-{:03}", i + 1),
            user_id: format!("user-{:03}", i % 2 + 1),
            capital_cents: capitals[i % capitals.len()],
            daily_rate_pct: rates[i % rates.len()],
            tier: tiers[i % tiers.len()],
            status: PlanStatus::Active,
            total_earned_cents: 0,
            operations_completed_today: 0,
            last_reset_at: Utc::now(),
        })
        .collect()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arbsim_bot=info,sim_engine=info".into()),
        )
        .init();

    info!("🚀 Arbsim daemon starting...");

    let cli = Cli::parse();
    if cli.dry_run {
        info!("Dry-run mode enabled: runs will simulate but nothing is recorded.");
    }
    let cfg = match load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Config error: {}", e);
            return;
        }
    };
    info!(
        "Engine config: tick={}ms step={} cap={}/day window={}h max_ops={}",
        cfg.sim.tick_interval_ms,
        cfg.sim.progress_step,
        cfg.cadence.daily_operation_cap,
        cfg.cadence.reset_window_hours,
        cfg.allocator.max_operations
    );

    // Plan book, seeded with demo plans.
    let plans = PlanBook::new();
    let seed_count = cli.demo_plans.unwrap_or(cfg.demo_plans);
    for plan in seed_demo_plans(seed_count) {
        info!(
            "Seeded plan {} ({:?}): {}¢ capital at {}%/day",
            plan.id, plan.tier, plan.capital_cents, plan.daily_rate_pct
        );
        plans.insert(plan).await;
    }

    // Recorder task: the only I/O boundary, fed over a bounded channel.
    let recorder: Arc<dyn RunRecorder> = if cli.dry_run {
        Arc::new(NullRecorder)
    } else {
        info!("Run journal path: {}", cfg.recorder.journal_dir);
        Arc::new(JsonlRunRecorder::new(&cfg.recorder.journal_dir))
    };
    let (summary_tx, summary_rx) = mpsc::channel(cfg.recorder.queue_depth.max(1));
    let recorder_task = spawn_recorder_task(recorder, summary_rx, cfg.recorder.clone());

    let service = RunService::new(cfg.engine(), plans.clone(), summary_tx);

    info!("Starting plan sweep loop...");
    let sweep_interval = Duration::from_secs(cfg.scan_interval_secs.max(1));
    let mut last_heartbeat = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received.");
                break;
            }
            _ = sleep(sweep_interval) => {
                for plan in service.plans().all().await {
                    if !plan.is_active() {
                        continue;
                    }
                    match service.start_run(&plan.id).await {
                        Ok(handle) => {
                            debug!("Run {} in flight for plan {}", handle.run_id, plan.id);
                        }
                        Err(Error::CadenceExhausted(msg)) => {
                            // Expected control flow: the plan is locked
                            // until its window resets.
                            debug!("{}", msg);
                        }
                        Err(Error::RunActive(_)) => {}
                        Err(e) => {
                            warn!("Plan {}: failed to start run: {}", plan.id, e);
                        }
                    }
                }

                if last_heartbeat.elapsed() >= HEARTBEAT_INTERVAL {
                    let stats = service.take_stats();
                    info!(
                        "HEARTBEAT: active_runs={} started={} completed={} cadence_denials={}",
                        service.active_run_count(),
                        stats.runs_started,
                        stats.runs_completed,
                        stats.cadence_denials
                    );
                    last_heartbeat = Instant::now();
                }
            }
        }
    }

    // Closing the service drops the last idle summary sender; the
    // recorder drains whatever in-flight runs still deliver.
    drop(service);
    match tokio::time::timeout(Duration::from_secs(5), recorder_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Recorder task panicked: {}", e),
        Err(_) => warn!("Recorder still draining in-flight runs; exiting anyway."),
    }
    info!("Shutdown complete.");
}
