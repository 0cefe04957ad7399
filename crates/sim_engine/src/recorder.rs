//! Run recorder — the durable I/O boundary for finalized runs.
//!
//! Summaries arrive over a bounded channel and are written by a
//! dedicated task, so a slow write never stalls the tick loop of any
//! run. Failures are retried a bounded number of times with backoff,
//! then logged and dropped — the in-memory completion the user already
//! saw is never rolled back.

use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::RecorderConfig;
use common::{Result, RunSummary};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Durable append of a finished run and its balance update.
#[async_trait]
pub trait RunRecorder: Send + Sync {
    async fn record(&self, summary: &RunSummary) -> Result<()>;
}

/// Appends finalized runs to a day-keyed JSONL journal.
pub struct JsonlRunRecorder {
    dir: PathBuf,
}

impl JsonlRunRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn day_file_name(day: DateTime<Utc>) -> String {
        format!("runs-{}.jsonl", day.format("%Y-%m-%d"))
    }
}

#[async_trait]
impl RunRecorder for JsonlRunRecorder {
    async fn record(&self, summary: &RunSummary) -> Result<()> {
        create_dir_all(&self.dir)?;
        let line = serde_json::to_string(summary)?;
        let path = self.dir.join(Self::day_file_name(Utc::now()));
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

/// Discards summaries; used for dry runs.
pub struct NullRecorder;

#[async_trait]
impl RunRecorder for NullRecorder {
    async fn record(&self, summary: &RunSummary) -> Result<()> {
        debug!(
            "Dry-run: discarding summary for run {} ({}¢)",
            summary.run_id, summary.total_profit_cents
        );
        Ok(())
    }
}

/// Drain the summary channel, retrying failed writes with backoff.
pub fn spawn_recorder_task(
    recorder: Arc<dyn RunRecorder>,
    mut rx: mpsc::Receiver<RunSummary>,
    config: RecorderConfig,
) -> JoinHandle<()> {
    let max_attempts = config.max_attempts.max(1);
    let backoff = Duration::from_millis(config.retry_backoff_ms);

    tokio::spawn(async move {
        while let Some(summary) = rx.recv().await {
            for attempt in 1..=max_attempts {
                match recorder.record(&summary).await {
                    Ok(()) => {
                        info!(
                            "Recorded run {} for plan {}: {}¢ over {} operations",
                            summary.run_id,
                            summary.plan_id,
                            summary.total_profit_cents,
                            summary.operation_count
                        );
                        break;
                    }
                    Err(e) if attempt < max_attempts => {
                        warn!(
                            "Record attempt {}/{} for run {} failed: {}",
                            attempt, max_attempts, summary.run_id, e
                        );
                        sleep(backoff).await;
                    }
                    Err(e) => {
                        // Left for external reconciliation; the run's
                        // in-memory completion stands.
                        error!(
                            "Giving up on run {} after {} attempts: {}",
                            summary.run_id, max_attempts, e
                        );
                    }
                }
            }
        }
        info!("Recorder channel closed; recorder task exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::{Error, OpState, OperationRecord};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn make_summary(run_id: &str) -> RunSummary {
        RunSummary {
            run_id: run_id.into(),
            plan_id: "plan-1".into(),
            capital_cents: 10_000,
            daily_rate_pct: 2.5,
            total_profit_cents: 250,
            operation_count: 2,
            completed_count: 2,
            elapsed_secs: 50.0,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            operations: vec![OperationRecord {
                venue: "Kraken".into(),
                pair: "BTC/USDT".into(),
                profit_cents: 125,
                final_state: OpState::Completed,
            }],
        }
    }

    struct FlakyRecorder {
        fail_first: u32,
        attempts: AtomicU32,
        recorded: AtomicU32,
    }

    #[async_trait]
    impl RunRecorder for FlakyRecorder {
        async fn record(&self, _summary: &RunSummary) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.fail_first {
                return Err(Error::Persistence(format!("attempt {} failed", attempt)));
            }
            self.recorded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fast_config(max_attempts: u32) -> RecorderConfig {
        RecorderConfig {
            queue_depth: 8,
            max_attempts,
            retry_backoff_ms: 1,
            journal_dir: "RUNS".into(),
        }
    }

    #[test]
    fn test_day_file_name() {
        let day = Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        assert_eq!(
            JsonlRunRecorder::day_file_name(day),
            "runs-2026-08-06.jsonl"
        );
    }

    #[tokio::test]
    async fn test_jsonl_recorder_appends_parseable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonlRunRecorder::new(dir.path());

        recorder.record(&make_summary("r1")).await.unwrap();
        recorder.record(&make_summary("r2")).await.unwrap();

        let path = dir.path().join(JsonlRunRecorder::day_file_name(Utc::now()));
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RunSummary = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.run_id, "r1");
        assert_eq!(parsed.total_profit_cents, 250);
    }

    #[tokio::test]
    async fn test_recorder_task_retries_until_success() {
        let recorder = Arc::new(FlakyRecorder {
            fail_first: 2,
            attempts: AtomicU32::new(0),
            recorded: AtomicU32::new(0),
        });
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_recorder_task(recorder.clone(), rx, fast_config(3));

        tx.send(make_summary("r1")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(recorder.recorded.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recorder_task_gives_up_after_bounded_attempts() {
        let recorder = Arc::new(FlakyRecorder {
            fail_first: u32::MAX,
            attempts: AtomicU32::new(0),
            recorded: AtomicU32::new(0),
        });
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_recorder_task(recorder.clone(), rx, fast_config(3));

        tx.send(make_summary("r1")).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(recorder.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(recorder.recorded.load(Ordering::SeqCst), 0);
    }
}
