//! Engine configuration types.

use serde::{Deserialize, Serialize};

/// Simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Interval between scheduler ticks in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Progress points added per tick (progress runs 0–100).
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
}

/// Daily cadence parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Max operations (runs or single accruals) per cadence window.
    #[serde(default = "default_daily_cap")]
    pub daily_operation_cap: u32,

    /// Cadence window length in hours.
    #[serde(default = "default_reset_window")]
    pub reset_window_hours: i64,
}

/// Profit allocator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Hard cap on operations per run, bounding scheduler load.
    #[serde(default = "default_max_operations")]
    pub max_operations: usize,
}

/// Run recorder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Bounded depth of the summary hand-off queue.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Max record attempts per summary before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff between record attempts in milliseconds.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Directory for the JSONL run journal.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: String,
}

/// Everything the run service needs to operate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sim: SimConfig,

    #[serde(default)]
    pub cadence: CadenceConfig,

    #[serde(default)]
    pub allocator: AllocatorConfig,

    #[serde(default)]
    pub recorder: RecorderConfig,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_tick_interval() -> u64 {
    1000
}
fn default_progress_step() -> u8 {
    2
}
fn default_daily_cap() -> u32 {
    2
}
fn default_reset_window() -> i64 {
    24
}
fn default_max_operations() -> usize {
    8
}
fn default_queue_depth() -> usize {
    64
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_backoff() -> u64 {
    500
}
fn default_journal_dir() -> String {
    "RUNS".into()
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            progress_step: default_progress_step(),
        }
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            daily_operation_cap: default_daily_cap(),
            reset_window_hours: default_reset_window(),
        }
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            journal_dir: default_journal_dir(),
        }
    }
}
