//! Configuration loader — merges env vars, .env file, and config.toml.

use common::config::{AllocatorConfig, CadenceConfig, EngineConfig, RecorderConfig, SimConfig};
use common::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Simulation parameters.
    #[serde(default)]
    pub sim: SimConfig,

    /// Daily cadence parameters.
    #[serde(default)]
    pub cadence: CadenceConfig,

    /// Profit allocator parameters.
    #[serde(default)]
    pub allocator: AllocatorConfig,

    /// Run recorder parameters.
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// Interval between plan sweeps, in seconds.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Demo plans seeded at startup.
    #[serde(default = "default_demo_plans")]
    pub demo_plans: usize,
}

fn default_scan_interval() -> u64 {
    5
}

fn default_demo_plans() -> usize {
    3
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            cadence: CadenceConfig::default(),
            allocator: AllocatorConfig::default(),
            recorder: RecorderConfig::default(),
            scan_interval_secs: default_scan_interval(),
            demo_plans: default_demo_plans(),
        }
    }
}

impl BotConfig {
    /// Assemble the engine's view of the configuration.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            sim: self.sim.clone(),
            cadence: self.cadence.clone(),
            allocator: self.allocator.clone(),
            recorder: self.recorder.clone(),
        }
    }
}

/// Load daemon configuration from environment and optional config file.
pub fn load_config() -> Result<BotConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = BotConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(dir) = std::env::var("RUNS_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            config.recorder.journal_dir = trimmed.to_string();
        }
    }
    if let Ok(ms) = std::env::var("TICK_INTERVAL_MS") {
        config.sim.tick_interval_ms = ms
            .parse()
            .map_err(|_| Error::Config(format!("Invalid TICK_INTERVAL_MS: {}", ms)))?;
    }
    if let Ok(secs) = std::env::var("SCAN_INTERVAL_SECS") {
        config.scan_interval_secs = secs
            .parse()
            .map_err(|_| Error::Config(format!("Invalid SCAN_INTERVAL_SECS: {}", secs)))?;
    }

    // 5. Validate ranges the engine depends on.
    if config.sim.progress_step == 0 || config.sim.progress_step > 100 {
        return Err(Error::Config(format!(
            "progress_step must be 1..=100, got {}",
            config.sim.progress_step
        )));
    }
    if config.sim.tick_interval_ms == 0 {
        return Err(Error::Config("tick_interval_ms must be at least 1".into()));
    }
    if config.cadence.daily_operation_cap == 0 {
        return Err(Error::Config(
            "daily_operation_cap must be at least 1".into(),
        ));
    }
    if config.cadence.reset_window_hours <= 0 {
        return Err(Error::Config("reset_window_hours must be positive".into()));
    }

    Ok(config)
}
