//! Unified error type for the arbsim engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    #[error("Cadence exhausted: {0}")]
    CadenceExhausted(String),

    #[error("Run already finalized: {0}")]
    DoubleFinalize(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Plan is not active: {0}")]
    PlanInactive(String),

    #[error("Run already in flight for plan: {0}")]
    RunActive(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
