// Forecasting error kinds surfaced to callers
use super::series::Granularity;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForecastError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("insufficient history: need at least {needed} periods, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("feature schema mismatch: model expects {expected:?}, row has {got:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("no {granularity} model available: {reason}")]
    ModelLoadFailure {
        granularity: Granularity,
        reason: String,
    },

    #[error("invalid horizon {requested}: must be between 1 and {max}")]
    InvalidHorizon { requested: i64, max: usize },

    #[error("unknown granularity '{0}' (expected 'daily' or 'monthly')")]
    UnknownGranularity(String),

    #[error("unknown forecast method '{0}' (expected 'gbdt' or 'arima')")]
    UnknownMethod(String),

    #[error("computation error: {0}")]
    Computation(String),
}
