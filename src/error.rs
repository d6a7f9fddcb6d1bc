//! Error types shared by the market core.

use thiserror::Error;

/// Fatal errors raised by the market core.
///
/// Solver non-convergence is deliberately not part of this enum: it is a
/// recoverable [`SolverError`](crate::solver::SolverError) handled inside the
/// coordinator.
#[derive(Debug, Error, PartialEq)]
pub enum MarketError {
    /// Invalid configuration or pre-built user state.
    #[error("configuration error: {field}: {message}")]
    Configuration { field: String, message: String },

    /// A strategy vector whose length is not `appliance_count + 1`.
    #[error("invalid strategy shape: expected {expected} components, got {actual}")]
    InvalidStrategyShape { expected: usize, actual: usize },
}

impl MarketError {
    pub(crate) fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
