//! Error types for the decision pipeline and its exchange collaborator.

use thiserror::Error;

/// Failure talking to the exchange: unreachable, timed out, or the venue
/// rejected the request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectivityError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The venue answered with a non-success status.
    #[error("{endpoint} rejected request ({status}): {message}")]
    Rejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The venue answered but the body could not be understood.
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ConnectivityError {
    pub fn transport(endpoint: &str, message: impl ToString) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    pub fn decode(endpoint: &str, message: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether repeating the same idempotent request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::Decode { .. } => false,
        }
    }
}

/// Errors that abort an evaluation cycle.
///
/// `BelowMinimum` and order submission failures are not here: they are
/// ordinary outcomes of a cycle and are recorded in the ledger instead.
#[derive(Debug, Error)]
pub enum BotError {
    /// Exchange unreachable or request rejected. Aborts the cycle with the
    /// session state left as it was after the previous cycle.
    #[error("connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    /// Not enough closes to warm up the oscillator.
    #[error("insufficient data: {available} closes, need at least {required}")]
    InsufficientData { available: usize, required: usize },

    /// Not enough oscillator values to detect a crossing.
    #[error("insufficient history: {available} oscillator values, need at least 2")]
    InsufficientHistory { available: usize },

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration sources could not be read or deserialized.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl BotError {
    /// The market simply has not produced enough candles yet.
    pub fn is_warming_up(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. } | Self::InsufficientHistory { .. }
        )
    }
}
