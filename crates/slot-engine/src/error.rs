//! Error types for spin resolution

use thiserror::Error;

use crate::coordinator::SpinPhase;

/// Game configuration could not be loaded or failed validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds a value the engine cannot run with
    #[error("Invalid config field `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    /// Document is not well-formed JSON/YAML or has the wrong shape
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a random source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RandomSourceError {
    #[error("Random source unavailable: {0}")]
    Unavailable(String),

    #[error("Random source timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid random request: {0}")]
    InvalidRequest(String),
}

/// Stop values could not be mapped onto the configured grid
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Stop count mismatch: expected {expected} reels, got {actual} values")]
    CountMismatch { expected: usize, actual: usize },
}

/// Per-request spin failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpinError {
    #[error("Invalid bet amount: {bet}")]
    InvalidBet { bet: f64 },

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("RNG unavailable: {0}")]
    RngUnavailable(#[source] RandomSourceError),

    #[error("Spin resolution failed: {0}")]
    Resolution(#[from] ResolutionError),
}

impl SpinError {
    /// Phase the spin was in when it failed
    pub fn phase(&self) -> SpinPhase {
        match self {
            SpinError::InvalidBet { .. } | SpinError::UnknownGame(_) => SpinPhase::Idle,
            SpinError::RngUnavailable(_) => SpinPhase::AwaitingRandomness,
            SpinError::Resolution(_) => SpinPhase::Resolving,
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, SpinError::RngUnavailable(_))
    }

    /// Stable snake_case name for transports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SpinError::InvalidBet { .. } => "invalid_bet",
            SpinError::UnknownGame(_) => "unknown_game",
            SpinError::RngUnavailable(_) => "rng_unavailable",
            SpinError::Resolution(_) => "resolution",
        }
    }
}

impl From<RandomSourceError> for SpinError {
    fn from(err: RandomSourceError) -> Self {
        SpinError::RngUnavailable(err)
    }
}

/// Result type for config loading
pub type ConfigResult<T> = Result<T, ConfigError>;
