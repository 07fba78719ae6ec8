//! Error types for the radio stream validator

use std::fmt;

/// Result type alias for request parsing and probe construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised before any validation I/O takes place
///
/// The validation pipeline itself never returns these: malformed requests
/// are turned into a `ValidationResult` with `status = error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL could not be parsed as an absolute URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// URL parsed but does not use http or https
    #[error("Unsupported URL scheme: {0} (expected http or https)")]
    UnsupportedScheme(String),

    /// Requested timeout outside the accepted range
    #[error(
        "Timeout out of range: {0}ms (must be between {min}ms and {max}ms)",
        min = crate::models::MIN_TIMEOUT_MS,
        max = crate::models::MAX_TIMEOUT_MS
    )]
    TimeoutOutOfRange(u64),

    /// HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error comes from caller-supplied parameters
    pub fn is_invalid_parameters(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_) | Self::UnsupportedScheme(_) | Self::TimeoutOutOfRange(_)
        )
    }
}

/// Network phase a [`ProbeError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePhase {
    Head,
    Sample,
}

impl fmt::Display for ProbePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbePhase::Head => f.write_str("HEAD request"),
            ProbePhase::Sample => f.write_str("Sample GET request"),
        }
    }
}

/// Outcome of a failed probe phase
///
/// These are expected failures: the orchestrator records them as warnings
/// or errors in the result instead of propagating them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// Deadline exceeded before a response arrived
    #[error("{phase} timed out after {after_ms}ms")]
    Timeout { phase: ProbePhase, after_ms: u64 },

    /// DNS, connect, TLS or other transport failure
    #[error("{phase} failed: {message}")]
    Network { phase: ProbePhase, message: String },

    /// Server answered with a status the phase cannot use
    #[error("{phase} returned HTTP {status}")]
    Status { phase: ProbePhase, status: u16 },

    /// Body read failed before any byte was collected
    #[error("{phase} body read failed: {message}")]
    Read { phase: ProbePhase, message: String },
}

impl ProbeError {
    /// Build a probe error from a reqwest failure
    ///
    /// reqwest reports its own per-request timeout through `is_timeout()`,
    /// which is mapped to [`ProbeError::Timeout`].
    pub fn from_reqwest(phase: ProbePhase, err: &reqwest::Error, budget_ms: u64) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                phase,
                after_ms: budget_ms,
            };
        }
        Self::Network {
            phase,
            message: describe_reqwest_error(err),
        }
    }

    /// Whether the failure was a deadline rather than a refusal
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn phase(&self) -> ProbePhase {
        match self {
            Self::Timeout { phase, .. }
            | Self::Network { phase, .. }
            | Self::Status { phase, .. }
            | Self::Read { phase, .. } => *phase,
        }
    }
}

/// Flatten a reqwest error and its sources into one line
fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = if err.is_connect() {
        "connection error".to_string()
    } else if err.is_redirect() {
        "too many redirects".to_string()
    } else {
        err.to_string()
    };

    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
