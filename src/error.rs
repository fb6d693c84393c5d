use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("failed to read universe file {path}: {source}")]
    ReadUniverse {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse universe file {path}: {source}")]
    ParseUniverse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("universe exceeds {field}: {actual} > {limit}")]
    UniverseTooLarge {
        field: &'static str,
        actual: usize,
        limit: usize,
    },
}

/// Order submission errors. Any of these counts as one failed attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("invalid token ID '{token_id}': {reason}")]
    InvalidTokenId { token_id: String, reason: String },

    #[error("failed to build order: {0}")]
    OrderBuildFailed(String),

    #[error("failed to sign order: {0}")]
    SigningFailed(String),

    #[error("failed to submit order: {0}")]
    SubmissionFailed(String),

    #[error("only {filled} of {total} legs filled")]
    PartialFill { filled: usize, total: usize },
}

/// Reasons the execution gate declines a candidate.
///
/// These are expected outcomes, not failures; `Display` is the reason
/// string that ends up in the log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("execution halted: {reason}")]
    Halted { reason: String },

    #[error("fractional shares per leg not allowed: {shares}")]
    FractionalShares { shares: Decimal },

    #[error("too many legs: {legs} > {limit}")]
    TooManyLegs { legs: usize, limit: usize },

    #[error("daily execution cap reached: {limit}")]
    DailyExecutionCap { limit: u32 },

    #[error("daily notional cap exceeded: {current} + {additional} > {limit}")]
    DailyNotionalCap {
        current: Decimal,
        additional: Decimal,
        limit: Decimal,
    },

    #[error("open order cap exceeded: {current} + {additional} > {limit}")]
    OpenOrderCap {
        current: usize,
        additional: usize,
        limit: usize,
    },

    #[error("too many consecutive failures: {count} >= {limit}")]
    ConsecutiveFailures { count: u32, limit: u32 },

    #[error("basket in execution cooldown for {remaining_secs}s")]
    Cooldown { remaining_secs: i64 },

    #[error("pre-check failed for {token_id}: {reason}")]
    PrecheckFailed { token_id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("account query failed: {0}")]
    Account(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}
