use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Raw failure reported by an exchange client, before classification.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The exchange rejected the request with a numeric error code.
    #[error("api error {code}: {message}")]
    Api {
        code: i64,
        message: String,
        /// Server-suggested wait taken from the `Retry-After` header.
        retry_after: Option<Duration>,
    },
    /// Order submission failed without an exchange error code.
    #[error("order error: {0}")]
    Order(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("other error: {0}")]
    Other(String),
}

/// Flat view of the classified error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConnectionFailure,
    RateLimited,
    InvalidRequest,
    InsufficientBalance,
    OrderRejected,
    OrderPlacementFailure,
    Unclassified,
}

impl ErrorKind {
    /// Deterministic rejections: sending the same request again cannot succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ErrorKind::InvalidRequest
                | ErrorKind::InsufficientBalance
                | ErrorKind::OrderPlacementFailure
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionFailure => "connection_failure",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InsufficientBalance => "insufficient_balance",
            ErrorKind::OrderRejected => "order_rejected",
            ErrorKind::OrderPlacementFailure => "order_placement_failure",
            ErrorKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified error returned by the trading facade.
///
/// `code` is the raw exchange error code when the failure came from the
/// exchange; validation failures never carry one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradingError {
    #[error("{}", coded(.code, .message))]
    ConnectionFailure { message: String, code: Option<i64> },

    #[error("{}", coded(.code, .message))]
    RateLimited {
        message: String,
        code: Option<i64>,
        retry_after: Option<Duration>,
    },

    #[error("{}", coded(.code, .message))]
    InvalidRequest {
        message: String,
        code: Option<i64>,
        field: Option<String>,
        value: Option<String>,
    },

    #[error("{}", coded(.code, .message))]
    InsufficientBalance {
        message: String,
        code: Option<i64>,
        required: Option<f64>,
        available: Option<f64>,
    },

    #[error("{}", coded(.code, .message))]
    OrderRejected {
        message: String,
        code: Option<i64>,
        order_id: Option<u64>,
    },

    #[error("{message}")]
    OrderPlacement { message: String },

    #[error("{}", coded(.code, .message))]
    Unclassified { message: String, code: Option<i64> },
}

fn coded(code: &Option<i64>, message: &str) -> String {
    match code {
        Some(code) => format!("[{}] {}", code, message),
        None => message.to_string(),
    }
}

impl TradingError {
    /// Validation failure on a single input field.
    pub fn invalid_field(
        field: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        TradingError::InvalidRequest {
            message: message.into(),
            code: None,
            field: Some(field.into()),
            value: Some(value.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TradingError::ConnectionFailure { .. } => ErrorKind::ConnectionFailure,
            TradingError::RateLimited { .. } => ErrorKind::RateLimited,
            TradingError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            TradingError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            TradingError::OrderRejected { .. } => ErrorKind::OrderRejected,
            TradingError::OrderPlacement { .. } => ErrorKind::OrderPlacementFailure,
            TradingError::Unclassified { .. } => ErrorKind::Unclassified,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TradingError::ConnectionFailure { message, .. }
            | TradingError::RateLimited { message, .. }
            | TradingError::InvalidRequest { message, .. }
            | TradingError::InsufficientBalance { message, .. }
            | TradingError::OrderRejected { message, .. }
            | TradingError::OrderPlacement { message }
            | TradingError::Unclassified { message, .. } => message,
        }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            TradingError::ConnectionFailure { code, .. }
            | TradingError::RateLimited { code, .. }
            | TradingError::InvalidRequest { code, .. }
            | TradingError::InsufficientBalance { code, .. }
            | TradingError::OrderRejected { code, .. }
            | TradingError::Unclassified { code, .. } => *code,
            TradingError::OrderPlacement { .. } => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Attaches the amounts an `InsufficientBalance` was about; other kinds
    /// are returned unchanged.
    pub fn with_balance(self, required: Option<f64>, available: Option<f64>) -> Self {
        match self {
            TradingError::InsufficientBalance { message, code, .. } => {
                TradingError::InsufficientBalance {
                    message,
                    code,
                    required,
                    available,
                }
            }
            other => other,
        }
    }

    /// `(required, available)` of an `InsufficientBalance`.
    pub fn balance(&self) -> Option<(Option<f64>, Option<f64>)> {
        match self {
            TradingError::InsufficientBalance {
                required,
                available,
                ..
            } => Some((*required, *available)),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TradingError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Offending field of an `InvalidRequest`.
    pub fn field(&self) -> Option<&str> {
        match self {
            TradingError::InvalidRequest { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
