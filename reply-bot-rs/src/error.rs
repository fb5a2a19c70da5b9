use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Error type the forum API uses to signal "slow down"
pub const RATE_LIMIT_ERROR_TYPE: &str = "RATELIMIT";

/// A single error entry reported by the forum API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorItem {
    /// Machine-readable category, e.g. `RATELIMIT`
    pub error_type: String,
    /// Human-readable explanation
    pub message: String,
    /// Request field the error refers to, if any
    pub field: Option<String>,
}

impl ApiErrorItem {
    pub fn new(error_type: &str, message: &str, field: Option<&str>) -> Self {
        Self {
            error_type: error_type.to_string(),
            message: message.to_string(),
            field: field.map(str::to_string),
        }
    }
}

impl fmt::Display for ApiErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}'", self.error_type, self.message)?;
        if let Some(field) = &self.field {
            write!(f, " on field '{}'", field)?;
        }
        Ok(())
    }
}

/// Structured rejection returned by the forum API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub items: Vec<ApiErrorItem>,
    /// Wait hint when the API exposes one as a number
    pub retry_after: Option<Duration>,
}

impl ApiFailure {
    pub fn new(items: Vec<ApiErrorItem>) -> Self {
        Self {
            items,
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Whether the first reported item is a rate-limit error
    pub fn is_rate_limit(&self) -> bool {
        self.items
            .first()
            .is_some_and(|item| item.error_type == RATE_LIMIT_ERROR_TYPE)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.items.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// Failures raised by the forum client collaborator
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, DNS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Token grant was rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    Decode(String),

    /// The API rejected the request with structured errors
    #[error("{0}")]
    Api(ApiFailure),
}

impl ClientError {
    /// Rate-limit failures get a longer, computed wait
    pub fn is_rate_limit(&self) -> bool {
        match self {
            ClientError::Api(failure) => failure.is_rate_limit(),
            ClientError::Status { status, .. } => *status == 429,
            _ => false,
        }
    }

    /// Structured wait hint, if the API gave one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::Api(failure) => failure.retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

/// Errors that can occur in the reply bot
#[derive(Error, Debug)]
pub enum BotError {
    /// Error reading or parsing the bot configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A trigger pattern is not a valid regular expression
    #[error("invalid trigger pattern '{pattern}': {source}")]
    InvalidTrigger {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The configuration lists no replies to choose from
    #[error("configuration error: reply pool is empty")]
    EmptyReplyPool,

    /// Error reading or appending the replied-comment ledger
    #[error("ledger I/O error: {0}")]
    LedgerError(#[source] std::io::Error),

    /// Error reading or applying the logging configuration
    #[error("logging configuration error: {0}")]
    LoggingConfigError(String),

    /// A required credential is not set in the environment
    #[error("missing credential: environment variable '{0}' is not set")]
    MissingCredential(String),

    /// Failure reported by the forum client
    #[error("forum client error: {0}")]
    Client(#[from] ClientError),
}

/// Result type alias for reply bot operations
pub type Result<T> = std::result::Result<T, BotError>;
