//! Error enums and the crate-wide `Result` alias.

use std::{fmt, io};

use super::shard::ShardFailureReport;

/// Crate-wide `Result` type using [`EsdumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, EsdumpError>;

/// Top-level error type for esdump operations.
///
/// Every variant is terminal for the pipeline that produced it. Nothing is
/// retried.
#[derive(Debug)]
pub enum EsdumpError {
    /// Network failure, unreadable body or non-success HTTP status.
    Transport(TransportError),

    /// The query is not a JSON object but slicing needs to augment it.
    MalformedQuery(String),

    /// The store's response envelope could not be parsed.
    MalformedResponse(String),

    /// The store reported at least one failed shard.
    ShardFailure(ShardFailureReport),

    /// Writing to the output destination failed.
    SinkWrite(io::Error),

    /// Configuration errors.
    Config(ConfigError),

    /// Command-line misuse detected before any request is sent.
    Usage(String),

    /// I/O errors outside of the output stream (e.g. reading a query file).
    Io(io::Error),

    /// The pipeline observed cancellation.
    Cancelled,

    /// A slice task panicked or was aborted.
    TaskFailed(String),
}

/// Transport-level errors.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be sent or no response was received
    /// (connection refused, timeout, TLS failure).
    Request {
        method: String,
        url: String,
        message: String,
    },

    /// The response body could not be read.
    Body(String),

    /// The store answered with a non-success status.
    ///
    /// The body is kept because degraded stores return structured shard
    /// failures alongside non-2xx statuses.
    Status {
        status: String,
        reason: Option<String>,
        body: Vec<u8>,
    },

    /// The HTTP client could not be constructed.
    Client(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for EsdumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EsdumpError::Transport(e) => write!(f, "Failed to query Elasticsearch: {e}"),
            EsdumpError::MalformedQuery(msg) => write!(f, "Failed to parse query: {msg}"),
            EsdumpError::MalformedResponse(msg) => {
                write!(f, "Failed to parse Elasticsearch response: {msg}")
            }
            EsdumpError::ShardFailure(report) => write!(f, "Shard failure: {report}"),
            EsdumpError::SinkWrite(e) => write!(f, "Failed to write entry: {e}"),
            EsdumpError::Config(e) => write!(f, "Configuration error: {e}"),
            EsdumpError::Usage(msg) => write!(f, "{msg}"),
            EsdumpError::Io(e) => write!(f, "I/O error: {e}"),
            EsdumpError::Cancelled => write!(f, "Operation cancelled"),
            EsdumpError::TaskFailed(msg) => write!(f, "Slice task failed: {msg}"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Request {
                method,
                url,
                message,
            } => write!(f, "{method} {url}: {message}"),
            TransportError::Body(msg) => write!(f, "failed to read response body: {msg}"),
            TransportError::Status { status, reason, .. } => match reason {
                Some(reason) => write!(f, "{status}: {reason}"),
                None => write!(f, "{status}"),
            },
            TransportError::Client(msg) => write!(f, "failed to build HTTP client: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for EsdumpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EsdumpError::Transport(e) => Some(e),
            EsdumpError::SinkWrite(e) | EsdumpError::Io(e) => Some(e),
            EsdumpError::Config(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for TransportError {}
impl std::error::Error for ConfigError {}

impl EsdumpError {
    /// Whether this error only reflects a cancellation triggered elsewhere.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EsdumpError::Cancelled)
    }
}

/* ========================= Conversions to EsdumpError ========================= */

impl From<io::Error> for EsdumpError {
    fn from(err: io::Error) -> Self {
        EsdumpError::Io(err)
    }
}

impl From<TransportError> for EsdumpError {
    fn from(err: TransportError) -> Self {
        EsdumpError::Transport(err)
    }
}

impl From<ConfigError> for EsdumpError {
    fn from(err: ConfigError) -> Self {
        EsdumpError::Config(err)
    }
}

impl From<ShardFailureReport> for EsdumpError {
    fn from(report: ShardFailureReport) -> Self {
        EsdumpError::ShardFailure(report)
    }
}
