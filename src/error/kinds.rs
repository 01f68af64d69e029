use std::{fmt, io};

use crate::error::mongo::describe_mongodb_error;

/// Crate-wide `Result` type using [`QueryError`] as the error.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Top-level error type for the query pipeline.
///
/// Wraps the stage-specific error kinds so every public entry point can
/// return a single error type.
#[derive(Debug)]
pub enum QueryError {
    /// Query text could not be tokenized or compiled.
    Parse(ParseError),

    /// The document store rejected or failed an operation.
    Execution(ExecutionError),

    /// Configuration errors.
    Config(ConfigError),

    /// Connection errors.
    Connection(ConnectionError),

    /// I/O errors (outcome persistence, config files).
    Io(io::Error),

    /// Serialization errors.
    Json(serde_json::Error),
}

/// Errors raised before anything reaches the document store.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Surface syntax does not match `db.<collection>.<method>(<args>)...`.
    MalformedQuery(String),

    /// An argument fragment could not be repaired into valid structured data.
    InvalidQueryContent { fragment: String, reason: String },

    /// Method name is not part of the recognized set.
    UnsupportedMethod(String),
}

/// Errors raised while running compiled operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// The store rejected or failed the operation.
    Failed(String),

    /// A cursor method received an argument that is not an integer.
    InvalidCursorArgument { method: String, value: String },
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

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Invalid connection URI or client options.
    InvalidUri(String),

    /// Failed to reach the server.
    ConnectionFailed(String),
}

impl QueryError {
    /// Whether the failure happened before the store was contacted.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, QueryError::Parse(_))
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Parse(e) => write!(f, "{e}"),
            QueryError::Execution(e) => write!(f, "{e}"),
            QueryError::Config(e) => write!(f, "Configuration error: {e}"),
            QueryError::Connection(e) => write!(f, "Connection error: {e}"),
            QueryError::Io(e) => write!(f, "I/O error: {e}"),
            QueryError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedQuery(msg) => write!(f, "Malformed query: {msg}"),
            ParseError::InvalidQueryContent { fragment, reason } => {
                write!(f, "Invalid query content '{fragment}': {reason}")
            }
            ParseError::UnsupportedMethod(method) => write!(f, "Unsupported method: {method}"),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Failed(msg) => write!(f, "{msg}"),
            ExecutionError::InvalidCursorArgument { method, value } => {
                write!(f, "{method}() requires an integer, got '{value}'")
            }
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

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidUri(msg) => write!(f, "Invalid connection URI: {msg}"),
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Io(e) => Some(e),
            QueryError::Json(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for ParseError {}
impl std::error::Error for ExecutionError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ConnectionError {}

/* ========================= Conversions to QueryError ========================= */

impl From<io::Error> for QueryError {
    fn from(err: io::Error) -> Self {
        QueryError::Io(err)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Json(err)
    }
}

impl From<mongodb::error::Error> for QueryError {
    fn from(err: mongodb::error::Error) -> Self {
        QueryError::Execution(ExecutionError::Failed(describe_mongodb_error(&err)))
    }
}

impl From<ParseError> for QueryError {
    fn from(err: ParseError) -> Self {
        QueryError::Parse(err)
    }
}

impl From<ExecutionError> for QueryError {
    fn from(err: ExecutionError) -> Self {
        QueryError::Execution(err)
    }
}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::Config(err)
    }
}

impl From<ConnectionError> for QueryError {
    fn from(err: ConnectionError) -> Self {
        QueryError::Connection(err)
    }
}
