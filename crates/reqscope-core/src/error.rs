//! Shared error type across reqscope crates.

use thiserror::Error;

/// Stable error codes (used in logs and by the server's startup report).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A metric family with the same name is already registered.
    Duplicate,
    /// Metric or label name does not match the exposition grammar.
    InvalidName,
    /// Label values do not match the family's declared label names.
    LabelMismatch,
    /// Histogram boundaries are empty, non-finite, or not ascending.
    InvalidBuckets,
    /// Exposition text could not be parsed.
    Parse,
    /// Configuration rejected during load/validate.
    Config,
    /// Anything else.
    Internal,
}

impl ErrorCode {
    /// String representation used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::LabelMismatch => "LABEL_MISMATCH",
            ErrorCode::InvalidBuckets => "INVALID_BUCKETS",
            ErrorCode::Parse => "PARSE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("duplicate metric family: {0}")]
    Duplicate(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("label mismatch for {family}: expected {expected} values, got {got}")]
    LabelMismatch {
        family: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid buckets: {0}")]
    InvalidBuckets(String),
    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ScopeError {
    /// Map to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ScopeError::Duplicate(_) => ErrorCode::Duplicate,
            ScopeError::InvalidName(_) => ErrorCode::InvalidName,
            ScopeError::LabelMismatch { .. } => ErrorCode::LabelMismatch,
            ScopeError::InvalidBuckets(_) => ErrorCode::InvalidBuckets,
            ScopeError::Parse { .. } => ErrorCode::Parse,
            ScopeError::Config(_) => ErrorCode::Config,
            ScopeError::Internal(_) => ErrorCode::Internal,
        }
    }
}
