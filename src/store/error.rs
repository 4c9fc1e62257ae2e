//! Store error taxonomy.
//!
//! Every backend failure carries an [`ErrorCode`]. The code decides whether the
//! resilience layer may retry it: transient codes are retried, everything else
//! (including codes this crate does not recognise) surfaces immediately.

use std::fmt;

use thiserror::Error;

/// Retry classification of an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network trouble, overload or interruption. Safe to retry.
    Transient,
    /// The request itself is wrong or forbidden. Retrying cannot help.
    Permanent,
}

/// Backend error codes understood by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Unavailable,
    DeadlineExceeded,
    Internal,
    Cancelled,
    ResourceExhausted,
    Aborted,
    Network,
    Timeout,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    FailedPrecondition,
    InvalidArgument,
    Unauthenticated,
    Unknown,
}

impl ErrorCode {
    /// All codes, in declaration order.
    pub const ALL: [ErrorCode; 15] = [
        ErrorCode::Unavailable,
        ErrorCode::DeadlineExceeded,
        ErrorCode::Internal,
        ErrorCode::Cancelled,
        ErrorCode::ResourceExhausted,
        ErrorCode::Aborted,
        ErrorCode::Network,
        ErrorCode::Timeout,
        ErrorCode::PermissionDenied,
        ErrorCode::NotFound,
        ErrorCode::AlreadyExists,
        ErrorCode::FailedPrecondition,
        ErrorCode::InvalidArgument,
        ErrorCode::Unauthenticated,
        ErrorCode::Unknown,
    ];

    /// Wire name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::DeadlineExceeded => "deadline-exceeded",
            ErrorCode::Internal => "internal",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::ResourceExhausted => "resource-exhausted",
            ErrorCode::Aborted => "aborted",
            ErrorCode::Network => "network",
            ErrorCode::Timeout => "timeout",
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::NotFound => "not-found",
            ErrorCode::AlreadyExists => "already-exists",
            ErrorCode::FailedPrecondition => "failed-precondition",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::Unknown => "unknown",
        }
    }

    /// Parse a wire name. Anything unrecognised maps to [`ErrorCode::Unknown`].
    pub fn parse(s: &str) -> ErrorCode {
        match s.trim().to_ascii_lowercase().as_str() {
            "unavailable" => ErrorCode::Unavailable,
            "deadline-exceeded" => ErrorCode::DeadlineExceeded,
            "internal" => ErrorCode::Internal,
            "cancelled" => ErrorCode::Cancelled,
            "resource-exhausted" => ErrorCode::ResourceExhausted,
            "aborted" => ErrorCode::Aborted,
            "network" => ErrorCode::Network,
            "timeout" => ErrorCode::Timeout,
            "permission-denied" => ErrorCode::PermissionDenied,
            "not-found" => ErrorCode::NotFound,
            "already-exists" => ErrorCode::AlreadyExists,
            "failed-precondition" => ErrorCode::FailedPrecondition,
            "invalid-argument" => ErrorCode::InvalidArgument,
            "unauthenticated" => ErrorCode::Unauthenticated,
            _ => ErrorCode::Unknown,
        }
    }

    /// Retry classification.
    pub fn kind(self) -> ErrorKind {
        match self {
            ErrorCode::Unavailable
            | ErrorCode::DeadlineExceeded
            | ErrorCode::Internal
            | ErrorCode::Cancelled
            | ErrorCode::ResourceExhausted
            | ErrorCode::Aborted
            | ErrorCode::Network
            | ErrorCode::Timeout => ErrorKind::Transient,
            ErrorCode::PermissionDenied
            | ErrorCode::NotFound
            | ErrorCode::AlreadyExists
            | ErrorCode::FailedPrecondition
            | ErrorCode::InvalidArgument
            | ErrorCode::Unauthenticated
            | ErrorCode::Unknown => ErrorKind::Permanent,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error reported by a [`DocumentSource`](crate::store::DocumentSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct StoreError {
    pub code: ErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// True if the resilience layer may retry this error.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
