use crate::{EngineError, Error};
use std::fmt::{self, Display};

/// Classification of every failure produced by this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Opening or closing the database failed.
    Connection,
    /// Malformed SQL, or no open connection to prepare against.
    Prepare,
    /// The engine rejected a parameter.
    Bind,
    /// The engine is busy or the database is locked, the caller may retry.
    Busy,
    /// Execution failed, not retryable until the statement is reset or re-prepared.
    Engine,
    /// The engine reported a violation of its calling contract.
    Misuse,
    /// The operation is not valid in the current statement state.
    InvalidState,
    /// Blob channel failure.
    Io,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        self == ErrorKind::Busy
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Connection => "Connection",
            ErrorKind::Prepare => "Prepare",
            ErrorKind::Bind => "Bind",
            ErrorKind::Busy => "Busy",
            ErrorKind::Engine => "Engine",
            ErrorKind::Misuse => "Misuse",
            ErrorKind::InvalidState => "Invalid state",
            ErrorKind::Io => "Blob I/O",
        })
    }
}

/// Root cause carried by every error this crate returns.
///
/// Context may be layered on top with [`anyhow::Context`], the kind stays reachable through
/// [`ErrorKindExt`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct SqlError {
    pub kind: ErrorKind,
    /// Engine status code, when the failure came from the engine.
    pub code: Option<i32>,
    pub message: String,
}

impl SqlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    pub fn engine(kind: ErrorKind, error: EngineError) -> Self {
        Self {
            kind,
            code: Some(error.code),
            message: error.message,
        }
    }
}

pub trait ErrorKindExt {
    fn sql_error(&self) -> Option<&SqlError>;

    fn kind(&self) -> Option<ErrorKind> {
        self.sql_error().map(|e| e.kind)
    }

    fn is_busy(&self) -> bool {
        self.kind() == Some(ErrorKind::Busy)
    }
}

impl ErrorKindExt for Error {
    fn sql_error(&self) -> Option<&SqlError> {
        self.downcast_ref::<SqlError>()
    }
}
