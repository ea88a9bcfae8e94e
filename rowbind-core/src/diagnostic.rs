use crate::{Error, ErrorKind, SqlError};
use std::{cell::RefCell, fmt::Display};

/// Outcome of the last operation on a connection or on one of its blobs.
///
/// Overwritten by every call. The message is only replaced by failures, so after a success it still
/// describes the last failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostic {
    /// `None` when the last operation succeeded.
    pub status: Option<ErrorKind>,
    pub code: Option<i32>,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn succeed(&mut self) {
        self.status = None;
        self.code = None;
    }

    pub(crate) fn record(&mut self, error: &SqlError) {
        self.status = Some(error.kind);
        self.code = error.code;
        self.message.clone_from(&error.message);
    }
}

/// Mirror `error` into the diagnostic, log it and turn it into an [`Error`].
pub(crate) fn report(
    diagnostic: &RefCell<Diagnostic>,
    error: SqlError,
    context: Option<impl Display + Send + Sync + 'static>,
) -> Error {
    diagnostic.borrow_mut().record(&error);
    let busy = error.kind == ErrorKind::Busy;
    let mut error = Error::new(error);
    if let Some(context) = context {
        error = error.context(context);
    }
    if busy {
        log::warn!("{:#}", error);
    } else {
        log::error!("{:#}", error);
    }
    error
}
