use crate::{
    Diagnostic, ErrorKind, RawBlob, ReopenBlob, Result, SqlError, diagnostic::report,
};
use std::{cell::RefCell, rc::Rc};

/// Random access to one value of one row, independent of the statement lifecycle.
///
/// Closing, explicitly or by dropping, releases the engine handle exactly once. The outcome of every
/// call is mirrored onto the owning connection's diagnostic.
pub struct Blob<B: RawBlob> {
    raw: Option<B>,
    size: usize,
    diagnostic: Rc<RefCell<Diagnostic>>,
}

impl<B: RawBlob> Blob<B> {
    pub(crate) fn new(raw: B, diagnostic: Rc<RefCell<Diagnostic>>) -> Self {
        diagnostic.borrow_mut().succeed();
        Self {
            size: raw.size(),
            raw: Some(raw),
            diagnostic,
        }
    }

    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// Size in bytes of the value, as it was when the blob was opened (or moved).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fill `buffer` with the bytes starting at `offset`. Reading past the end fails as a whole.
    pub fn read(&mut self, buffer: &mut [u8], offset: usize) -> Result<()> {
        let raw = self.open_raw("read")?;
        match raw.read(buffer, offset) {
            Ok(()) => {
                self.diagnostic.borrow_mut().succeed();
                Ok(())
            }
            Err(e) => Err(report(
                &self.diagnostic,
                SqlError::engine(ErrorKind::Io, e),
                Some(format!(
                    "While reading {} bytes at offset {} from a blob of {} bytes",
                    buffer.len(),
                    offset,
                    self.size
                )),
            )),
        }
    }

    /// Overwrite the bytes starting at `offset`. The size of the value cannot change.
    pub fn write(&mut self, buffer: &[u8], offset: usize) -> Result<()> {
        let raw = self.open_raw("write")?;
        match raw.write(buffer, offset) {
            Ok(()) => {
                self.diagnostic.borrow_mut().succeed();
                Ok(())
            }
            Err(e) => Err(report(
                &self.diagnostic,
                SqlError::engine(ErrorKind::Io, e),
                Some(format!(
                    "While writing {} bytes at offset {} into a blob of {} bytes",
                    buffer.len(),
                    offset,
                    self.size
                )),
            )),
        }
    }

    /// Release the handle. Closing an already closed blob is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(raw) = self.raw.take() else {
            return Ok(());
        };
        match raw.close() {
            Ok(()) => {
                self.diagnostic.borrow_mut().succeed();
                Ok(())
            }
            Err(e) => Err(report(
                &self.diagnostic,
                SqlError::engine(ErrorKind::Io, e),
                Some("While closing a blob"),
            )),
        }
    }

    fn open_raw(&mut self, operation: &str) -> Result<&mut B> {
        match self.raw.as_mut() {
            Some(raw) => Ok(raw),
            None => Err(report(
                &self.diagnostic,
                SqlError::new(
                    ErrorKind::InvalidState,
                    format!("Cannot {} a blob that was already closed", operation),
                ),
                None::<&str>,
            )),
        }
    }
}

impl<B: ReopenBlob> Blob<B> {
    /// Point the handle at the same column of another row.
    ///
    /// On failure the handle is unusable and can only be closed.
    pub fn move_to_row(&mut self, row_id: i64) -> Result<()> {
        let raw = self.open_raw("move")?;
        match raw.reopen(row_id) {
            Ok(()) => {
                self.size = raw.size();
                self.diagnostic.borrow_mut().succeed();
                Ok(())
            }
            Err(e) => Err(report(
                &self.diagnostic,
                SqlError::engine(ErrorKind::Io, e),
                Some(format!("While moving a blob to row {}", row_id)),
            )),
        }
    }
}

impl<B: RawBlob> Drop for Blob<B> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
