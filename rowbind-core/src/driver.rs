use crate::{ConnectOptions, Connection, Param, Result};
use std::fmt::{self, Display};

/// Failure reported by the engine: its status code and latest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Outcome of a single engine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawStep {
    Row,
    Done,
    Busy(EngineError),
    Error(EngineError),
    /// The engine was called against its contract, or answered with a status it should never produce.
    Misuse(EngineError),
}

/// Storage class of a result column in the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Null,
    Integer,
    Float,
    Text,
    Blob,
}

/// Entry point of an engine implementation.
pub trait Driver: Sized {
    type Raw: RawConnection;

    const NAME: &'static str;

    fn open(&self, options: &ConnectOptions) -> Result<Self::Raw, EngineError>;

    /// Connect using a url in the form `<NAME>://<path>?mode=<ro|rw|rwc>`.
    fn connect(self, url: &str) -> Result<Connection<Self>> {
        Connection::connect(self, url)
    }
}

/// An open engine connection.
///
/// Dropping it closes the database. Statements and blobs created from it must stay valid after that:
/// implementations keep the underlying handle alive until the last of them is dropped.
pub trait RawConnection {
    type Statement: RawStatement;
    type Blob: RawBlob;

    /// Compile exactly one SQL statement.
    fn prepare(&self, sql: &str) -> Result<Self::Statement, EngineError>;

    fn open_blob(
        &self,
        table: &str,
        column: &str,
        row_id: i64,
        readonly: bool,
    ) -> Result<Self::Blob, EngineError>;

    fn last_insert_rowid(&self) -> i64;

    fn changes(&self) -> u64;
}

/// A compiled statement. Dropping it finalizes.
///
/// Column accessors that may convert the stored value take `&mut self`, so a borrowed slice can never
/// outlive the conversion that produced it.
pub trait RawStatement {
    /// Bind `param` at the 1-based `index`. Text and blobs are copied by the engine.
    fn bind(&mut self, index: usize, param: &Param<'_>) -> Result<(), EngineError>;

    fn step(&mut self) -> RawStep;

    /// Rewind to the start, keeping the bound parameters.
    fn reset(&mut self);

    fn column_count(&self) -> usize;

    fn column_type(&self, index: usize) -> ColumnType;

    /// Length in bytes of the text representation of the column.
    fn column_bytes(&mut self, index: usize) -> usize;

    fn column_int32(&mut self, index: usize) -> i32;

    fn column_int64(&mut self, index: usize) -> i64;

    fn column_double(&mut self, index: usize) -> f64;

    fn column_text(&mut self, index: usize) -> &[u8];

    fn column_blob(&mut self, index: usize) -> &[u8];

    fn sql(&self) -> String;
}

/// An open blob handle. Dropping it closes silently, [`RawBlob::close`] reports the status.
pub trait RawBlob {
    fn size(&self) -> usize;

    fn read(&mut self, buffer: &mut [u8], offset: usize) -> Result<(), EngineError>;

    fn write(&mut self, buffer: &[u8], offset: usize) -> Result<(), EngineError>;

    fn close(self) -> Result<(), EngineError>;
}

/// Blob handles that can be pointed at another row of the same table and column.
pub trait ReopenBlob: RawBlob {
    fn reopen(&mut self, row_id: i64) -> Result<(), EngineError>;
}
