use crate::{
    AsParam, Blob, BlobSlot, ConnectOptions, Diagnostic, DoubleSlot, Driver, ErrorKind,
    ErrorKindExt, FixedTextSlot, Int32Slot, Int64Slot, Param, RawConnection, RawStatement,
    RawStep, Result, SlotKind, SlotRef, SqlError, StringSlot, diagnostic::report,
    registry::SlotRegistry, truncate_long,
};
use std::{
    borrow::Cow,
    cell::RefCell,
    fmt::{self, Display},
    rc::Rc,
};

type StatementOf<D> = <<D as Driver>::Raw as RawConnection>::Statement;
type BlobOf<D> = <<D as Driver>::Raw as RawConnection>::Blob;

/// Where the connection is in the statement lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No database.
    Closed,
    /// Database open, no statement.
    Open,
    /// Statement compiled, parameters and slots may be bound.
    Prepared,
    /// A row is available in the slots.
    Row,
    /// No more rows, the next step starts over.
    Done,
    /// The last step failed, the next step starts over.
    Error,
}

impl Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Closed => "closed",
            State::Open => "open without a statement",
            State::Prepared => "prepared",
            State::Row => "on a row",
            State::Done => "done",
            State::Error => "in error",
        })
    }
}

/// Successful outcome of [`Connection::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A row was marshaled into the slots.
    Row,
    /// A row was marshaled, but the number of registered slots differs from the number of columns.
    /// Only the overlapping columns were marshaled.
    Mismatch { slots: usize, columns: usize },
    /// No more rows.
    Done,
}

impl Step {
    pub fn is_row(self) -> bool {
        matches!(self, Step::Row | Step::Mismatch { .. })
    }

    pub fn is_done(self) -> bool {
        self == Step::Done
    }
}

/// A database connection with its single prepared statement.
///
/// Statements are positional: parameters bind to `?1, ?2, ...` in call order and slots receive
/// result columns `0, 1, ...` in registration order.
/// ```rust,ignore
/// connection.prepare("SELECT id, name FROM T WHERE id = ?")?;
/// connection.bind(1)?;
/// let id = connection.register_int32()?;
/// let name = connection.register_text(3)?;
/// while connection.step()?.is_row() {
///     println!("{} {}", connection.slot(&id)?.value(), connection.slot(&name)?.to_string_lossy());
/// }
/// ```
///
/// Not thread safe: every call runs to completion on the caller's thread.
pub struct Connection<D: Driver> {
    statement: Option<StatementOf<D>>,
    raw: Option<D::Raw>,
    driver: D,
    state: State,
    cursor: usize,
    slots: SlotRegistry,
    truncated: bool,
    new_cycle: bool,
    diagnostic: Rc<RefCell<Diagnostic>>,
}

impl<D: Driver> Connection<D> {
    /// A closed connection.
    pub fn new(driver: D) -> Self {
        Self {
            statement: None,
            raw: None,
            driver,
            state: State::Closed,
            cursor: 0,
            slots: SlotRegistry::default(),
            truncated: false,
            new_cycle: true,
            diagnostic: Default::default(),
        }
    }

    pub fn connect(driver: D, url: &str) -> Result<Self> {
        let options = ConnectOptions::from_url::<D>(url).inspect_err(|e| {
            log::error!("{:#}", e);
        })?;
        let mut connection = Self::new(driver);
        connection.open(&options)?;
        Ok(connection)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Open the database, closing the current one first.
    pub fn open(&mut self, options: &ConnectOptions) -> Result<()> {
        self.close();
        match self.driver.open(options) {
            Ok(raw) => {
                self.raw = Some(raw);
                self.state = State::Open;
                self.diagnostic.borrow_mut().succeed();
                log::debug!("Opened {} database `{}`", D::NAME, options.path);
                Ok(())
            }
            Err(e) => Err(self.fail(
                SqlError::engine(ErrorKind::Connection, e),
                Some(format!("While opening the database `{}`", options.path)),
            )),
        }
    }

    /// Finalize the statement and close the database. Idempotent.
    pub fn close(&mut self) {
        if self.raw.is_none() {
            return;
        }
        self.clear();
        self.raw = None;
        self.state = State::Closed;
        let mut diagnostic = self.diagnostic.borrow_mut();
        diagnostic.succeed();
        diagnostic.message = "Closed".into();
    }

    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    pub fn is_prepared(&self) -> bool {
        self.statement.is_some()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Position of the last bound parameter, 0 when none is bound.
    pub fn bind_cursor(&self) -> usize {
        self.cursor
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether any fixed-text or blob slot was truncated in the current fetch cycle.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// `None` when the last operation succeeded.
    pub fn last_status(&self) -> Option<ErrorKind> {
        self.diagnostic.borrow().status
    }

    /// Message of the last failure.
    pub fn last_error(&self) -> String {
        self.diagnostic.borrow().message.clone()
    }

    pub fn diagnostic(&self) -> Diagnostic {
        self.diagnostic.borrow().clone()
    }

    /// Compile `sql`, discarding the previous statement with its parameters and slots.
    pub fn prepare(&mut self, sql: &str) -> Result<()> {
        self.statement = None;
        self.reset_bookkeeping();
        let prepared = match &self.raw {
            Some(raw) => raw.prepare(sql),
            None => {
                return Err(self.fail(
                    SqlError::new(ErrorKind::Prepare, "No database open"),
                    None::<&str>,
                ));
            }
        };
        match prepared {
            Ok(statement) => {
                self.statement = Some(statement);
                self.state = State::Prepared;
                self.diagnostic.borrow_mut().succeed();
                log::debug!("Prepared:\n{}", truncate_long(sql));
                Ok(())
            }
            Err(e) => {
                self.state = State::Open;
                Err(self.fail(
                    SqlError::engine(ErrorKind::Prepare, e),
                    Some(format!("While preparing the query:\n{}", truncate_long(sql))),
                ))
            }
        }
    }

    /// Bind the next positional parameter.
    pub fn bind<V: AsParam>(&mut self, value: V) -> Result<&mut Self> {
        self.require_state(&[State::Prepared], "bind a parameter")?;
        let param = match value.as_param() {
            Ok(param) => param,
            Err(e) => {
                if let Some(error) = e.sql_error() {
                    self.diagnostic.borrow_mut().record(error);
                }
                return Err(e);
            }
        };
        self.bind_param(&param)
    }

    pub fn bind_null(&mut self) -> Result<&mut Self> {
        self.bind_param(&Param::Null)
    }

    pub fn bind_int32(&mut self, value: i32) -> Result<&mut Self> {
        self.bind_param(&Param::Int32(value))
    }

    pub fn bind_int64(&mut self, value: i64) -> Result<&mut Self> {
        self.bind_param(&Param::Int64(value))
    }

    pub fn bind_double(&mut self, value: f64) -> Result<&mut Self> {
        self.bind_param(&Param::Double(value))
    }

    pub fn bind_text(&mut self, value: &str) -> Result<&mut Self> {
        self.bind_param(&Param::Text(Cow::Borrowed(value)))
    }

    pub fn bind_blob(&mut self, value: &[u8]) -> Result<&mut Self> {
        self.bind_param(&Param::Blob(Cow::Borrowed(value)))
    }

    fn bind_param(&mut self, param: &Param<'_>) -> Result<&mut Self> {
        self.require_state(&[State::Prepared], "bind a parameter")?;
        let index = self.cursor + 1;
        let Some(statement) = self.statement.as_mut() else {
            return Err(self.missing_statement("bind a parameter"));
        };
        match statement.bind(index, param) {
            Ok(()) => {
                self.cursor = index;
                self.diagnostic.borrow_mut().succeed();
                Ok(self)
            }
            Err(e) => {
                let context = format!(
                    "Cannot bind {} parameter {} to query:\n{}",
                    param.type_name(),
                    index,
                    truncate_long(&statement.sql())
                );
                Err(self.fail(SqlError::engine(ErrorKind::Bind, e), Some(context)))
            }
        }
    }

    /// Register the slot receiving the next result column.
    pub fn register<S: SlotKind>(&mut self, slot: S) -> Result<SlotRef<S>> {
        self.require_state(&[State::Prepared], "register a result slot")?;
        Ok(self.slots.push(slot))
    }

    pub fn register_int32(&mut self) -> Result<SlotRef<Int32Slot>> {
        self.register(Int32Slot::new())
    }

    pub fn register_int64(&mut self) -> Result<SlotRef<Int64Slot>> {
        self.register(Int64Slot::new())
    }

    pub fn register_double(&mut self) -> Result<SlotRef<DoubleSlot>> {
        self.register(DoubleSlot::new())
    }

    /// Zero terminated text of at most `capacity - 1` bytes.
    pub fn register_text(&mut self, capacity: usize) -> Result<SlotRef<FixedTextSlot>> {
        self.register(FixedTextSlot::new(capacity))
    }

    pub fn register_string(&mut self) -> Result<SlotRef<StringSlot>> {
        self.register(StringSlot::new())
    }

    pub fn register_blob(&mut self, capacity: usize) -> Result<SlotRef<BlobSlot>> {
        self.register(BlobSlot::new(capacity))
    }

    /// The slot behind `slot`, failing when the handle comes from an earlier statement.
    pub fn slot<S: SlotKind>(&self, slot: &SlotRef<S>) -> Result<&S> {
        match self.slots.get(slot) {
            Some(value) => Ok(value),
            None => Err(self.fail(
                SqlError::new(
                    ErrorKind::InvalidState,
                    format!(
                        "The result slot {} belongs to a statement that was cleared or re-prepared",
                        slot.index()
                    ),
                ),
                None::<&str>,
            )),
        }
    }

    /// Whether the slot received NULL on the current row. Unknown handles report `true`.
    pub fn is_null<S>(&self, slot: &SlotRef<S>) -> bool {
        self.slots.received(slot).is_none_or(|v| v.null)
    }

    /// Engine-reported length for the slot on the current row, the copied length for blobs.
    /// Unknown handles report 0.
    pub fn returned_length<S>(&self, slot: &SlotRef<S>) -> usize {
        self.slots.received(slot).map_or(0, |v| v.len)
    }

    /// Advance to the next row.
    ///
    /// After `Done` or a failed step the statement is rewound first, so the same query runs again
    /// with the parameters currently bound.
    pub fn step(&mut self) -> Result<Step> {
        self.require_state(
            &[State::Prepared, State::Row, State::Done, State::Error],
            "step",
        )?;
        let Some(statement) = self.statement.as_mut() else {
            return Err(self.missing_statement("step"));
        };
        if matches!(self.state, State::Done | State::Error) {
            statement.reset();
            self.state = State::Prepared;
            self.new_cycle = true;
        }
        match statement.step() {
            RawStep::Row => {
                if self.new_cycle {
                    self.truncated = false;
                    self.new_cycle = false;
                }
                let marshaled = self.slots.marshal(statement);
                self.truncated |= marshaled.truncated;
                self.state = State::Row;
                self.diagnostic.borrow_mut().succeed();
                let slots = self.slots.len();
                if slots != marshaled.columns {
                    log::trace!(
                        "Row with {} columns marshaled into {} slots",
                        marshaled.columns,
                        slots
                    );
                    return Ok(Step::Mismatch {
                        slots,
                        columns: marshaled.columns,
                    });
                }
                Ok(Step::Row)
            }
            RawStep::Done => {
                self.state = State::Done;
                self.diagnostic.borrow_mut().succeed();
                log::trace!("Done");
                Ok(Step::Done)
            }
            RawStep::Busy(e) => Err(self.fail(SqlError::engine(ErrorKind::Busy, e), None::<&str>)),
            RawStep::Error(e) => {
                let context = format!(
                    "While executing the query:\n{}",
                    truncate_long(&statement.sql())
                );
                self.state = State::Error;
                Err(self.fail(SqlError::engine(ErrorKind::Engine, e), Some(context)))
            }
            RawStep::Misuse(e) => {
                let context = format!(
                    "Engine contract violated while executing the query:\n{}",
                    truncate_long(&statement.sql())
                );
                self.state = State::Error;
                let error = self.fail(SqlError::engine(ErrorKind::Misuse, e), Some(context));
                if cfg!(debug_assertions) {
                    panic!("{:#}", error);
                }
                Err(error)
            }
        }
    }

    /// Rewind the statement for new parameters, keeping the slots.
    pub fn reset(&mut self) -> Result<()> {
        let Some(statement) = self.statement.as_mut() else {
            return Err(self.missing_statement("reset"));
        };
        statement.reset();
        self.cursor = 0;
        self.new_cycle = true;
        self.state = State::Prepared;
        self.diagnostic.borrow_mut().succeed();
        Ok(())
    }

    /// Finalize the statement and drop its slots. Safe in any state, idempotent.
    pub fn clear(&mut self) {
        self.statement = None;
        self.reset_bookkeeping();
        self.state = if self.raw.is_some() {
            State::Open
        } else {
            State::Closed
        };
    }

    /// Prepare, step once and clear. Succeeds when the step completed or produced a row.
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.clear();
        let result = self.prepare(sql).and_then(|_| self.step());
        self.clear();
        result.map(|step| {
            log::debug!("Executed ({:?}):\n{}", step, truncate_long(sql));
        })
    }

    pub fn last_insert_rowid(&self) -> Result<i64> {
        Ok(self.raw("read the last inserted row id")?.last_insert_rowid())
    }

    pub fn rows_affected(&self) -> Result<u64> {
        Ok(self.raw("read the affected rows")?.changes())
    }

    /// Open `table.column` of row `row_id` for random access.
    pub fn open_blob(
        &self,
        table: &str,
        column: &str,
        row_id: i64,
        readonly: bool,
    ) -> Result<Blob<BlobOf<D>>> {
        let raw = self.raw("open a blob")?;
        match raw.open_blob(table, column, row_id, readonly) {
            Ok(blob) => Ok(Blob::new(blob, self.diagnostic.clone())),
            Err(e) => Err(self.fail(
                SqlError::engine(ErrorKind::Io, e),
                Some(format!(
                    "While opening the blob {}.{} of row {}",
                    table, column, row_id
                )),
            )),
        }
    }

    fn raw(&self, operation: &str) -> Result<&D::Raw> {
        match &self.raw {
            Some(raw) => Ok(raw),
            None => Err(self.fail(
                SqlError::new(
                    ErrorKind::InvalidState,
                    format!("Cannot {} without an open database", operation),
                ),
                None::<&str>,
            )),
        }
    }

    fn reset_bookkeeping(&mut self) {
        self.cursor = 0;
        self.truncated = false;
        self.new_cycle = true;
        self.slots.clear();
    }

    fn require_state(&self, allowed: &[State], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(self.fail(
            SqlError::new(
                ErrorKind::InvalidState,
                format!("Cannot {} while the connection is {}", operation, self.state),
            ),
            None::<&str>,
        ))
    }

    fn missing_statement(&self, operation: &str) -> crate::Error {
        self.fail(
            SqlError::new(
                ErrorKind::InvalidState,
                format!("Cannot {} without a prepared statement", operation),
            ),
            None::<&str>,
        )
    }

    fn fail(
        &self,
        error: SqlError,
        context: Option<impl Display + Send + Sync + 'static>,
    ) -> crate::Error {
        report(&self.diagnostic, error, context)
    }
}

impl<D: Driver + Default> Default for Connection<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<D: Driver> fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &D::NAME)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("slots", &self.slots.len())
            .field("truncated", &self.truncated)
            .field("diagnostic", &*self.diagnostic.borrow())
            .finish_non_exhaustive()
    }
}
