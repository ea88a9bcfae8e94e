//! Scripted in-memory engine for unit tests.

use crate::{
    ColumnType, ConnectOptions, Driver, EngineError, Param, RawBlob, RawConnection, RawStatement,
    RawStep, ReopenBlob,
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

const SQLITE_ERROR: i32 = 1;
const SQLITE_BUSY: i32 = 5;
const SQLITE_READONLY: i32 = 8;
const SQLITE_CANTOPEN: i32 = 14;
const SQLITE_MISUSE: i32 = 21;
const SQLITE_RANGE: i32 = 25;

static NULL: FakeValue = FakeValue::Null;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FakeValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FakeValue {
    fn matches(&self, param: &Param<'static>) -> bool {
        match (self, param) {
            (FakeValue::Null, Param::Null) => true,
            (FakeValue::Integer(l), Param::Int32(r)) => *l == *r as i64,
            (FakeValue::Integer(l), Param::Int64(r)) => l == r,
            (FakeValue::Float(l), Param::Double(r)) => l == r,
            (FakeValue::Text(l), Param::Text(r)) => l == r,
            (FakeValue::Blob(l), Param::Blob(r)) => l.as_slice() == r.as_ref(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FakeStep {
    Row(Vec<FakeValue>),
    Busy,
    Error(&'static str),
    Misuse,
}

/// A query the fake engine knows how to run.
#[derive(Debug, Clone)]
pub(crate) struct FakeQuery {
    pub(crate) columns: usize,
    pub(crate) parameters: usize,
    pub(crate) steps: Vec<FakeStep>,
    /// Keep only the rows whose first value equals parameter 1, when bound.
    pub(crate) filter: bool,
}

impl FakeQuery {
    pub(crate) fn rows(columns: usize, rows: Vec<Vec<FakeValue>>) -> Self {
        Self {
            columns,
            parameters: 0,
            steps: rows.into_iter().map(FakeStep::Row).collect(),
            filter: false,
        }
    }

    pub(crate) fn parameters(mut self, parameters: usize) -> Self {
        self.parameters = parameters;
        self
    }

    pub(crate) fn filtered(mut self) -> Self {
        self.filter = true;
        self
    }

    pub(crate) fn steps(columns: usize, steps: Vec<FakeStep>) -> Self {
        Self {
            columns,
            parameters: 0,
            steps,
            filter: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeDatabase {
    pub(crate) queries: HashMap<String, FakeQuery>,
    pub(crate) blobs: HashMap<(String, String, i64), Vec<u8>>,
    pub(crate) message: String,
    pub(crate) resets: usize,
    pub(crate) finalized: usize,
    pub(crate) blobs_closed: usize,
    pub(crate) last_rowid: i64,
    pub(crate) changes: u64,
}

impl FakeDatabase {
    fn error(&mut self, code: i32, message: impl Into<String>) -> EngineError {
        self.message = message.into();
        EngineError::new(code, self.message.clone())
    }
}

/// Opens any path except `missing.db`, every connection shares `database`.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeDriver {
    pub(crate) database: Rc<RefCell<FakeDatabase>>,
}

impl FakeDriver {
    pub(crate) fn query(&self, sql: &str, query: FakeQuery) {
        self.database
            .borrow_mut()
            .queries
            .insert(sql.to_string(), query);
    }

    pub(crate) fn blob(&self, table: &str, column: &str, row_id: i64, value: Vec<u8>) {
        self.database
            .borrow_mut()
            .blobs
            .insert((table.into(), column.into(), row_id), value);
    }
}

impl Driver for FakeDriver {
    type Raw = FakeRaw;

    const NAME: &'static str = "fake";

    fn open(&self, options: &ConnectOptions) -> Result<Self::Raw, EngineError> {
        if options.path == "missing.db" {
            return Err(self
                .database
                .borrow_mut()
                .error(SQLITE_CANTOPEN, "unable to open database file"));
        }
        Ok(FakeRaw {
            database: self.database.clone(),
        })
    }
}

pub(crate) struct FakeRaw {
    database: Rc<RefCell<FakeDatabase>>,
}

impl RawConnection for FakeRaw {
    type Statement = FakeStatement;
    type Blob = FakeBlob;

    fn prepare(&self, sql: &str) -> Result<Self::Statement, EngineError> {
        let mut database = self.database.borrow_mut();
        match database.queries.get(sql).cloned() {
            Some(query) => Ok(FakeStatement {
                database: Some(self.database.clone()),
                sql: sql.to_string(),
                params: vec![Param::Null; query.parameters],
                query,
                position: None,
                done: false,
                scratch: Vec::new(),
            }),
            None => Err(database.error(
                SQLITE_ERROR,
                format!("near \"{}\": syntax error", sql),
            )),
        }
    }

    fn open_blob(
        &self,
        table: &str,
        column: &str,
        row_id: i64,
        readonly: bool,
    ) -> Result<Self::Blob, EngineError> {
        let mut database = self.database.borrow_mut();
        let key = (table.to_string(), column.to_string(), row_id);
        if !database.blobs.contains_key(&key) {
            return Err(database.error(SQLITE_ERROR, "no such rowid"));
        }
        Ok(FakeBlob {
            database: self.database.clone(),
            key,
            readonly,
        })
    }

    fn last_insert_rowid(&self) -> i64 {
        self.database.borrow().last_rowid
    }

    fn changes(&self) -> u64 {
        self.database.borrow().changes
    }
}

pub(crate) struct FakeStatement {
    database: Option<Rc<RefCell<FakeDatabase>>>,
    sql: String,
    query: FakeQuery,
    params: Vec<Param<'static>>,
    /// Index into the visible steps of the current row, `None` before the first step.
    position: Option<usize>,
    done: bool,
    scratch: Vec<u8>,
}

impl FakeStatement {
    /// A detached statement sitting on a single row.
    pub(crate) fn with_row(row: Vec<FakeValue>) -> Self {
        Self {
            database: None,
            sql: String::new(),
            query: FakeQuery::rows(row.len(), vec![row]),
            params: Vec::new(),
            position: Some(0),
            done: false,
            scratch: Vec::new(),
        }
    }

    fn visible(&self) -> Vec<&FakeStep> {
        let key = self.params.first().filter(|_| self.query.filter);
        self.query
            .steps
            .iter()
            .filter(|step| match (step, key) {
                (FakeStep::Row(values), Some(key)) => {
                    values.first().is_some_and(|v| v.matches(key))
                }
                _ => true,
            })
            .collect()
    }

    fn value(&self, index: usize) -> &FakeValue {
        let step = self
            .position
            .and_then(|position| self.visible().get(position).copied());
        match step {
            Some(FakeStep::Row(values)) => values.get(index).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    fn render(&mut self, index: usize) -> &[u8] {
        self.scratch = match self.value(index).clone() {
            FakeValue::Null => Vec::new(),
            FakeValue::Integer(v) => v.to_string().into_bytes(),
            FakeValue::Float(v) => v.to_string().into_bytes(),
            FakeValue::Text(v) => v.into_bytes(),
            FakeValue::Blob(v) => v,
        };
        &self.scratch
    }

    fn error(&self, code: i32, message: &str) -> EngineError {
        match &self.database {
            Some(database) => database.borrow_mut().error(code, message),
            None => EngineError::new(code, message),
        }
    }
}

impl RawStatement for FakeStatement {
    fn bind(&mut self, index: usize, param: &Param<'_>) -> Result<(), EngineError> {
        if self.position.is_some() || self.done {
            return Err(self.error(SQLITE_MISUSE, "bad parameter or other API misuse"));
        }
        if index == 0 || index > self.params.len() {
            return Err(self.error(SQLITE_RANGE, "column index out of range"));
        }
        self.params[index - 1] = match param {
            Param::Text(v) => Param::Text(v.to_string().into()),
            Param::Blob(v) => Param::Blob(v.to_vec().into()),
            Param::Null => Param::Null,
            Param::Int32(v) => Param::Int32(*v),
            Param::Int64(v) => Param::Int64(*v),
            Param::Double(v) => Param::Double(*v),
        };
        Ok(())
    }

    fn step(&mut self) -> RawStep {
        if self.done {
            return RawStep::Misuse(self.error(SQLITE_MISUSE, "bad parameter or other API misuse"));
        }
        let next = self.position.map_or(0, |position| position + 1);
        let step = self.visible().get(next).map(|step| (*step).clone());
        self.position = Some(next);
        match step {
            Some(FakeStep::Row(..)) => RawStep::Row,
            Some(FakeStep::Busy) => {
                // Retrying moves past the busy step.
                RawStep::Busy(self.error(SQLITE_BUSY, "database is locked"))
            }
            Some(FakeStep::Error(message)) => {
                self.done = true;
                RawStep::Error(self.error(SQLITE_ERROR, message))
            }
            Some(FakeStep::Misuse) => {
                RawStep::Misuse(self.error(SQLITE_MISUSE, "bad parameter or other API misuse"))
            }
            None => {
                self.done = true;
                self.position = None;
                RawStep::Done
            }
        }
    }

    fn reset(&mut self) {
        self.position = None;
        self.done = false;
        if let Some(database) = &self.database {
            database.borrow_mut().resets += 1;
        }
    }

    fn column_count(&self) -> usize {
        self.query.columns
    }

    fn column_type(&self, index: usize) -> ColumnType {
        match self.value(index) {
            FakeValue::Null => ColumnType::Null,
            FakeValue::Integer(..) => ColumnType::Integer,
            FakeValue::Float(..) => ColumnType::Float,
            FakeValue::Text(..) => ColumnType::Text,
            FakeValue::Blob(..) => ColumnType::Blob,
        }
    }

    fn column_bytes(&mut self, index: usize) -> usize {
        self.render(index).len()
    }

    fn column_int32(&mut self, index: usize) -> i32 {
        self.column_int64(index) as i32
    }

    fn column_int64(&mut self, index: usize) -> i64 {
        match self.value(index) {
            FakeValue::Integer(v) => *v,
            FakeValue::Float(v) => *v as i64,
            FakeValue::Text(v) => v.trim().parse().unwrap_or(0),
            FakeValue::Null | FakeValue::Blob(..) => 0,
        }
    }

    fn column_double(&mut self, index: usize) -> f64 {
        match self.value(index) {
            FakeValue::Integer(v) => *v as f64,
            FakeValue::Float(v) => *v,
            FakeValue::Text(v) => v.trim().parse().unwrap_or(0.0),
            FakeValue::Null | FakeValue::Blob(..) => 0.0,
        }
    }

    fn column_text(&mut self, index: usize) -> &[u8] {
        self.render(index)
    }

    fn column_blob(&mut self, index: usize) -> &[u8] {
        self.render(index)
    }

    fn sql(&self) -> String {
        self.sql.clone()
    }
}

impl Drop for FakeStatement {
    fn drop(&mut self) {
        if let Some(database) = &self.database {
            database.borrow_mut().finalized += 1;
        }
    }
}

pub(crate) struct FakeBlob {
    database: Rc<RefCell<FakeDatabase>>,
    key: (String, String, i64),
    readonly: bool,
}

impl RawBlob for FakeBlob {
    fn size(&self) -> usize {
        self.database
            .borrow()
            .blobs
            .get(&self.key)
            .map_or(0, Vec::len)
    }

    fn read(&mut self, buffer: &mut [u8], offset: usize) -> Result<(), EngineError> {
        let mut database = self.database.borrow_mut();
        let value = database.blobs.get(&self.key).cloned().unwrap_or_default();
        match value.get(offset..offset + buffer.len()) {
            Some(range) => {
                buffer.copy_from_slice(range);
                Ok(())
            }
            None => Err(database.error(SQLITE_ERROR, "SQL logic error")),
        }
    }

    fn write(&mut self, buffer: &[u8], offset: usize) -> Result<(), EngineError> {
        let mut database = self.database.borrow_mut();
        if self.readonly {
            return Err(database.error(SQLITE_READONLY, "attempt to write a readonly database"));
        }
        let written = match database
            .blobs
            .get_mut(&self.key)
            .and_then(|value| value.get_mut(offset..offset + buffer.len()))
        {
            Some(range) => {
                range.copy_from_slice(buffer);
                true
            }
            None => false,
        };
        if written {
            Ok(())
        } else {
            Err(database.error(SQLITE_ERROR, "SQL logic error"))
        }
    }

    fn close(self) -> Result<(), EngineError> {
        Ok(())
    }
}

impl ReopenBlob for FakeBlob {
    fn reopen(&mut self, row_id: i64) -> Result<(), EngineError> {
        let mut database = self.database.borrow_mut();
        let key = (self.key.0.clone(), self.key.1.clone(), row_id);
        if !database.blobs.contains_key(&key) {
            return Err(database.error(SQLITE_ERROR, "no such rowid"));
        }
        self.key = key;
        Ok(())
    }
}

impl Drop for FakeBlob {
    fn drop(&mut self) {
        self.database.borrow_mut().blobs_closed += 1;
    }
}
