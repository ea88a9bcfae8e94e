use crate::{CBox, c_len, engine_error};
use libsqlite3_sys::*;
use rowbind_core::{ColumnType, EngineError, Param, RawStatement, RawStep};
use std::{
    ffi::{CStr, c_char, c_int, c_void},
    fmt::{self, Display},
    rc::Rc,
    slice,
};

/// A compiled sqlite statement. Finalized on drop.
pub struct SqliteStatement {
    pub(crate) statement: CBox<sqlite3_stmt>,
    pub(crate) connection: Rc<CBox<sqlite3>>,
}

impl SqliteStatement {
    fn error(&self, code: c_int) -> EngineError {
        engine_error(**self.connection, code)
    }

    /// # Safety
    /// `ptr` must be null or point to `len` bytes that stay valid while `self` is borrowed.
    unsafe fn bytes<'s>(&'s self, ptr: *const u8, len: c_int) -> &'s [u8] {
        if ptr.is_null() || len <= 0 {
            return &[];
        }
        unsafe { slice::from_raw_parts(ptr, len as usize) }
    }
}

impl RawStatement for SqliteStatement {
    fn bind(&mut self, index: usize, param: &Param<'_>) -> Result<(), EngineError> {
        let statement = *self.statement;
        let index = index as c_int;
        let rc = unsafe {
            match param {
                Param::Null => sqlite3_bind_null(statement, index),
                Param::Int32(v) => sqlite3_bind_int(statement, index, *v),
                Param::Int64(v) => sqlite3_bind_int64(statement, index, *v),
                Param::Double(v) => sqlite3_bind_double(statement, index, *v),
                Param::Text(v) => sqlite3_bind_text(
                    statement,
                    index,
                    v.as_ptr() as *const c_char,
                    c_len(v.len())?,
                    SQLITE_TRANSIENT(),
                ),
                Param::Blob(v) => sqlite3_bind_blob(
                    statement,
                    index,
                    v.as_ptr() as *const c_void,
                    c_len(v.len())?,
                    SQLITE_TRANSIENT(),
                ),
            }
        };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        Ok(())
    }

    fn step(&mut self) -> RawStep {
        let rc = unsafe { sqlite3_step(*self.statement) };
        match rc & 0xff {
            SQLITE_ROW => RawStep::Row,
            SQLITE_DONE => RawStep::Done,
            SQLITE_BUSY | SQLITE_LOCKED => RawStep::Busy(self.error(rc)),
            SQLITE_MISUSE => RawStep::Misuse(self.error(rc)),
            SQLITE_OK => RawStep::Misuse(EngineError::new(
                rc,
                "sqlite3_step returned SQLITE_OK, which is not a step outcome",
            )),
            _ => RawStep::Error(self.error(rc)),
        }
    }

    fn reset(&mut self) {
        // The return code repeats the outcome of the last step, already reported
        unsafe {
            sqlite3_reset(*self.statement);
        }
    }

    fn column_count(&self) -> usize {
        unsafe { sqlite3_column_count(*self.statement).max(0) as usize }
    }

    fn column_type(&self, index: usize) -> ColumnType {
        match unsafe { sqlite3_column_type(*self.statement, index as c_int) } {
            SQLITE_INTEGER => ColumnType::Integer,
            SQLITE_FLOAT => ColumnType::Float,
            SQLITE_TEXT => ColumnType::Text,
            SQLITE_BLOB => ColumnType::Blob,
            _ => ColumnType::Null,
        }
    }

    fn column_bytes(&mut self, index: usize) -> usize {
        let index = index as c_int;
        unsafe {
            // Forces the text conversion, the length is the one of the text representation
            sqlite3_column_text(*self.statement, index);
            sqlite3_column_bytes(*self.statement, index).max(0) as usize
        }
    }

    fn column_int32(&mut self, index: usize) -> i32 {
        unsafe { sqlite3_column_int(*self.statement, index as c_int) }
    }

    fn column_int64(&mut self, index: usize) -> i64 {
        unsafe { sqlite3_column_int64(*self.statement, index as c_int) }
    }

    fn column_double(&mut self, index: usize) -> f64 {
        unsafe { sqlite3_column_double(*self.statement, index as c_int) }
    }

    fn column_text(&mut self, index: usize) -> &[u8] {
        let index = index as c_int;
        unsafe {
            let ptr = sqlite3_column_text(*self.statement, index);
            let len = sqlite3_column_bytes(*self.statement, index);
            self.bytes(ptr, len)
        }
    }

    fn column_blob(&mut self, index: usize) -> &[u8] {
        let index = index as c_int;
        unsafe {
            let ptr = sqlite3_column_blob(*self.statement, index) as *const u8;
            let len = sqlite3_column_bytes(*self.statement, index);
            self.bytes(ptr, len)
        }
    }

    fn sql(&self) -> String {
        unsafe {
            let sql = sqlite3_sql(*self.statement);
            if sql.is_null() {
                return String::new();
            }
            CStr::from_ptr(sql).to_string_lossy().into_owned()
        }
    }
}

impl Display for SqliteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:p}", *self.statement)
    }
}
