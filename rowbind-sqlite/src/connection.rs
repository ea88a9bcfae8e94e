use crate::{CBox, SqliteBlob, SqliteStatement, c_len, engine_error};
use libsqlite3_sys::{
    SQLITE_ERROR, SQLITE_MISUSE, SQLITE_OK, sqlite3, sqlite3_blob_close, sqlite3_blob_open,
    sqlite3_changes64, sqlite3_finalize, sqlite3_last_insert_rowid, sqlite3_prepare_v2,
    sqlite3_stmt,
};
use rowbind_core::{EngineError, RawConnection, truncate_long};
use std::{
    ffi::{CString, c_char, c_int},
    ptr,
    rc::Rc,
};

/// An open sqlite database handle.
///
/// The handle is shared with the statements and blobs opened from it and closed with
/// `sqlite3_close` once the last of them is gone.
pub struct SqliteRaw {
    pub(crate) connection: Rc<CBox<sqlite3>>,
}

impl SqliteRaw {
    fn error(&self, code: c_int) -> EngineError {
        engine_error(**self.connection, code)
    }
}

fn finalize(statement: *mut sqlite3_stmt) {
    unsafe {
        sqlite3_finalize(statement);
    }
}

fn c_string(value: &str, what: &str) -> Result<CString, EngineError> {
    CString::new(value).map_err(|e| {
        EngineError::new(
            SQLITE_MISUSE,
            format!("Could not create a CString from the {} `{}`: {}", what, value, e),
        )
    })
}

impl RawConnection for SqliteRaw {
    type Statement = SqliteStatement;
    type Blob = SqliteBlob;

    fn prepare(&self, sql: &str) -> Result<SqliteStatement, EngineError> {
        let len = c_len(sql.len())?;
        let mut statement = CBox::new(ptr::null_mut(), finalize);
        let c_ptr = sql.as_ptr() as *const c_char;
        let end = unsafe { c_ptr.add(sql.len()) };
        let mut tail = ptr::null();
        let rc = unsafe {
            sqlite3_prepare_v2(**self.connection, c_ptr, len, statement.as_out(), &mut tail)
        };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        if statement.is_null() {
            return Err(EngineError::new(
                SQLITE_ERROR,
                "The query does not contain any statement",
            ));
        }
        // The tail may only hold whitespace, semicolons and comments
        while !tail.is_null() && tail < end {
            let mut extra = CBox::new(ptr::null_mut(), finalize);
            let mut next = ptr::null();
            let rc = unsafe {
                sqlite3_prepare_v2(
                    **self.connection,
                    tail,
                    end.offset_from(tail) as c_int,
                    extra.as_out(),
                    &mut next,
                )
            };
            if rc != SQLITE_OK {
                return Err(self.error(rc));
            }
            if !extra.is_null() {
                return Err(EngineError::new(
                    SQLITE_ERROR,
                    "Cannot prepare more than one statement at a time",
                ));
            }
            if next <= tail {
                break;
            }
            tail = next;
        }
        log::trace!("sqlite3_prepare_v2:\n{}", truncate_long(sql));
        Ok(SqliteStatement {
            statement,
            connection: self.connection.clone(),
        })
    }

    fn open_blob(
        &self,
        table: &str,
        column: &str,
        row_id: i64,
        readonly: bool,
    ) -> Result<SqliteBlob, EngineError> {
        let table = c_string(table, "table name")?;
        let column = c_string(column, "column name")?;
        let mut blob = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_blob_close(p);
        });
        let rc = unsafe {
            sqlite3_blob_open(
                **self.connection,
                c"main".as_ptr(),
                table.as_ptr(),
                column.as_ptr(),
                row_id,
                if readonly { 0 } else { 1 },
                blob.as_out(),
            )
        };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        Ok(SqliteBlob {
            blob,
            connection: self.connection.clone(),
        })
    }

    fn last_insert_rowid(&self) -> i64 {
        unsafe { sqlite3_last_insert_rowid(**self.connection) }
    }

    fn changes(&self) -> u64 {
        unsafe { sqlite3_changes64(**self.connection) as u64 }
    }
}
