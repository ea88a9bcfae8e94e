use crate::{CBox, SqliteRaw, engine_error, error_message_from_ptr};
use libsqlite3_sys::{
    SQLITE_CANTOPEN, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, sqlite3_close, sqlite3_errstr, sqlite3_open_v2,
};
use rowbind_core::{ConnectOptions, Driver, EngineError, OpenMode};
use std::{ffi::CString, ptr, rc::Rc};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver {}

impl SqliteDriver {
    pub const fn new() -> Self {
        Self {}
    }
}

impl Driver for SqliteDriver {
    type Raw = SqliteRaw;

    const NAME: &'static str = "sqlite";

    fn open(&self, options: &ConnectOptions) -> Result<SqliteRaw, EngineError> {
        let path = CString::new(options.path.as_str()).map_err(|e| {
            EngineError::new(
                SQLITE_CANTOPEN,
                format!("Invalid database path `{}`: {}", options.path, e),
            )
        })?;
        let flags = SQLITE_OPEN_URI
            | match options.mode {
                OpenMode::ReadOnly => SQLITE_OPEN_READONLY,
                OpenMode::ReadWrite => SQLITE_OPEN_READWRITE,
                OpenMode::ReadWriteCreate => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
            };
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe { sqlite3_open_v2(path.as_ptr(), connection.as_out(), flags, ptr::null()) };
        if rc != SQLITE_OK {
            // Only an allocation failure leaves the handle null
            return Err(if connection.is_null() {
                EngineError::new(rc, unsafe {
                    error_message_from_ptr(&sqlite3_errstr(rc)).to_string()
                })
            } else {
                engine_error(*connection, rc)
            });
        }
        log::trace!("sqlite3_open_v2 `{}` with flags {:#x}", options.path, flags);
        Ok(SqliteRaw {
            connection: Rc::new(connection),
        })
    }
}
