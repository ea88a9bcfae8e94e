mod blob;
mod cbox;
mod connection;
mod driver;
mod statement;

use libsqlite3_sys::{SQLITE_TOOBIG, sqlite3, sqlite3_errmsg};
use std::{
    ffi::{CStr, c_char, c_int},
    ptr,
};

pub use blob::*;
pub(crate) use cbox::*;
pub use connection::*;
pub use driver::*;
pub use statement::*;

/// A connection to a sqlite database.
pub type SqliteConnection = rowbind_core::Connection<SqliteDriver>;

pub(crate) fn error_message_from_ptr(ptr: &'_ *const c_char) -> &'_ str {
    unsafe {
        if *ptr != ptr::null() {
            CStr::from_ptr(*ptr)
                .to_str()
                .unwrap_or("Unknown error (the error message was not a valid C string)")
        } else {
            "Unknown error (could not extract the error message)"
        }
    }
}

pub(crate) fn engine_error(connection: *mut sqlite3, code: c_int) -> rowbind_core::EngineError {
    let message = unsafe { error_message_from_ptr(&sqlite3_errmsg(connection)).to_string() };
    rowbind_core::EngineError::new(code, message)
}

/// Byte length as the engine takes it, refusing lengths that do not fit a `c_int`.
pub(crate) fn c_len(len: usize) -> Result<c_int, rowbind_core::EngineError> {
    c_int::try_from(len).map_err(|_| {
        rowbind_core::EngineError::new(
            SQLITE_TOOBIG,
            format!("A length of {} bytes exceeds the engine limit of {}", len, c_int::MAX),
        )
    })
}
