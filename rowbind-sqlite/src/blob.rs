use crate::{CBox, engine_error};
use libsqlite3_sys::{
    SQLITE_OK, SQLITE_RANGE, sqlite3, sqlite3_blob, sqlite3_blob_bytes, sqlite3_blob_close,
    sqlite3_blob_read, sqlite3_blob_reopen, sqlite3_blob_write,
};
use rowbind_core::{EngineError, RawBlob, ReopenBlob};
use std::{
    ffi::{c_int, c_void},
    rc::Rc,
};

/// Incremental I/O handle on one blob value.
pub struct SqliteBlob {
    pub(crate) blob: CBox<sqlite3_blob>,
    pub(crate) connection: Rc<CBox<sqlite3>>,
}

impl SqliteBlob {
    fn error(&self, code: c_int) -> EngineError {
        engine_error(**self.connection, code)
    }

    fn check(&self, len: usize, offset: usize) -> Result<(c_int, c_int), EngineError> {
        match (c_int::try_from(len), c_int::try_from(offset)) {
            (Ok(len), Ok(offset)) => Ok((len, offset)),
            _ => Err(EngineError::new(
                SQLITE_RANGE,
                format!(
                    "Blob access of {} bytes at offset {} exceeds the engine limits",
                    len, offset
                ),
            )),
        }
    }
}

impl RawBlob for SqliteBlob {
    fn size(&self) -> usize {
        unsafe { sqlite3_blob_bytes(*self.blob).max(0) as usize }
    }

    fn read(&mut self, buffer: &mut [u8], offset: usize) -> Result<(), EngineError> {
        let (len, offset) = self.check(buffer.len(), offset)?;
        let rc = unsafe {
            sqlite3_blob_read(*self.blob, buffer.as_mut_ptr() as *mut c_void, len, offset)
        };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        Ok(())
    }

    fn write(&mut self, buffer: &[u8], offset: usize) -> Result<(), EngineError> {
        let (len, offset) = self.check(buffer.len(), offset)?;
        let rc = unsafe {
            sqlite3_blob_write(*self.blob, buffer.as_ptr() as *const c_void, len, offset)
        };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        Ok(())
    }

    fn close(self) -> Result<(), EngineError> {
        let SqliteBlob { blob, connection } = self;
        let rc = unsafe { sqlite3_blob_close(blob.into_raw()) };
        if rc != SQLITE_OK {
            return Err(engine_error(**connection, rc));
        }
        Ok(())
    }
}

impl ReopenBlob for SqliteBlob {
    fn reopen(&mut self, row_id: i64) -> Result<(), EngineError> {
        let rc = unsafe { sqlite3_blob_reopen(*self.blob, row_id) };
        if rc != SQLITE_OK {
            return Err(self.error(rc));
        }
        Ok(())
    }
}
