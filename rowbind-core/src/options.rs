use crate::{Driver, ErrorKind, Result, SqlError};
use url::form_urlencoded;

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
    #[default]
    ReadWriteCreate,
}

impl OpenMode {
    pub fn is_readonly(self) -> bool {
        self == OpenMode::ReadOnly
    }
}

/// Everything needed to open a connection.
///
/// The path is passed to the engine verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    pub path: String,
    pub mode: OpenMode,
}

impl ConnectOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: OpenMode::default(),
        }
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parse a connection URL in the form `<driver>://<path>?mode=<ro|rw|rwc>`.
    ///
    /// The path is percent-decoded. A missing `mode` means `rwc`.
    pub fn from_url<D: Driver>(url: &str) -> Result<Self> {
        let prefix = format!("{}://", D::NAME);
        let Some(rest) = url.strip_prefix(&prefix) else {
            return Err(SqlError::new(
                ErrorKind::Connection,
                format!("Expected {} connection url to start with `{}`", D::NAME, prefix),
            )
            .into());
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let path = urlencoding::decode(path).map_err(|e| {
            SqlError::new(
                ErrorKind::Connection,
                format!("Could not decode the path `{}`: {}", path, e),
            )
        })?;
        if path.is_empty() {
            return Err(SqlError::new(
                ErrorKind::Connection,
                format!("Missing database path in connection url `{}`", url),
            )
            .into());
        }
        let mut options = Self::new(path);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "mode" => {
                    options.mode = match value.as_ref() {
                        "ro" => OpenMode::ReadOnly,
                        "rw" => OpenMode::ReadWrite,
                        "rwc" => OpenMode::ReadWriteCreate,
                        _ => {
                            return Err(SqlError::new(
                                ErrorKind::Connection,
                                format!("Unknown open mode `{}` in connection url", value),
                            )
                            .into());
                        }
                    }
                }
                _ => {
                    return Err(SqlError::new(
                        ErrorKind::Connection,
                        format!("Unknown connection url parameter `{}`", key),
                    )
                    .into());
                }
            }
        }
        Ok(options)
    }
}
