mod blob;
mod connection;
mod diagnostic;
mod driver;
mod error;
#[cfg(test)]
mod fake;
mod maintenance;
mod marshal;
mod options;
mod param;
mod registry;
mod slot;
mod util;

pub use ::anyhow::Context;
pub use blob::*;
pub use connection::*;
pub use diagnostic::Diagnostic;
pub use driver::*;
pub use error::*;
pub use options::*;
pub use param::*;
pub use slot::*;
pub use util::*;

pub type Result<T, E = Error> = anyhow::Result<T, E>;
pub type Error = anyhow::Error;
