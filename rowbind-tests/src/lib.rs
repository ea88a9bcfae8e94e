mod blobs;
mod conversions;
mod errors;
mod maintenance;
mod nulls;
mod simple;

use crate::{
    blobs::blobs, conversions::conversions, errors::errors, maintenance::maintenance,
    nulls::nulls, simple::simple,
};
use log::LevelFilter;
use rowbind::{Connection, Driver, RawConnection, ReopenBlob};
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub fn execute_tests<D: Driver>(connection: &mut Connection<D>)
where
    <D::Raw as RawConnection>::Blob: ReopenBlob,
{
    simple(connection);
    conversions(connection);
    nulls(connection);
    errors(connection);
    blobs(connection);
    maintenance(connection);
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
