//! Test support: an in-memory native driver.

pub mod mock;

pub use mock::{MockDriver, MockOp, MockResult, MockState};

use crate::config::{Db2Options, Transport};
use crate::connection::Connection;

/// A connection over a fresh mock driver.
#[must_use]
pub fn mock_connection(options: Db2Options) -> (Connection, MockDriver) {
    let driver = MockDriver::new();
    let conn = Connection::new(driver.connection(), options);
    (conn, driver)
}

/// Options for `transport` with default settings.
#[must_use]
pub fn options(transport: Transport) -> Db2Options {
    Db2Options::new("Database=SAMPLE".to_string(), transport)
}
