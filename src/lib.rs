//! DB2 provider core over ODBC- and JDBC-style native drivers.
//!
//! Command text is rewritten for the connection's transport, `;`-delimited batches are
//! split on the client with their parameters redistributed, and values are marshalled
//! between host types and the native driver's representation.
//!
//! The native driver itself sits behind the traits in [`native`].

pub mod batch;
pub mod catalog;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod marshal;
pub mod native;
pub mod parameters;
pub mod prelude;
pub mod reader;
pub mod results;
pub mod transaction;
pub mod translation;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use command::Command;
pub use config::{Db2Options, Db2OptionsBuilder, Transport};
pub use connection::Connection;
pub use error::Db2Error;
pub use reader::DataReader;
pub use results::{Db2Row, ResultSet};
pub use transaction::{IsolationLevel, Transaction};
pub use types::{DbType, Value};
