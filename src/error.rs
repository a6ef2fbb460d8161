use thiserror::Error;

use crate::native::NativeError;

#[derive(Debug, Error)]
pub enum Db2Error {
    #[error(transparent)]
    Native(#[from] NativeError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("The parameter already belongs to a collection")]
    ParameterOwned,

    #[error("The parameter does not belong to this collection")]
    ParameterNotOwned,

    #[error("Parameter index {index} is out of range (collection holds {len})")]
    ParameterIndexOutOfRange { index: usize, len: usize },

    #[error("Batch needs at least {required} parameters but only {supplied} were supplied")]
    ParameterUnderflow { required: usize, supplied: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column ordinal {0} is out of range")]
    OrdinalOutOfRange(usize),

    #[error("DB2 returned null for column {ordinal}")]
    NullValue { ordinal: usize },

    #[error("Value conversion error: {0}")]
    ConversionError(String),

    #[error("XML error: {0}")]
    XmlError(String),

    #[error("Transaction has already been committed or rolled back")]
    TransactionCompleted,

    #[error("Isolation level {0} is not supported")]
    UnsupportedIsolationLevel(String),

    #[error("Connection is not open")]
    ConnectionClosed,

    #[error("Reader is closed")]
    ReaderClosed,

    #[error("No data exists for the current row")]
    NoCurrentRow,

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl Db2Error {
    /// True for errors that came back from the native driver.
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Db2Error::Native(_))
    }
}
