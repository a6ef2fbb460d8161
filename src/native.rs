//! Boundary to the underlying ODBC- or JDBC-style call layer.
//!
//! Everything here is a capability the native driver provides; the rest of the
//! crate only talks to drivers through these traits and value types.

use std::fmt;

use async_trait::async_trait;
use bigdecimal::BigDecimal;

/// Native type codes used for typed nulls (`java.sql.Types` numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlTypeCode {
    Varchar,
    Binary,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Date,
    Time,
    Timestamp,
    Blob,
    Clob,
    SqlXml,
    Other,
}

impl SqlTypeCode {
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            SqlTypeCode::Varchar => 12,
            SqlTypeCode::Binary => -2,
            SqlTypeCode::SmallInt => 5,
            SqlTypeCode::Integer => 4,
            SqlTypeCode::BigInt => -5,
            SqlTypeCode::Real => 7,
            SqlTypeCode::Double => 8,
            SqlTypeCode::Decimal => 3,
            SqlTypeCode::Date => 91,
            SqlTypeCode::Time => 92,
            SqlTypeCode::Timestamp => 93,
            SqlTypeCode::Blob => 2004,
            SqlTypeCode::Clob => 2005,
            SqlTypeCode::SqlXml => 2009,
            SqlTypeCode::Other => 1111,
        }
    }
}

/// Milliseconds since 1970-01-01, as carried by native DATE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeDate {
    pub millis: i64,
}

/// Native time of day with whole-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Native timestamp: whole seconds since 1970-01-01 plus a non-negative nanosecond part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl NativeTimestamp {
    /// Millisecond view of the timestamp; sub-millisecond nanos are dropped.
    /// `None` when the seconds do not fit in an `i64` millisecond count.
    #[must_use]
    pub fn millis(&self) -> Option<i64> {
        self.seconds
            .checked_mul(1000)?
            .checked_add(i64::from(self.nanos / 1_000_000))
    }
}

/// A value handed back by the native driver's generic object getter.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    String(String),
    Short(i16),
    Int(i32),
    Long(i64),
    BigDecimal(BigDecimal),
    Float(f32),
    Double(f64),
    Date(NativeDate),
    Time(NativeTime),
    Timestamp(NativeTimestamp),
    Bytes(Vec<u8>),
    SqlXml(String),
    /// Driver-specific object rendered by the driver.
    Other(String),
}

impl NativeValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, NativeValue::Null)
    }
}

/// One bind handed to a native statement, one variant per setter family.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeParam {
    String(String),
    Short(i16),
    Int(i32),
    Long(i64),
    BigDecimal(BigDecimal),
    Float(f32),
    Double(f64),
    Time(NativeTime),
    Timestamp(NativeTimestamp),
    Bytes(Vec<u8>),
    BinaryStream(Vec<u8>),
    CharacterStream(String),
    Null(SqlTypeCode),
    Object(NativeValue),
}

/// Where a bind lands: a parameter marker name or a 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindTarget {
    Named(String),
    Position(usize),
}

impl fmt::Display for BindTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindTarget::Named(name) => write!(f, ":{name}"),
            BindTarget::Position(pos) => write!(f, "#{pos}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

/// Column metadata as reported by the native result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub label: String,
    pub type_name: String,
    pub nullability: Nullability,
}

impl ColumnMetadata {
    #[must_use]
    pub fn new(label: impl Into<String>, type_name: impl Into<String>, nullability: Nullability) -> Self {
        Self {
            label: label.into(),
            type_name: type_name.into(),
            nullability,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeErrorKind {
    /// The driver could not convert the stored value to the requested type.
    InvalidCast,
    /// The server rejected the statement.
    Sql,
    Other,
}

/// Failure raised by the native layer, carrying its diagnostic text verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub kind: NativeErrorKind,
    pub message: String,
    pub sql_state: Option<String>,
    /// Full native diagnostic text, e.g. the driver's stack trace.
    pub diagnostics: Option<String>,
}

const GENERIC_CAST_MESSAGE: &str = "Specified cast is not valid.";

impl NativeError {
    #[must_use]
    pub fn new(kind: NativeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sql_state: None,
            diagnostics: None,
        }
    }

    #[must_use]
    pub fn invalid_cast(message: impl Into<String>) -> Self {
        Self::new(NativeErrorKind::InvalidCast, message)
    }

    #[must_use]
    pub fn sql(sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sql_state: Some(sql_state.into()),
            ..Self::new(NativeErrorKind::Sql, message)
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = Some(diagnostics.into());
        self
    }

    /// A cast failure caused by a database null in a character column.
    #[must_use]
    pub fn signals_db_null(&self) -> bool {
        self.kind == NativeErrorKind::InvalidCast && self.message.contains("DBNull")
    }

    /// Like [`signals_db_null`](Self::signals_db_null), but also accepts the generic
    /// cast message some drivers raise for null LOB locators.
    #[must_use]
    pub fn signals_null_lob(&self) -> bool {
        self.signals_db_null()
            || (self.kind == NativeErrorKind::InvalidCast && self.message == GENERIC_CAST_MESSAGE)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.diagnostics {
            Some(diagnostics) => f.write_str(diagnostics),
            None => match &self.sql_state {
                Some(state) => write!(f, "[{state}] {}", self.message),
                None => f.write_str(&self.message),
            },
        }
    }
}

impl std::error::Error for NativeError {}

pub type NativeResult<T> = Result<T, NativeError>;

/// Opens native connections from a connection string.
#[async_trait]
pub trait NativeDriver: Send + Sync {
    async fn connect(&self, connection_string: &str) -> NativeResult<Box<dyn NativeConnection>>;
}

/// Native connection handle.
#[async_trait]
pub trait NativeConnection: Send {
    async fn prepare(&mut self, sql: &str) -> NativeResult<Box<dyn NativeStatement>>;

    async fn set_auto_commit(&mut self, auto_commit: bool) -> NativeResult<()>;

    async fn set_transaction_isolation(&mut self, level: i32) -> NativeResult<()>;

    async fn commit(&mut self) -> NativeResult<()>;

    async fn rollback(&mut self) -> NativeResult<()>;

    async fn close(&mut self) -> NativeResult<()>;
}

/// Prepared native statement.
#[async_trait]
pub trait NativeStatement: Send {
    fn bind(&mut self, target: &BindTarget, param: NativeParam) -> NativeResult<()>;

    fn set_query_timeout(&mut self, seconds: u32) -> NativeResult<()>;

    async fn execute_update(&mut self) -> NativeResult<u64>;

    async fn execute_query(&mut self) -> NativeResult<Box<dyn NativeResultSet>>;

    /// Advance to the statement's next result set, if the driver produced one.
    async fn more_results(&mut self) -> NativeResult<Option<Box<dyn NativeResultSet>>>;

    async fn close(&mut self) -> NativeResult<()>;
}

/// Forward-only native cursor.
#[async_trait]
pub trait NativeResultSet: Send {
    fn metadata(&self) -> NativeResult<Vec<ColumnMetadata>>;

    async fn next(&mut self) -> NativeResult<bool>;

    /// Generic getter; `ordinal` is zero-based.
    async fn get_object(&mut self, ordinal: usize) -> NativeResult<NativeValue>;

    async fn get_string(&mut self, ordinal: usize) -> NativeResult<Option<String>>;

    /// Copy bytes of a binary column starting at `offset` into `buf`, returning how many were written.
    async fn get_bytes(&mut self, ordinal: usize, offset: u64, buf: &mut [u8]) -> NativeResult<usize>;

    async fn close(&mut self) -> NativeResult<()>;
}
