use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::error::Db2Error;
use crate::marshal::xml::{XmlDeclaration, XmlDocument};
use crate::native::{NativeValue, SqlTypeCode};

/// Values bound as command parameters or read back from a result set.
///
/// The variant is the type tag the marshaller dispatches on; `From` impls pick it
/// from the Rust type:
/// ```rust
/// use db2_middleware::prelude::*;
///
/// let params = vec![Value::from(7_i32), Value::from("alice"), Value::Null];
/// assert!(matches!(params[0], Value::Int32(7)));
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Database null
    Null,
    /// Raw bytes bound through the binary setter
    Bytes(Vec<u8>),
    /// Character data
    Text(String),
    /// Exact decimal (96-bit mantissa, scale 0..=28)
    Decimal(Decimal),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Time of day
    Time(NaiveTime),
    /// Calendar timestamp (DATE columns read back as midnight timestamps)
    Timestamp(NaiveDateTime),
    /// Binary large object
    Blob(Vec<u8>),
    /// Character large object
    Clob(String),
    /// XML document
    Xml(XmlDocument),
    /// An element whose owning document is bound in its place
    XmlElement(XmlDocument),
    /// A bare declaration node; never bound
    XmlDeclaration(XmlDeclaration),
    /// Driver value with no dedicated host representation
    Opaque(NativeValue),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) | Value::Clob(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i16(&self) -> Option<i16> {
        if let Value::Int16(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int16(value) => Some(i32::from(*value)),
            Value::Int32(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(value) => Some(i64::from(*value)),
            Value::Int32(value) => Some(i64::from(*value)),
            Value::Int64(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        if let Value::Decimal(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        if let Value::Float32(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(value) => Some(f64::from(*value)),
            Value::Float64(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let Value::Timestamp(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        if let Value::Time(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) | Value::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_xml(&self) -> Option<&XmlDocument> {
        match self {
            Value::Xml(doc) | Value::XmlElement(doc) => Some(doc),
            _ => None,
        }
    }

    /// Convert this value to the variant an explicit [`DbType`] asks for.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ConversionError` when the value cannot be represented as `db_type`.
    pub fn coerce(self, db_type: DbType) -> Result<Value, Db2Error> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = |value: &Value| {
            Db2Error::ConversionError(format!("cannot bind {value:?} as {db_type:?}"))
        };
        let coerced = match db_type {
            DbType::Object => Some(self.clone()),
            DbType::String => match &self {
                Value::Text(_) => Some(self.clone()),
                Value::Clob(text) => Some(Value::Text(text.clone())),
                Value::Int16(v) => Some(Value::Text(v.to_string())),
                Value::Int32(v) => Some(Value::Text(v.to_string())),
                Value::Int64(v) => Some(Value::Text(v.to_string())),
                Value::Decimal(v) => Some(Value::Text(v.to_string())),
                Value::Float32(v) => Some(Value::Text(v.to_string())),
                Value::Float64(v) => Some(Value::Text(v.to_string())),
                _ => None,
            },
            DbType::Int16 => self
                .as_integer()
                .and_then(|v| i16::try_from(v).ok())
                .map(Value::Int16),
            DbType::Int32 => self
                .as_integer()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int32),
            DbType::Int64 => self.as_integer().map(Value::Int64),
            DbType::Single => match &self {
                Value::Float32(_) => Some(self.clone()),
                Value::Decimal(v) => v.to_f32().map(Value::Float32),
                other => other.as_integer().and_then(|v| v.to_f32()).map(Value::Float32),
            },
            DbType::Double => match &self {
                Value::Float32(v) => Some(Value::Float64(f64::from(*v))),
                Value::Float64(_) => Some(self.clone()),
                Value::Decimal(v) => v.to_f64().map(Value::Float64),
                other => other.as_integer().and_then(|v| v.to_f64()).map(Value::Float64),
            },
            DbType::Decimal => match &self {
                Value::Decimal(_) => Some(self.clone()),
                Value::Float32(v) => Decimal::from_f32(*v).map(Value::Decimal),
                Value::Float64(v) => Decimal::from_f64(*v).map(Value::Decimal),
                Value::Text(s) => s.trim().parse::<Decimal>().ok().map(Value::Decimal),
                other => other.as_integer().map(|v| Value::Decimal(Decimal::from(v))),
            },
            DbType::DateTime => self.as_timestamp().map(Value::Timestamp),
            DbType::Date => self
                .as_timestamp()
                .map(|ts| Value::Timestamp(ts.date().and_time(NaiveTime::MIN))),
            DbType::Time => match &self {
                Value::Time(_) => Some(self.clone()),
                Value::Timestamp(ts) => NaiveTime::from_hms_opt(ts.hour(), ts.minute(), ts.second())
                    .map(Value::Time),
                _ => None,
            },
            DbType::Binary => self.as_bytes().map(|b| Value::Bytes(b.to_vec())),
            DbType::Blob => self.as_bytes().map(|b| Value::Blob(b.to_vec())),
            DbType::Clob => self.as_text().map(|s| Value::Clob(s.to_string())),
            DbType::Xml => match &self {
                Value::Xml(_) | Value::XmlElement(_) | Value::XmlDeclaration(_) => Some(self.clone()),
                Value::Text(text) => Some(Value::Xml(XmlDocument::parse(text)?)),
                _ => None,
            },
        };
        coerced.ok_or_else(|| mismatch(&self))
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Decimal(v) if v.fract().is_zero() => v.to_i64(),
            Value::Text(s) => s.trim().parse::<i64>().ok(),
            other => other.as_i64(),
        }
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int16(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float32(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<XmlDocument> for Value {
    fn from(value: XmlDocument) -> Self {
        Value::Xml(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Explicit parameter type, overriding the one inferred from the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    String,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    Date,
    Time,
    DateTime,
    Binary,
    Blob,
    Clob,
    Xml,
    Object,
}

impl DbType {
    /// Type code used when a null of this type is bound.
    #[must_use]
    pub fn null_type_code(self) -> SqlTypeCode {
        match self {
            DbType::String => SqlTypeCode::Varchar,
            DbType::Int16 => SqlTypeCode::SmallInt,
            DbType::Int32 => SqlTypeCode::Integer,
            DbType::Int64 => SqlTypeCode::BigInt,
            DbType::Single => SqlTypeCode::Real,
            DbType::Double => SqlTypeCode::Double,
            DbType::Decimal => SqlTypeCode::Decimal,
            DbType::Date => SqlTypeCode::Date,
            DbType::Time => SqlTypeCode::Time,
            DbType::DateTime => SqlTypeCode::Timestamp,
            DbType::Binary => SqlTypeCode::Binary,
            DbType::Blob => SqlTypeCode::Blob,
            DbType::Clob => SqlTypeCode::Clob,
            DbType::Xml => SqlTypeCode::SqlXml,
            DbType::Object => SqlTypeCode::Other,
        }
    }
}
