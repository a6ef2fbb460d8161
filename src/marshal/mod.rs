//! Host <-> native value conversion.
//!
//! The write path turns a [`Value`] into the [`NativeParam`] setter family its tag
//! calls for; the read path turns a native column into a [`Value`] according to the
//! column's [`ColumnKind`].

pub mod decimal;
pub mod lob;
pub mod temporal;
pub mod xml;

use chrono::{NaiveTime, Timelike};
use rust_decimal::Decimal;
use tracing::trace;

use crate::catalog::ColumnKind;
use crate::config::Transport;
use crate::error::Db2Error;
use crate::native::{NativeParam, NativeResultSet, NativeValue, SqlTypeCode};
use crate::parameters::Parameter;
use crate::types::{DbType, Value};

use xml::{XmlDeclaration, XmlDocument};

/// A parameter ready for the native statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBind {
    /// Marker name without sigil.
    pub name: String,
    pub param: NativeParam,
}

/// Normalize and convert one parameter.
///
/// XML declaration values are never bound and yield `None`. XML element values are
/// bound as their owning document under the parameter name minus its last character.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` or `Db2Error::XmlError` when the value cannot be converted.
pub fn prepare_bind(param: &Parameter, transport: Transport) -> Result<Option<PreparedBind>, Db2Error> {
    let value = match param.db_type() {
        Some(db_type) => param.value().clone().coerce(db_type)?,
        None => param.value().clone(),
    };
    let value = match value {
        Value::XmlDeclaration(_) => return Ok(None),
        Value::XmlElement(doc) => Value::Xml(doc),
        other => other,
    };
    let name = bind_name(param);
    let native = to_native_param(value, param.db_type(), transport)?;
    trace!(parameter = %name, "prepared bind");
    Ok(Some(PreparedBind { name, param: native }))
}

/// Marker name a parameter binds under: its clean name, minus the last character
/// for XML element values.
pub(crate) fn bind_name(param: &Parameter) -> String {
    let name = param.clean_name();
    if matches!(param.value(), Value::XmlElement(_)) {
        let mut chars = name.chars();
        chars.next_back();
        chars.as_str().to_string()
    } else {
        name.to_string()
    }
}

/// Convert a host value to the native setter it dispatches to.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` for unbindable values and `Db2Error::XmlError`
/// when an XML document cannot be encoded in its declared encoding.
pub fn to_native_param(
    value: Value,
    db_type: Option<DbType>,
    transport: Transport,
) -> Result<NativeParam, Db2Error> {
    Ok(match value {
        Value::Null => NativeParam::Null(db_type.map_or(SqlTypeCode::Varchar, DbType::null_type_code)),
        Value::Bytes(bytes) => NativeParam::Bytes(bytes),
        Value::Text(text) => NativeParam::String(text),
        Value::Decimal(d) => NativeParam::BigDecimal(decimal::to_native_decimal(d)?),
        Value::Int16(v) => NativeParam::Short(v),
        Value::Int32(v) => NativeParam::Int(v),
        Value::Int64(v) => NativeParam::Long(v),
        Value::Float32(v) => NativeParam::Float(v),
        Value::Float64(v) => NativeParam::Double(v),
        Value::Time(t) => NativeParam::Time(temporal::to_native_time(t)),
        Value::Timestamp(ts) => NativeParam::Timestamp(temporal::to_native_timestamp(ts)?),
        Value::Blob(bytes) => NativeParam::BinaryStream(bytes),
        Value::Clob(text) => NativeParam::CharacterStream(text),
        Value::Xml(doc) | Value::XmlElement(doc) => {
            let payload = doc.to_declared_bytes()?;
            match transport {
                Transport::Jdbc => NativeParam::BinaryStream(payload),
                Transport::Odbc => NativeParam::Bytes(payload),
            }
        }
        Value::XmlDeclaration(decl) => {
            return Err(Db2Error::ConversionError(format!(
                "XML declaration '{decl}' cannot be bound on its own"
            )));
        }
        Value::Opaque(native) => NativeParam::Object(native),
    })
}

/// Read column `ordinal` of the current row as a host value.
///
/// # Errors
///
/// Returns `Db2Error::Native` for driver failures other than the null signals, and
/// `Db2Error::ConversionError` when the driver hands back a value that does not fit `kind`.
pub async fn read_value(
    rs: &mut dyn NativeResultSet,
    ordinal: usize,
    kind: ColumnKind,
) -> Result<Value, Db2Error> {
    match kind {
        ColumnKind::Character => Ok(lob::read_character(rs, ordinal).await?.map_or(Value::Null, Value::Text)),
        ColumnKind::Blob => Ok(lob::read_blob(rs, ordinal).await?.map_or(Value::Null, Value::Bytes)),
        ColumnKind::Xml => match lob::read_character(rs, ordinal).await? {
            Some(text) if !text.is_empty() => {
                let doc = XmlDocument::parse(&text)?.with_declaration(XmlDeclaration::utf16());
                Ok(Value::Xml(doc))
            }
            _ => Ok(Value::Null),
        },
        ColumnKind::Default => {
            let native = rs.get_object(ordinal).await?;
            Ok(if native.is_null() { Value::Null } else { Value::Opaque(native) })
        }
        typed => {
            let native = rs.get_object(ordinal).await?;
            from_native_value(native, typed)
        }
    }
}

/// Convert a typed native value according to the column kind.
///
/// # Errors
///
/// Returns `Db2Error::ConversionError` when `native` does not fit `kind`.
pub fn from_native_value(native: NativeValue, kind: ColumnKind) -> Result<Value, Db2Error> {
    if native.is_null() {
        return Ok(Value::Null);
    }
    let converted = match (kind, native) {
        (ColumnKind::Int16, NativeValue::Short(v)) => Value::Int16(v),
        (ColumnKind::Int16, NativeValue::Int(v)) => Value::Int16(
            i16::try_from(v).map_err(|e| Db2Error::ConversionError(format!("SMALLINT {v}: {e}")))?,
        ),
        (ColumnKind::Int32, NativeValue::Short(v)) => Value::Int32(i32::from(v)),
        (ColumnKind::Int32, NativeValue::Int(v)) => Value::Int32(v),
        (ColumnKind::Int64, NativeValue::Short(v)) => Value::Int64(i64::from(v)),
        (ColumnKind::Int64, NativeValue::Int(v)) => Value::Int64(i64::from(v)),
        (ColumnKind::Int64, NativeValue::Long(v)) => Value::Int64(v),
        (ColumnKind::Float32, NativeValue::Float(v)) => Value::Float32(v),
        (ColumnKind::Float32, NativeValue::Double(v)) => Value::Float32(v as f32),
        (ColumnKind::Float64, NativeValue::Float(v)) => Value::Float64(f64::from(v)),
        (ColumnKind::Float64, NativeValue::Double(v)) => Value::Float64(v),
        (ColumnKind::Decimal, NativeValue::BigDecimal(v)) => Value::Decimal(decimal::to_host_decimal(&v)?),
        (ColumnKind::Decimal, NativeValue::String(s)) => Value::Decimal(decimal::parse_host_decimal(&s)?),
        (ColumnKind::Decimal, NativeValue::Int(v)) => Value::Decimal(Decimal::from(v)),
        (ColumnKind::Decimal, NativeValue::Long(v)) => Value::Decimal(Decimal::from(v)),
        (ColumnKind::Date | ColumnKind::Timestamp, NativeValue::Date(d)) => {
            Value::Timestamp(temporal::from_native_date(d)?)
        }
        (ColumnKind::Date | ColumnKind::Timestamp, NativeValue::Timestamp(ts)) => {
            Value::Timestamp(temporal::from_native_timestamp(ts)?)
        }
        (ColumnKind::Time, NativeValue::Time(t)) => Value::Time(temporal::from_native_time(t)?),
        (ColumnKind::Time, NativeValue::Timestamp(ts)) => {
            let at = temporal::from_native_timestamp(ts)?;
            NaiveTime::from_hms_opt(at.hour(), at.minute(), at.second())
                .map(Value::Time)
                .ok_or_else(|| Db2Error::ConversionError(format!("{at} has no valid time of day")))?
        }
        (ColumnKind::Character, NativeValue::String(s)) => Value::Text(s),
        (ColumnKind::Blob, NativeValue::Bytes(b)) => Value::Bytes(b),
        (ColumnKind::Default, other) => Value::Opaque(other),
        (kind, other) => {
            return Err(Db2Error::ConversionError(format!(
                "driver returned {other:?} for a {kind:?} column"
            )));
        }
    };
    Ok(converted)
}
