//! Per-result-set column descriptors and name resolution.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Db2Error;
use crate::native::{ColumnMetadata, Nullability};

/// Read-path type tag derived from the native type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// CHARACTER, VARCHAR, CLOB, GRAPHIC, VARGRAPHIC, DBCLOB
    Character,
    Blob,
    Int16,
    Int32,
    Int64,
    /// DECIMAL and DECFLOAT
    Decimal,
    Float32,
    Float64,
    Date,
    Time,
    Timestamp,
    Xml,
    /// Anything else; read through the generic object getter.
    Default,
}

impl ColumnKind {
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name.trim().to_ascii_uppercase().as_str() {
            "CHARACTER" | "CHAR" | "VARCHAR" | "CLOB" | "GRAPHIC" | "VARGRAPHIC" | "DBCLOB" => {
                ColumnKind::Character
            }
            "BLOB" => ColumnKind::Blob,
            "SMALLINT" => ColumnKind::Int16,
            "INTEGER" | "INT" => ColumnKind::Int32,
            "BIGINT" => ColumnKind::Int64,
            "DECIMAL" | "DECFLOAT" => ColumnKind::Decimal,
            "REAL" => ColumnKind::Float32,
            "DOUBLE" => ColumnKind::Float64,
            "DATE" => ColumnKind::Date,
            "TIME" => ColumnKind::Time,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "XML" => ColumnKind::Xml,
            _ => ColumnKind::Default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_name: String,
    pub kind: ColumnKind,
    pub nullability: Nullability,
}

impl ColumnDescriptor {
    /// Unknown nullability counts as nullable.
    #[must_use]
    pub fn allows_null(&self) -> bool {
        !matches!(self.nullability, Nullability::NoNulls)
    }
}

impl From<ColumnMetadata> for ColumnDescriptor {
    fn from(meta: ColumnMetadata) -> Self {
        let kind = ColumnKind::from_type_name(&meta.type_name);
        Self {
            name: meta.label,
            type_name: meta.type_name,
            kind,
            nullability: meta.nullability,
        }
    }
}

/// Column layout of one result set, plus the rotating name cursor.
///
/// Repeated lookups of a duplicated label walk through its occurrences in order:
/// for columns `ID, NOTE, ID, NOTE`, asking for `id`, `note`, `id`, `note` yields
/// ordinals 0, 1, 2, 3.
#[derive(Debug, Default)]
pub struct ColumnCatalog {
    columns: Vec<ColumnDescriptor>,
    cursor: AtomicUsize,
}

impl ColumnCatalog {
    #[must_use]
    pub fn from_metadata(metadata: Vec<ColumnMetadata>) -> Self {
        Self {
            columns: metadata.into_iter().map(ColumnDescriptor::from).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// # Errors
    ///
    /// Returns `Db2Error::OrdinalOutOfRange` for an ordinal past the last column.
    pub fn column(&self, ordinal: usize) -> Result<&ColumnDescriptor, Db2Error> {
        self.columns
            .get(ordinal)
            .ok_or(Db2Error::OrdinalOutOfRange(ordinal))
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Resolve `name` case-insensitively, starting at the rotating cursor.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ColumnNotFound` when no column carries the name.
    pub fn ordinal(&self, name: &str) -> Result<usize, Db2Error> {
        let len = self.columns.len();
        if len > 0 {
            let wanted = name.to_uppercase();
            let start = self.cursor.load(Ordering::Relaxed) % len;
            for step in 0..len {
                let idx = (start + step) % len;
                if self.columns[idx].name.to_uppercase() == wanted {
                    self.cursor.store((idx + 1) % len, Ordering::Relaxed);
                    return Ok(idx);
                }
            }
        }
        Err(Db2Error::ColumnNotFound(name.to_string()))
    }
}
