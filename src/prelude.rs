//! Common imports.
//!
//! ```rust
//! use db2_middleware::prelude::*;
//! ```

pub use crate::batch::{BatchSegment, split_batch};
pub use crate::catalog::{ColumnCatalog, ColumnDescriptor, ColumnKind};
pub use crate::command::Command;
pub use crate::config::{Db2Options, Db2OptionsBuilder, Transport};
pub use crate::connection::Connection;
pub use crate::error::Db2Error;
pub use crate::marshal::xml::{XmlDeclaration, XmlDocument};
pub use crate::native::{
    BindTarget, ColumnMetadata, NativeConnection, NativeDriver, NativeError, NativeErrorKind,
    NativeParam, NativeResultSet, NativeStatement, NativeValue, Nullability,
};
pub use crate::parameters::{Parameter, ParameterCollection};
pub use crate::reader::DataReader;
pub use crate::results::{Db2Row, ResultSet};
pub use crate::transaction::{IsolationLevel, Transaction};
pub use crate::translation::{RewriteMode, collapse_xml_pairs, rewrite_parameters};
pub use crate::types::{DbType, Value};
