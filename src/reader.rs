use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use chrono::{NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::batch::BatchSegment;
use crate::catalog::{ColumnCatalog, ColumnKind};
use crate::command::{close_statement_quietly, prepare_statement};
use crate::connection::Connection;
use crate::error::Db2Error;
use crate::marshal::read_value;
use crate::marshal::xml::XmlDocument;
use crate::native::{NativeResultSet, NativeStatement};
use crate::results::ResultSet;
use crate::types::Value;

/// Forward-only reader over the result sets of a command.
///
/// Batches split on the client run one statement at a time; when a statement has no
/// further result sets, [`next_result`](DataReader::next_result) prepares and executes
/// the next one. Column metadata is classified once per result set.
pub struct DataReader<'a> {
    conn: &'a mut Connection,
    timeout_secs: u32,
    pending: VecDeque<BatchSegment>,
    statement: Option<Box<dyn NativeStatement>>,
    result: Option<Box<dyn NativeResultSet>>,
    catalog: OnceLock<ColumnCatalog>,
    has_row: bool,
    closed: bool,
}

impl<'a> DataReader<'a> {
    pub(crate) async fn open(
        conn: &'a mut Connection,
        segments: Vec<BatchSegment>,
        timeout_secs: u32,
    ) -> Result<Self, Db2Error> {
        let mut reader = Self {
            conn,
            timeout_secs,
            pending: segments.into(),
            statement: None,
            result: None,
            catalog: OnceLock::new(),
            has_row: false,
            closed: false,
        };
        if let Err(e) = reader.execute_next_segment().await {
            reader.close().await;
            return Err(e);
        }
        Ok(reader)
    }

    async fn execute_next_segment(&mut self) -> Result<bool, Db2Error> {
        let Some(segment) = self.pending.pop_front() else {
            return Ok(false);
        };
        let mut stmt = prepare_statement(&mut *self.conn, &segment, self.timeout_secs).await?;
        match stmt.execute_query().await {
            Ok(rs) => {
                debug!(sql = %segment.text, remaining = self.pending.len(), "executing batch segment");
                self.statement = Some(stmt);
                self.result = Some(rs);
                Ok(true)
            }
            Err(e) => {
                close_statement_quietly(stmt).await;
                Err(e.into())
            }
        }
    }

    fn ensure_open(&self) -> Result<(), Db2Error> {
        if self.closed { Err(Db2Error::ReaderClosed) } else { Ok(()) }
    }

    /// Advance to the next row of the current result set.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ReaderClosed` after [`close`](DataReader::close), or the native failure.
    pub async fn read(&mut self) -> Result<bool, Db2Error> {
        self.ensure_open()?;
        self.has_row = match self.result.as_mut() {
            Some(rs) => rs.next().await?,
            None => false,
        };
        Ok(self.has_row)
    }

    /// Move to the next result set, executing the next batch statement when the
    /// current one is exhausted.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ReaderClosed` after close, or the native failure.
    pub async fn next_result(&mut self) -> Result<bool, Db2Error> {
        self.ensure_open()?;
        self.has_row = false;
        self.catalog = OnceLock::new();
        if let Some(mut rs) = self.result.take() {
            if let Err(e) = rs.close().await {
                warn!(error = %e, "closing result set failed");
            }
        }
        if let Some(stmt) = self.statement.as_mut() {
            if let Some(rs) = stmt.more_results().await? {
                self.result = Some(rs);
                return Ok(true);
            }
        }
        if let Some(stmt) = self.statement.take() {
            close_statement_quietly(stmt).await;
        }
        self.execute_next_segment().await
    }

    /// Column layout of the current result set, classified on first use.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ReaderClosed` after close, or the native metadata failure.
    pub fn catalog(&self) -> Result<&ColumnCatalog, Db2Error> {
        self.ensure_open()?;
        if let Some(catalog) = self.catalog.get() {
            return Ok(catalog);
        }
        let metadata = match self.result.as_ref() {
            Some(rs) => rs.metadata()?,
            None => Vec::new(),
        };
        Ok(self.catalog.get_or_init(|| ColumnCatalog::from_metadata(metadata)))
    }

    /// # Errors
    ///
    /// See [`catalog`](DataReader::catalog).
    pub fn field_count(&self) -> Result<usize, Db2Error> {
        Ok(self.catalog()?.len())
    }

    /// # Errors
    ///
    /// Returns `Db2Error::OrdinalOutOfRange` for an unknown ordinal.
    pub fn get_name(&self, ordinal: usize) -> Result<&str, Db2Error> {
        Ok(&self.catalog()?.column(ordinal)?.name)
    }

    /// Ordinal for a column label. Duplicated labels resolve to successive occurrences.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ColumnNotFound` when no column carries the label.
    pub fn get_ordinal(&self, name: &str) -> Result<usize, Db2Error> {
        self.catalog()?.ordinal(name)
    }

    /// # Errors
    ///
    /// Returns `Db2Error::OrdinalOutOfRange` for an unknown ordinal.
    pub fn get_kind(&self, ordinal: usize) -> Result<ColumnKind, Db2Error> {
        Ok(self.catalog()?.column(ordinal)?.kind)
    }

    /// Value of column `ordinal` in the current row.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::NoCurrentRow` before the first successful [`read`](DataReader::read)
    /// or after the last one, `Db2Error::OrdinalOutOfRange`, or a conversion/native failure.
    pub async fn get_value(&mut self, ordinal: usize) -> Result<Value, Db2Error> {
        let kind = self.get_kind(ordinal)?;
        if !self.has_row {
            return Err(Db2Error::NoCurrentRow);
        }
        let rs = self.result.as_mut().ok_or(Db2Error::NoCurrentRow)?;
        read_value(rs.as_mut(), ordinal, kind).await
    }

    /// # Errors
    ///
    /// See [`get_ordinal`](DataReader::get_ordinal) and [`get_value`](DataReader::get_value).
    pub async fn get_value_by_name(&mut self, name: &str) -> Result<Value, Db2Error> {
        let ordinal = self.get_ordinal(name)?;
        self.get_value(ordinal).await
    }

    /// # Errors
    ///
    /// See [`get_value`](DataReader::get_value).
    pub async fn is_db_null(&mut self, ordinal: usize) -> Result<bool, Db2Error> {
        Ok(self.get_value(ordinal).await?.is_null())
    }

    async fn non_null(&mut self, ordinal: usize) -> Result<Value, Db2Error> {
        match self.get_value(ordinal).await? {
            Value::Null => Err(Db2Error::NullValue { ordinal }),
            value => Ok(value),
        }
    }

    pub async fn get_string(&mut self, ordinal: usize) -> Result<String, Db2Error> {
        let value = self.non_null(ordinal).await?;
        match value {
            Value::Text(text) | Value::Clob(text) => Ok(text),
            Value::Xml(doc) | Value::XmlElement(doc) => Ok(doc.outer_xml()),
            other => Err(mismatch(ordinal, "string", &other)),
        }
    }

    pub async fn get_int16(&mut self, ordinal: usize) -> Result<i16, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_i16().ok_or_else(|| mismatch(ordinal, "SMALLINT", &value))
    }

    pub async fn get_int32(&mut self, ordinal: usize) -> Result<i32, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_i32().ok_or_else(|| mismatch(ordinal, "INTEGER", &value))
    }

    pub async fn get_int64(&mut self, ordinal: usize) -> Result<i64, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_i64().ok_or_else(|| mismatch(ordinal, "BIGINT", &value))
    }

    pub async fn get_decimal(&mut self, ordinal: usize) -> Result<Decimal, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_decimal().ok_or_else(|| mismatch(ordinal, "DECIMAL", &value))
    }

    pub async fn get_float(&mut self, ordinal: usize) -> Result<f32, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_f32().ok_or_else(|| mismatch(ordinal, "REAL", &value))
    }

    pub async fn get_double(&mut self, ordinal: usize) -> Result<f64, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_f64().ok_or_else(|| mismatch(ordinal, "DOUBLE", &value))
    }

    /// DATE and TIMESTAMP columns both read as a timestamp.
    pub async fn get_date_time(&mut self, ordinal: usize) -> Result<NaiveDateTime, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_timestamp().ok_or_else(|| mismatch(ordinal, "TIMESTAMP", &value))
    }

    pub async fn get_time(&mut self, ordinal: usize) -> Result<NaiveTime, Db2Error> {
        let value = self.non_null(ordinal).await?;
        value.as_time().ok_or_else(|| mismatch(ordinal, "TIME", &value))
    }

    pub async fn get_bytes(&mut self, ordinal: usize) -> Result<Vec<u8>, Db2Error> {
        match self.non_null(ordinal).await? {
            Value::Bytes(bytes) | Value::Blob(bytes) => Ok(bytes),
            other => Err(mismatch(ordinal, "BLOB", &other)),
        }
    }

    pub async fn get_xml(&mut self, ordinal: usize) -> Result<XmlDocument, Db2Error> {
        match self.non_null(ordinal).await? {
            Value::Xml(doc) | Value::XmlElement(doc) => Ok(doc),
            other => Err(mismatch(ordinal, "XML", &other)),
        }
    }

    /// Read the remaining rows of the current result set.
    ///
    /// # Errors
    ///
    /// Returns the first conversion or native failure.
    pub async fn collect_rows(&mut self) -> Result<ResultSet, Db2Error> {
        let column_names = Arc::new(self.catalog()?.names());
        let width = column_names.len();
        let mut result_set = ResultSet::with_capacity(16);
        result_set.set_column_names(column_names);
        while self.read().await? {
            let mut values = Vec::with_capacity(width);
            for ordinal in 0..width {
                values.push(self.get_value(ordinal).await?);
            }
            result_set.add_row_values(values);
        }
        Ok(result_set)
    }

    /// # Errors
    ///
    /// Always `Db2Error::Unimplemented`.
    pub fn get_schema_table(&self) -> Result<ResultSet, Db2Error> {
        Err(Db2Error::Unimplemented("reader schema table".to_string()))
    }

    /// Release the result set, the statement and any batch statements not yet run.
    /// Failures are logged; closing twice is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.has_row = false;
        if let Some(mut rs) = self.result.take() {
            if let Err(e) = rs.close().await {
                warn!(error = %e, "closing result set failed");
            }
        }
        if let Some(stmt) = self.statement.take() {
            close_statement_quietly(stmt).await;
        }
        if !self.pending.is_empty() {
            debug!(skipped = self.pending.len(), "reader closed before all batch segments ran");
            self.pending.clear();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for DataReader<'_> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("data reader dropped without close");
        }
    }
}

fn mismatch(ordinal: usize, expected: &str, value: &Value) -> Db2Error {
    Db2Error::ConversionError(format!("column {ordinal} holds {value:?}, not {expected}"))
}
