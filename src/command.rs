use tracing::{debug, trace, warn};

use crate::batch::{BatchSegment, split_batch};
use crate::config::Transport;
use crate::connection::Connection;
use crate::error::Db2Error;
use crate::marshal::prepare_bind;
use crate::native::{BindTarget, NativeStatement};
use crate::parameters::{Parameter, ParameterCollection};
use crate::reader::DataReader;
use crate::results::ResultSet;
use crate::translation::{RewriteMode, collapse_xml_pairs, rewrite_parameters};
use crate::types::Value;

/// SQL text plus parameters, executed on a borrowed connection.
pub struct Command<'c> {
    conn: &'c mut Connection,
    source_text: String,
    command_text: String,
    rewrite: RewriteMode,
    parameters: ParameterCollection,
    timeout_secs: u32,
}

impl<'c> Command<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Self {
        let timeout_secs = conn.options().command_timeout_secs;
        Self {
            conn,
            source_text: String::new(),
            command_text: String::new(),
            rewrite: RewriteMode::default(),
            parameters: ParameterCollection::new(),
            timeout_secs,
        }
    }

    /// Set the SQL text, rewriting it for the connection's transport.
    ///
    /// On ODBC, `:name`/`@name` markers become `?`. On JDBC, XML positional pairs
    /// collapse to a single marker and the text otherwise stays as written.
    pub fn set_command_text(&mut self, sql: impl Into<String>) {
        self.source_text = sql.into();
        self.command_text = self.rewritten(&self.source_text);
        debug!(sql = %self.command_text, "command text set");
    }

    fn rewritten(&self, sql: &str) -> String {
        let transport = self.conn.transport();
        let collapsed = match transport {
            Transport::Jdbc => collapse_xml_pairs(sql),
            Transport::Odbc => std::borrow::Cow::Borrowed(sql),
        };
        let rewrite = self.rewrite.resolve(transport.rewrites_by_default());
        rewrite_parameters(&collapsed, rewrite).into_owned()
    }

    /// Text sent to the driver.
    #[must_use]
    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    /// Text as the caller supplied it.
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Override rewriting for this command; the current text is rewritten again.
    pub fn set_rewrite_mode(&mut self, mode: RewriteMode) {
        self.rewrite = mode;
        self.command_text = self.rewritten(&self.source_text);
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterCollection {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterCollection {
        &mut self.parameters
    }

    #[must_use]
    pub fn command_timeout(&self) -> u32 {
        self.timeout_secs
    }

    pub fn set_command_timeout(&mut self, seconds: u32) {
        self.timeout_secs = seconds;
    }

    fn segments(&self) -> Result<Vec<BatchSegment>, Db2Error> {
        match self.conn.transport() {
            Transport::Jdbc => split_batch(&self.command_text, self.parameters.as_slice()),
            Transport::Odbc => Ok(vec![BatchSegment {
                source: self.source_text.clone(),
                text: self.command_text.clone(),
                parameters: self.parameters.iter().map(Parameter::duplicate).collect(),
            }]),
        }
    }

    /// Run the command for its row count, statement by statement on JDBC batches.
    ///
    /// # Errors
    ///
    /// Returns the first conversion or native failure.
    pub async fn execute_non_query(&mut self) -> Result<u64, Db2Error> {
        let mut total = 0;
        for segment in self.segments()? {
            let mut stmt = prepare_statement(&mut *self.conn, &segment, self.timeout_secs).await?;
            let affected = stmt.execute_update().await;
            close_statement_quietly(stmt).await;
            total += affected?;
        }
        Ok(total)
    }

    /// First column of the first row, or `Value::Null` when there is none.
    ///
    /// # Errors
    ///
    /// Returns the first conversion or native failure.
    pub async fn execute_scalar(&mut self) -> Result<Value, Db2Error> {
        let mut reader = self.execute_reader().await?;
        let value = first_value(&mut reader).await;
        reader.close().await;
        value
    }

    /// # Errors
    ///
    /// Returns the first conversion or native failure while preparing or executing the
    /// first statement.
    pub async fn execute_reader(&mut self) -> Result<DataReader<'_>, Db2Error> {
        let segments = self.segments()?;
        DataReader::open(&mut *self.conn, segments, self.timeout_secs).await
    }

    /// Materialize the rows of the first result set.
    ///
    /// # Errors
    ///
    /// Returns the first conversion or native failure.
    pub async fn query(&mut self) -> Result<ResultSet, Db2Error> {
        let mut reader = self.execute_reader().await?;
        let rows = reader.collect_rows().await;
        reader.close().await;
        rows
    }

    /// # Errors
    ///
    /// Always `Db2Error::Unimplemented`; statements are prepared on execution.
    pub fn prepare(&self) -> Result<(), Db2Error> {
        Err(Db2Error::Unimplemented("explicit command preparation".to_string()))
    }

    /// # Errors
    ///
    /// Always `Db2Error::Unimplemented`.
    pub fn cancel(&self) -> Result<(), Db2Error> {
        Err(Db2Error::Unimplemented("command cancellation".to_string()))
    }
}

async fn first_value(reader: &mut DataReader<'_>) -> Result<Value, Db2Error> {
    if reader.read().await? && reader.field_count()? > 0 {
        reader.get_value(0).await
    } else {
        Ok(Value::Null)
    }
}

/// Prepare one statement and bind its parameters.
pub(crate) async fn prepare_statement(
    conn: &mut Connection,
    segment: &BatchSegment,
    timeout_secs: u32,
) -> Result<Box<dyn NativeStatement>, Db2Error> {
    let transport = conn.transport();
    let named = transport == Transport::Jdbc && conn.options().named_parameters;
    let native = conn.native().await?;
    debug!(sql = %segment.text, parameters = segment.parameters.len(), "preparing statement");
    let mut stmt = native.prepare(&segment.text).await?;
    let bound = stmt
        .set_query_timeout(timeout_secs)
        .map_err(Db2Error::from)
        .and_then(|()| bind_parameters(stmt.as_mut(), &segment.parameters, transport, named));
    if let Err(e) = bound {
        close_statement_quietly(stmt).await;
        return Err(e);
    }
    Ok(stmt)
}

fn bind_parameters(
    stmt: &mut dyn NativeStatement,
    params: &[Parameter],
    transport: Transport,
    named: bool,
) -> Result<(), Db2Error> {
    let mut position = 0;
    for param in params {
        let Some(bind) = prepare_bind(param, transport)? else {
            continue;
        };
        position += 1;
        let target = if named {
            BindTarget::Named(bind.name)
        } else {
            BindTarget::Position(position)
        };
        trace!(%target, "binding parameter");
        stmt.bind(&target, bind.param)?;
    }
    Ok(())
}

pub(crate) async fn close_statement_quietly(mut stmt: Box<dyn NativeStatement>) {
    if let Err(e) = stmt.close().await {
        warn!(error = %e, "closing statement failed");
    }
}
