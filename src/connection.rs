use tracing::{debug, warn};

use crate::command::Command;
use crate::config::{Db2Options, Transport};
use crate::error::Db2Error;
use crate::native::{NativeConnection, NativeDriver};
use crate::transaction::{IsolationLevel, Transaction};

/// An open DB2 connection over a native driver.
///
/// ```rust,no_run
/// use db2_middleware::prelude::*;
///
/// # async fn demo(native: Box<dyn NativeConnection>) -> Result<(), Db2Error> {
/// let options = Db2Options::parse("Database=SAMPLE;DB2NETNamedParam=1;Transport=jdbc")?;
/// let mut conn = Connection::new(native, options);
/// let mut cmd = conn.create_command();
/// cmd.set_command_text("UPDATE T SET A = :A WHERE ID = :ID");
/// cmd.parameters_mut().add_with_value(":A", "x")?;
/// cmd.parameters_mut().add_with_value(":ID", 1_i32)?;
/// let updated = cmd.execute_non_query().await?;
/// # let _ = updated;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    native: Box<dyn NativeConnection>,
    options: Db2Options,
    open: bool,
    abandoned_transaction: bool,
}

impl Connection {
    /// Wrap an already opened native connection.
    #[must_use]
    pub fn new(native: Box<dyn NativeConnection>, options: Db2Options) -> Self {
        Self {
            native,
            options,
            open: true,
            abandoned_transaction: false,
        }
    }

    /// Connect through `driver` using the options' connection string.
    ///
    /// # Errors
    ///
    /// Returns the native failure when the driver cannot connect.
    pub async fn open(driver: &dyn NativeDriver, options: Db2Options) -> Result<Self, Db2Error> {
        debug!(transport = ?options.transport, "opening connection");
        let native = driver.connect(&options.connection_string).await?;
        Ok(Self::new(native, options))
    }

    #[must_use]
    pub fn options(&self) -> &Db2Options {
        &self.options
    }

    #[must_use]
    pub fn transport(&self) -> Transport {
        self.options.transport
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn create_command(&mut self) -> Command<'_> {
        Command::new(self)
    }

    /// Begin a transaction at the default isolation level (read committed).
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::ConnectionClosed` or the native failure.
    pub async fn begin_transaction(&mut self) -> Result<Transaction<'_>, Db2Error> {
        self.begin_transaction_with(IsolationLevel::default()).await
    }

    /// # Errors
    ///
    /// Returns `Db2Error::UnsupportedIsolationLevel` for snapshot isolation,
    /// `Db2Error::ConnectionClosed`, or the native failure.
    pub async fn begin_transaction_with(
        &mut self,
        level: IsolationLevel,
    ) -> Result<Transaction<'_>, Db2Error> {
        Transaction::begin(self, level).await
    }

    /// Close the native connection. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the native failure; the connection counts as closed either way.
    pub async fn close(&mut self) -> Result<(), Db2Error> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        debug!("closing connection");
        self.native.close().await?;
        Ok(())
    }

    pub(crate) fn mark_abandoned_transaction(&mut self) {
        self.abandoned_transaction = true;
    }

    /// Native handle for the next call, rolling back a transaction that was dropped while open.
    pub(crate) async fn native(&mut self) -> Result<&mut dyn NativeConnection, Db2Error> {
        if !self.open {
            return Err(Db2Error::ConnectionClosed);
        }
        if std::mem::take(&mut self.abandoned_transaction) {
            warn!("rolling back a transaction dropped without commit or rollback");
            if let Err(e) = self.native.rollback().await {
                warn!(error = %e, "rollback of abandoned transaction failed");
            }
            if let Err(e) = self.native.set_auto_commit(true).await {
                warn!(error = %e, "restoring auto-commit failed");
            }
        }
        Ok(self.native.as_mut())
    }
}
