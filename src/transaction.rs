use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::Command;
use crate::connection::Connection;
use crate::error::Db2Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
pub enum IsolationLevel {
    /// Treated as read committed.
    Unspecified,
    Chaos,
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
    /// Not supported by DB2.
    Snapshot,
}

impl IsolationLevel {
    /// Native isolation code handed to the driver.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::UnsupportedIsolationLevel` for `Snapshot`.
    pub fn native_code(self) -> Result<i32, Db2Error> {
        match self {
            IsolationLevel::Chaos => Ok(0),
            IsolationLevel::ReadUncommitted => Ok(1),
            IsolationLevel::Unspecified | IsolationLevel::ReadCommitted => Ok(2),
            IsolationLevel::RepeatableRead => Ok(4),
            IsolationLevel::Serializable => Ok(8),
            IsolationLevel::Snapshot => Err(Db2Error::UnsupportedIsolationLevel(format!("{self:?}"))),
        }
    }
}

/// A transaction on a borrowed connection.
///
/// Auto-commit is off while the transaction is open and restored by
/// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback). A transaction
/// dropped while open is rolled back before the connection's next native call.
pub struct Transaction<'c> {
    conn: &'c mut Connection,
    isolation: IsolationLevel,
    open: bool,
}

impl<'c> Transaction<'c> {
    pub(crate) async fn begin(conn: &'c mut Connection, level: IsolationLevel) -> Result<Self, Db2Error> {
        let code = level.native_code()?;
        let native = conn.native().await?;
        native.set_transaction_isolation(code).await?;
        native.set_auto_commit(false).await?;
        debug!(?level, "transaction started");
        let isolation = match level {
            IsolationLevel::Unspecified => IsolationLevel::ReadCommitted,
            other => other,
        };
        Ok(Self {
            conn,
            isolation,
            open: true,
        })
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// # Errors
    ///
    /// Returns `Db2Error::TransactionCompleted` after commit or rollback.
    pub fn isolation_level(&self) -> Result<IsolationLevel, Db2Error> {
        if self.open {
            Ok(self.isolation)
        } else {
            Err(Db2Error::TransactionCompleted)
        }
    }

    /// A command that runs inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns `Db2Error::TransactionCompleted` after commit or rollback.
    pub fn command(&mut self) -> Result<Command<'_>, Db2Error> {
        if !self.open {
            return Err(Db2Error::TransactionCompleted);
        }
        Ok(self.conn.create_command())
    }

    /// # Errors
    ///
    /// Returns `Db2Error::TransactionCompleted` if already finished, or the native failure.
    /// The transaction is finished afterwards either way.
    pub async fn commit(&mut self) -> Result<(), Db2Error> {
        self.finish(true).await
    }

    /// # Errors
    ///
    /// Returns `Db2Error::TransactionCompleted` if already finished, or the native failure.
    /// The transaction is finished afterwards either way.
    pub async fn rollback(&mut self) -> Result<(), Db2Error> {
        self.finish(false).await
    }

    async fn finish(&mut self, commit: bool) -> Result<(), Db2Error> {
        if !self.open {
            return Err(Db2Error::TransactionCompleted);
        }
        self.open = false;
        let native = self.conn.native().await?;
        let outcome = if commit {
            native.commit().await
        } else {
            native.rollback().await
        };
        let restored = native.set_auto_commit(true).await;
        debug!(commit, ok = outcome.is_ok(), "transaction finished");
        outcome?;
        restored?;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            self.conn.mark_abandoned_transaction();
        }
    }
}
