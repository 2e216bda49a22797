use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Locking mode used when a scope opens its transaction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionBehavior {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl TransactionBehavior {
    fn begin_sql(self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Whether a facade call joins a caller's transaction or owns a private one.
#[derive(Debug, Clone, Copy)]
pub enum ConnectionScope<'c> {
    /// Open a connection and transaction for this call only.
    Private,
    /// Run on the caller's connection; the caller decides commit or rollback.
    Joined(&'c Connection),
}

impl<'c> From<&'c TransactionScope> for ConnectionScope<'c> {
    fn from(scope: &'c TransactionScope) -> Self {
        ConnectionScope::Joined(scope.connection())
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Commit,
    Rollback,
}

/// A connection owned for the length of one unit of work, normally with an
/// open transaction (see [`begin`](Self::begin) and [`attach`](Self::attach)).
///
/// The scope ends exactly once: through [`commit`](Self::commit),
/// [`rollback`](Self::rollback), [`run`](Self::run), or by being dropped,
/// which rolls back. The connection is closed on every one of those paths.
#[derive(Debug)]
pub struct TransactionScope {
    conn: Option<Connection>,
}

impl TransactionScope {
    /// Take ownership of `conn` and open a transaction on it.
    pub fn begin(conn: Connection, behavior: TransactionBehavior) -> Result<Self> {
        debug!("{}", behavior.begin_sql());
        conn.execute_batch(behavior.begin_sql())?;
        Ok(Self { conn: Some(conn) })
    }

    /// Take ownership of `conn` without opening a transaction.
    ///
    /// Statements run in autocommit mode until one of them issues `BEGIN`;
    /// whatever transaction is still open when the scope ends is committed
    /// or rolled back like any other.
    pub fn attach(conn: Connection) -> Self {
        Self { conn: Some(conn) }
    }

    pub fn connection(&self) -> &Connection {
        self.conn
            .as_ref()
            .expect("connection is held until the scope ends")
    }

    /// Join this transaction from a facade call.
    pub fn join(&self) -> ConnectionScope<'_> {
        ConnectionScope::from(self)
    }

    pub fn commit(mut self) -> Result<()> {
        self.finish(Outcome::Commit)
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finish(Outcome::Rollback)
    }

    /// Run `body` on the scoped connection, committing if it returns `Ok`
    /// and rolling back if it returns `Err`.
    ///
    /// The body's error is returned unchanged; a failed rollback is only
    /// logged. A failed commit is returned in place of the body's value.
    pub fn run<T, E, F>(self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        match body(self.connection()) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    warn!("rollback after failed transaction body also failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        let ended = end_transaction(&conn, outcome);
        let closed = close(conn);
        if let (Err(_), Err(close_err)) = (&ended, &closed) {
            warn!("closing connection failed after {:?} error: {}", outcome, close_err);
        }
        ended.and(closed)
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if self.conn.is_some() {
            if let Err(e) = self.finish(Outcome::Rollback) {
                warn!("rollback of abandoned transaction failed: {}", e);
            }
        }
    }
}

fn end_transaction(conn: &Connection, outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Commit if conn.is_autocommit() => {
            debug!("no open transaction to commit");
        }
        Outcome::Commit => {
            debug!("COMMIT");
            if let Err(e) = conn.execute_batch("COMMIT") {
                // A rejected COMMIT (e.g. deferred foreign keys) leaves the transaction open.
                if !conn.is_autocommit() {
                    if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                        warn!("rollback after failed commit also failed: {}", rollback_err);
                    }
                }
                return Err(e.into());
            }
        }
        // SQLite aborts the transaction itself on some errors (e.g. SQLITE_FULL).
        Outcome::Rollback if conn.is_autocommit() => {
            debug!("transaction already rolled back by the engine");
        }
        Outcome::Rollback => {
            debug!("ROLLBACK");
            conn.execute_batch("ROLLBACK")?;
        }
    }
    Ok(())
}

fn close(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, e)| Error::Statement(e))
}
