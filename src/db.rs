use std::borrow::Borrow;

use rusqlite::Connection;
use tracing::debug;

use crate::config::DbConfig;
use crate::connector::{Connector, SqliteConnector};
use crate::error::{Error, Result};
use crate::loader::{FileSystemLoader, SqlLoader};
use crate::sqlite::{self, Params, Row};
use crate::transaction::{ConnectionScope, TransactionBehavior, TransactionScope};

/// Runs named SQL files against connections produced by `C`.
///
/// Every call that is not given a [`ConnectionScope::Joined`] connection opens
/// its own connection and transaction, commits on success, rolls back on
/// failure and closes the connection before returning. Scripts are the
/// exception: they run in autocommit mode (see [`Db::execute_script`]).
#[derive(Debug, Clone)]
pub struct Db<C = SqliteConnector, L = FileSystemLoader> {
    connector: C,
    loader: L,
    behavior: TransactionBehavior,
}

impl Db {
    pub fn from_config(config: &DbConfig) -> Self {
        Db::new(config.connector(), config.loader()).with_behavior(config.transaction_behavior)
    }
}

impl<C: Connector, L: SqlLoader> Db<C, L> {
    pub fn new(connector: C, loader: L) -> Self {
        Self {
            connector,
            loader,
            behavior: TransactionBehavior::default(),
        }
    }

    pub fn with_behavior(mut self, behavior: TransactionBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Open a connection with a fresh transaction. Pass
    /// [`TransactionScope::join`] to the other operations to run them inside it.
    pub fn start_transaction(&self) -> Result<TransactionScope> {
        TransactionScope::begin(self.connector.connect()?, self.behavior)
    }

    /// Run every statement in the named script on a fresh connection.
    ///
    /// The script starts in autocommit mode, so it may carry its own
    /// `BEGIN`/`COMMIT`, `VACUUM` or `PRAGMA journal_mode`. A transaction the
    /// script leaves open is committed on success and rolled back on failure.
    pub fn execute_script(&self, name: &str) -> Result<()> {
        let sql = self.loader.load(name)?;
        debug!("executing script {}", name);
        TransactionScope::attach(self.connector.connect()?)
            .run(|conn| conn.execute_batch(&sql).map_err(Error::from))
    }

    /// Run the named statement once per parameter set and return the total
    /// number of changed rows. An empty batch executes nothing.
    pub fn execute_many<I>(
        &self,
        name: &str,
        param_sets: I,
        scope: ConnectionScope<'_>,
    ) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Borrow<Params>,
    {
        let sql = self.loader.load(name)?;
        debug!("executing batch {}", name);
        self.within(scope, |conn| Ok(sqlite::execute_each(conn, &sql, param_sets)?))
    }

    /// Run the named query and collect all of its rows.
    pub fn execute_query(
        &self,
        name: &str,
        params: Option<&Params>,
        scope: ConnectionScope<'_>,
    ) -> Result<Vec<Row>> {
        let sql = self.loader.load(name)?;
        debug!("executing query {}", name);
        let empty = Params::new();
        let params = params.unwrap_or(&empty);
        self.within(scope, |conn| Ok(sqlite::query_rows(conn, &sql, params)?))
    }

    fn within<T, F>(&self, scope: ConnectionScope<'_>, body: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        match scope {
            ConnectionScope::Joined(conn) => body(conn),
            ConnectionScope::Private => self.start_transaction()?.run(body),
        }
    }
}
