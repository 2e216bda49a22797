//! File-backed SQL execution helpers for SQLite.
//!
//! # Intention
//!
//! - Keep SQL in plain files next to the application and run it by name.
//! - Wrap every unit of work in a transaction that commits on success and
//!   rolls back on failure, closing the connection on every path.
//!
//! # Architectural Boundaries
//!
//! - Only statement loading, connection setup and transactional execution
//!   belong here.
//! - No pooling, migrations, retries or SQL parsing.

pub mod config;
pub mod connector;
pub mod db;
pub mod error;
pub mod loader;
pub mod mapper;
pub mod sqlite;
pub mod transaction;

pub use config::DbConfig;
pub use connector::{Connector, SqliteConnector};
pub use db::Db;
pub use error::{Error, Result};
pub use loader::{FileSystemLoader, SqlLoader};
pub use mapper::{project, ColumnAccess, FieldMapping};
pub use sqlite::{Params, Row, Value};
pub use transaction::{ConnectionScope, TransactionBehavior, TransactionScope};
