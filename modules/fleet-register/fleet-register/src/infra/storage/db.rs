use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use super::migrations::Migrator;

/// Anything repositories can run statements against: a pooled connection or
/// an open transaction.
pub trait DBRunner: ConnectionTrait + Send + Sync {}

impl<T: ConnectionTrait + Send + Sync> DBRunner for T {}

/// Connection options for [`connect_db`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
}

/// Open a pooled connection for `dsn` (`sqlite:` or `postgres:` URL).
///
/// # Errors
/// Returns `DbErr` if the pool cannot be established.
pub async fn connect_db(dsn: &str, opts: ConnectOpts) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(dsn.to_owned());
    if let Some(max) = opts.max_conns {
        options.max_connections(max);
    }
    if let Some(min) = opts.min_conns {
        options.min_connections(min);
    }
    if let Some(timeout) = opts.acquire_timeout {
        options.acquire_timeout(timeout);
    }
    options.sqlx_logging(false);
    Database::connect(options).await
}

/// Apply every pending migration of the fleet register schema.
///
/// Safe to rerun: applied migrations are skipped.
///
/// # Errors
/// Returns `DbErr` if a migration fails.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(conn, None).await
}

/// Hands out connections and transactions to domain services.
///
/// Services never hold a pooled connection and a transaction at the same
/// time: once a transaction is open, every statement goes through it.
#[derive(Clone)]
pub struct DbProvider {
    conn: DatabaseConnection,
}

impl DbProvider {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Begin a transaction. Dropping it without `commit()` rolls back.
    ///
    /// # Errors
    /// Returns `DbErr` if the transaction cannot be started.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn.begin().await
    }
}
