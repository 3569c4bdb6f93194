//! Database handle abstraction: one trait over the sqlx drivers, plus scoped transactions.

mod manager;
mod postgres;
mod record;
mod sqlite;

pub use manager::ConnectionManager;
pub use record::{Fields, Record};

use crate::config::{DatabaseSettings, Driver};
use crate::error::DbError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// SQL flavor of a connection. Only affects parameter casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// An open database handle. Every statement is parameterized: `sql` carries `$1..$n`
/// placeholders and `params` the values.
#[async_trait]
pub trait Connection: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DbError>;

    /// Rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError>;

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Record>, DbError> {
        Ok(self.fetch_all(sql, params).await?.into_iter().next())
    }

    /// Start a unit of work. Fails on a handle that is itself a transaction.
    async fn begin(&self) -> Result<UnitOfWork, DbError>;

    async fn close(&self) {}
}

/// The transaction side of a unit of work.
#[async_trait]
pub(crate) trait TransactionHandle: Send + Sync {
    async fn commit(&self) -> Result<(), DbError>;
    async fn rollback(&self) -> Result<(), DbError>;
}

/// A scoped transaction. Data-access objects built on [`UnitOfWork::connection`] run inside it.
/// Dropping it without `commit` rolls back.
pub struct UnitOfWork {
    conn: Arc<dyn Connection>,
    handle: Arc<dyn TransactionHandle>,
}

impl UnitOfWork {
    pub(crate) fn new(conn: Arc<dyn Connection>, handle: Arc<dyn TransactionHandle>) -> Self {
        UnitOfWork { conn, handle }
    }

    pub fn connection(&self) -> Arc<dyn Connection> {
        Arc::clone(&self.conn)
    }

    pub async fn commit(self) -> Result<(), DbError> {
        self.handle.commit().await
    }

    pub async fn rollback(self) -> Result<(), DbError> {
        self.handle.rollback().await
    }
}

/// Run `work` in a unit of work: commit on `Ok`, roll back on `Err`.
pub async fn transaction<T, E, F, Fut>(conn: &dyn Connection, work: F) -> Result<T, E>
where
    F: FnOnce(Arc<dyn Connection>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DbError>,
{
    let uow = conn.begin().await?;
    match work(uow.connection()).await {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = uow.rollback().await {
                tracing::error!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Open a pool for the configured driver.
pub async fn connect(settings: &DatabaseSettings) -> Result<Arc<dyn Connection>, sqlx::Error> {
    match settings.driver {
        Driver::Postgres => Ok(Arc::new(postgres::PgDatabase::connect(settings).await?)),
        Driver::Sqlite => Ok(Arc::new(sqlite::SqliteDatabase::connect(settings).await?)),
    }
}
