//! SQLite handle for local runs and tests. Same contract as the PostgreSQL one.

use crate::config::DatabaseSettings;
use crate::db::{Connection, Dialect, Record, TransactionHandle, UnitOfWork};
use crate::error::DbError;
use crate::sql::BindValue;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

const MEMORY: &str = ":memory:";

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let in_memory = settings.database == MEMORY;
        let options = if in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(&settings.database)
                .create_if_missing(true)
        };
        let options = options.foreign_keys(true);

        let pool = SqlitePoolOptions::new().acquire_timeout(settings.connect_timeout);
        // every pooled connection to :memory: would be a separate empty database
        let pool = if in_memory {
            pool.max_connections(1).min_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            pool.max_connections(settings.max_connections)
        };
        Ok(SqliteDatabase {
            pool: pool.connect_with(options).await?,
        })
    }
}

#[async_trait]
impl Connection for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DbError> {
        fetch_with(&self.pool, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        execute_with(&self.pool, sql, params).await
    }

    async fn begin(&self) -> Result<UnitOfWork, DbError> {
        let tx = self.pool.begin().await.map_err(|e| failed("BEGIN", e))?;
        let tx = Arc::new(SqliteTransaction { tx: Mutex::new(Some(tx)) });
        Ok(UnitOfWork::new(tx.clone(), tx))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct SqliteTransaction {
    tx: Mutex<Option<sqlx::Transaction<'static, Sqlite>>>,
}

#[async_trait]
impl Connection for SqliteTransaction {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DbError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        fetch_with(&mut **tx, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(finished)?;
        execute_with(&mut **tx, sql, params).await
    }

    async fn begin(&self) -> Result<UnitOfWork, DbError> {
        Err(DbError::Query("nested unit of work is not supported".into()))
    }
}

#[async_trait]
impl TransactionHandle for SqliteTransaction {
    async fn commit(&self) -> Result<(), DbError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.commit().await.map_err(|e| failed("COMMIT", e))
    }

    async fn rollback(&self) -> Result<(), DbError> {
        let tx = self.tx.lock().await.take().ok_or_else(finished)?;
        tx.rollback().await.map_err(|e| failed("ROLLBACK", e))
    }
}

fn finished() -> DbError {
    DbError::Query("unit of work already finished".into())
}

fn failed(sql: &str, e: sqlx::Error) -> DbError {
    tracing::error!(sql = %sql, error = %e, "statement failed");
    DbError::from(e)
}

fn bind<'q>(sql: &'q str, params: &[Value]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = query.bind(BindValue::from_json(p));
    }
    query
}

async fn fetch_with<'e, E>(executor: E, sql: &'e str, params: &[Value]) -> Result<Vec<Record>, DbError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    tracing::debug!(sql = %sql, params = ?params, "query");
    let rows = bind(sql, params).fetch_all(executor).await.map_err(|e| failed(sql, e))?;
    Ok(rows.iter().map(row_to_record).collect())
}

async fn execute_with<'e, E>(executor: E, sql: &'e str, params: &[Value]) -> Result<u64, DbError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    tracing::debug!(sql = %sql, params = ?params, "execute");
    let done = bind(sql, params).execute(executor).await.map_err(|e| failed(sql, e))?;
    Ok(done.rows_affected())
}

fn row_to_record(row: &SqliteRow) -> Record {
    row.columns()
        .iter()
        .map(|col| {
            let boolean = col.type_info().name() == "BOOLEAN";
            (col.name().to_string(), cell_to_value(row, col.ordinal(), boolean))
        })
        .collect()
}

/// Decode by the value's storage class; declared BOOLEAN columns come back as booleans.
fn cell_to_value(row: &SqliteRow, idx: usize, boolean: bool) -> Value {
    let storage = match row.try_get_raw(idx) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_string(),
        _ => return Value::Null,
    };
    let v = match storage.as_str() {
        "INTEGER" if boolean => row.try_get_unchecked::<i64, _>(idx).ok().map(|n| Value::Bool(n != 0)),
        "INTEGER" => row.try_get_unchecked::<i64, _>(idx).ok().map(Value::from),
        "REAL" => row.try_get_unchecked::<f64, _>(idx).ok().map(Value::from),
        "TEXT" => row.try_get_unchecked::<String, _>(idx).ok().map(Value::String),
        _ => None,
    };
    v.unwrap_or(Value::Null)
}
