//! PostgreSQL handle: a sqlx pool and its transactions.

use crate::config::DatabaseSettings;
use crate::db::{Connection, Dialect, Record, TransactionHandle, UnitOfWork};
use crate::error::DbError;
use crate::sql::BindValue;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgColumn, PgConnectOptions, PgPool, PgPoolOptions, PgRow, PgTypeKind, Postgres};
use sqlx::query::Query;
use sqlx::types::Decimal;
use sqlx::{Column, Row, TypeInfo};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, sqlx::Error> {
        let mut options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .options([("client_encoding", settings.charset.as_str())]);
        if let Some(user) = &settings.username {
            options = options.username(user);
        }
        if let Some(password) = &settings.password {
            options = options.password(password);
        }
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.connect_timeout)
            .connect_with(options)
            .await?;
        Ok(PgDatabase { pool })
    }
}

#[async_trait]
impl Connection for PgDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DbError> {
        fetch_with(&self.pool, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        execute_with(&self.pool, sql, params).await
    }

    async fn begin(&self) -> Result<UnitOfWork, DbError> {
        let tx = self.pool.begin().await.map_err(|e| failed("BEGIN", e))?;
        let tx = Arc::new(PgTransaction { tx: Mutex::new(Some(tx)) });
        Ok(UnitOfWork::new(tx.clone(), tx))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct PgTransaction {
    tx: Mutex<Option<sqlx::Transaction<'static, Postgres>>>,
}

#[async_trait]
impl Connection for PgTransaction {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
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
impl TransactionHandle for PgTransaction {
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

fn bind<'q>(sql: &'q str, params: &[Value]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = query.bind(BindValue::from_json(p));
    }
    query
}

async fn fetch_with<'e, E>(executor: E, sql: &'e str, params: &[Value]) -> Result<Vec<Record>, DbError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    tracing::debug!(sql = %sql, params = ?params, "query");
    let rows = bind(sql, params).fetch_all(executor).await.map_err(|e| failed(sql, e))?;
    Ok(rows.iter().map(row_to_record).collect())
}

async fn execute_with<'e, E>(executor: E, sql: &'e str, params: &[Value]) -> Result<u64, DbError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    tracing::debug!(sql = %sql, params = ?params, "execute");
    let done = bind(sql, params).execute(executor).await.map_err(|e| failed(sql, e))?;
    Ok(done.rows_affected())
}

fn row_to_record(row: &PgRow) -> Record {
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_to_value(row, col)))
        .collect()
}

fn opt<T>(row: &PgRow, col: &PgColumn) -> Option<T>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    match row.try_get::<Option<T>, _>(col.ordinal()) {
        Ok(v) => v,
        Err(e) => {
            undecodable(col, &e);
            None
        }
    }
}

fn undecodable(col: &PgColumn, e: &sqlx::Error) {
    tracing::warn!(
        column = %col.name(),
        column_type = %col.type_info().name(),
        error = %e,
        "column value could not be decoded, read as null"
    );
}

fn cell_to_value(row: &PgRow, col: &PgColumn) -> Value {
    let v = match col.type_info().name() {
        "INT2" => opt::<i16>(row, col).map(Value::from),
        "INT4" => opt::<i32>(row, col).map(Value::from),
        "INT8" => opt::<i64>(row, col).map(Value::from),
        "FLOAT4" => opt::<f32>(row, col).map(Value::from),
        "FLOAT8" => opt::<f64>(row, col).map(Value::from),
        // keeps the column's scale: 12.50 reads back as "12.50"
        "NUMERIC" => opt::<Decimal>(row, col).map(|d| Value::String(d.to_string())),
        "BOOL" => opt::<bool>(row, col).map(Value::Bool),
        "UUID" => opt::<uuid::Uuid>(row, col).map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => opt::<chrono::DateTime<chrono::Utc>>(row, col).map(|d| Value::String(d.to_rfc3339())),
        "TIMESTAMP" => opt::<chrono::NaiveDateTime>(row, col)
            .map(|d| Value::String(d.format("%Y-%m-%d %H:%M:%S").to_string())),
        "DATE" => opt::<chrono::NaiveDate>(row, col).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "TIME" => opt::<chrono::NaiveTime>(row, col).map(|t| Value::String(t.format("%H:%M:%S").to_string())),
        "JSON" | "JSONB" => opt::<Value>(row, col),
        _ if matches!(col.type_info().kind(), PgTypeKind::Enum(_)) => enum_label(row, col),
        _ => opt::<String>(row, col).map(Value::String),
    };
    v.unwrap_or(Value::Null)
}

/// Enum labels travel as text but fail the `String` type check.
fn enum_label(row: &PgRow, col: &PgColumn) -> Option<Value> {
    match row.try_get_unchecked::<Option<String>, _>(col.ordinal()) {
        Ok(v) => v.map(Value::String),
        Err(e) => {
            undecodable(col, &e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn decimal_text_keeps_scale() {
        let d = Decimal::from_str("12.50").unwrap();
        assert_eq!(Value::String(d.to_string()), Value::String("12.50".into()));
    }
}
