//! Untyped CRUD over one table. Every statement is built by `crate::sql` and bound as parameters.

use crate::db::{Connection, Fields, Record};
use crate::error::DbError;
use crate::model::TableSpec;
use crate::sql;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct Table {
    conn: Arc<dyn Connection>,
    spec: TableSpec,
}

impl Table {
    pub fn new(conn: Arc<dyn Connection>, spec: TableSpec) -> Self {
        Table { conn, spec }
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    /// Run an arbitrary parameterized statement on this table's connection.
    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, DbError> {
        self.conn.fetch_all(sql, params).await
    }

    pub async fn all(&self) -> Result<Vec<Record>, DbError> {
        let q = sql::select_all(&self.spec, self.conn.dialect());
        self.conn.fetch_all(&q.sql, &q.params).await
    }

    /// `None` when no live row has this key.
    pub async fn find(&self, id: &Value) -> Result<Option<Record>, DbError> {
        let q = sql::select_by_id(&self.spec, self.conn.dialect(), id);
        self.conn.fetch_optional(&q.sql, &q.params).await
    }

    pub async fn where_eq(&self, column: &str, value: &Value) -> Result<Vec<Record>, DbError> {
        let q = sql::select_where(&self.spec, self.conn.dialect(), column, value)?;
        self.conn.fetch_all(&q.sql, &q.params).await
    }

    pub async fn first_where(&self, column: &str, value: &Value) -> Result<Option<Record>, DbError> {
        let q = sql::select_where(&self.spec, self.conn.dialect(), column, value)?;
        self.conn.fetch_optional(&q.sql, &q.params).await
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let q = sql::count(&self.spec, self.conn.dialect());
        let row = self.conn.fetch_optional(&q.sql, &q.params).await?;
        Ok(row.and_then(|r| r.i64("count")).unwrap_or(0))
    }

    /// Insert exactly `fields` and return the generated key. An empty map fails before any
    /// statement is sent; a null, zero or empty key counts as failure.
    pub async fn create(&self, fields: &Fields) -> Result<Value, DbError> {
        let q = sql::insert(&self.spec, self.conn.dialect(), fields)?;
        let row = self.conn.fetch_optional(&q.sql, &q.params).await?;
        let id = row
            .and_then(|r| r.get(self.spec.primary_key).cloned())
            .unwrap_or(Value::Null);
        if is_missing_id(&id) {
            tracing::error!(table = %self.spec.table, "insert returned no identifier");
            return Err(DbError::Query(format!("insert into {} returned no identifier", self.spec.table)));
        }
        Ok(id)
    }

    /// True only if a row actually changed. A missing row and a no-op update both give false.
    pub async fn update(&self, id: &Value, fields: &Fields) -> Result<bool, DbError> {
        let q = sql::update(&self.spec, self.conn.dialect(), id, fields)?;
        Ok(self.conn.execute(&q.sql, &q.params).await? > 0)
    }

    /// True iff a row was removed (or marked deleted).
    pub async fn delete(&self, id: &Value) -> Result<bool, DbError> {
        let q = sql::delete(&self.spec, self.conn.dialect(), id);
        Ok(self.conn.execute(&q.sql, &q.params).await? > 0)
    }
}

fn is_missing_id(id: &Value) -> bool {
    match id {
        Value::Null => true,
        Value::Number(n) => n.as_i64() == Some(0),
        Value::String(s) => s.is_empty() || s == "0",
        _ => false,
    }
}
