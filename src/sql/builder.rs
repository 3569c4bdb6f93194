//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for one table.

use crate::db::{Dialect, Fields};
use crate::error::DbError;
use crate::model::TableSpec;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Quote identifier (safe: only from entity config or checked field names).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"))
}

/// Column names coming from a field map must be plain identifiers.
fn checked_column(name: &str) -> Result<String, DbError> {
    if identifier_re().is_match(name) {
        Ok(quoted(name))
    } else {
        Err(DbError::Query(format!("invalid column name '{}'", name)))
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

struct Builder<'a> {
    spec: &'a TableSpec,
    dialect: Dialect,
    params: Vec<Value>,
}

impl<'a> Builder<'a> {
    fn new(spec: &'a TableSpec, dialect: Dialect) -> Self {
        Builder {
            spec,
            dialect,
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder, cast on PostgreSQL when the column declares one.
    fn param(&mut self, column: &str, v: Value) -> String {
        self.params.push(v);
        let n = self.params.len();
        match (self.dialect, self.spec.cast_for(column)) {
            (Dialect::Postgres, Some(ty)) => format!("${}::{}", n, ty),
            _ => format!("${}", n),
        }
    }

    fn table(&self) -> String {
        quoted(self.spec.table)
    }

    fn pk(&self) -> String {
        quoted(self.spec.primary_key)
    }

    fn live_filter(&self) -> &'static str {
        if self.spec.soft_delete {
            " AND \"deleted_at\" IS NULL"
        } else {
            ""
        }
    }

    fn finish(self, sql: String) -> QueryBuf {
        QueryBuf { sql, params: self.params }
    }
}

/// SELECT every live row, in whatever order the database returns them.
pub fn select_all(spec: &TableSpec, dialect: Dialect) -> QueryBuf {
    let b = Builder::new(spec, dialect);
    let where_clause = if spec.soft_delete {
        " WHERE \"deleted_at\" IS NULL"
    } else {
        ""
    };
    let sql = format!("SELECT * FROM {}{}", b.table(), where_clause);
    b.finish(sql)
}

/// SELECT by primary key.
pub fn select_by_id(spec: &TableSpec, dialect: Dialect, id: &Value) -> QueryBuf {
    let mut b = Builder::new(spec, dialect);
    let ph = b.param(spec.primary_key, id.clone());
    let sql = format!("SELECT * FROM {} WHERE {} = {}{}", b.table(), b.pk(), ph, b.live_filter());
    b.finish(sql)
}

/// SELECT rows where one column equals a value.
pub fn select_where(spec: &TableSpec, dialect: Dialect, column: &str, value: &Value) -> Result<QueryBuf, DbError> {
    let mut b = Builder::new(spec, dialect);
    let col = checked_column(column)?;
    let ph = b.param(column, value.clone());
    let sql = format!("SELECT * FROM {} WHERE {} = {}{}", b.table(), col, ph, b.live_filter());
    Ok(b.finish(sql))
}

pub fn count(spec: &TableSpec, dialect: Dialect) -> QueryBuf {
    let b = Builder::new(spec, dialect);
    let where_clause = if spec.soft_delete {
        " WHERE \"deleted_at\" IS NULL"
    } else {
        ""
    };
    let sql = format!("SELECT COUNT(*) AS \"count\" FROM {}{}", b.table(), where_clause);
    b.finish(sql)
}

/// INSERT exactly the given columns, returning the generated primary key.
pub fn insert(spec: &TableSpec, dialect: Dialect, fields: &Fields) -> Result<QueryBuf, DbError> {
    if fields.is_empty() {
        return Err(DbError::Query(format!("insert into {} with no fields", spec.table)));
    }
    let mut b = Builder::new(spec, dialect);
    let mut cols = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        cols.push(checked_column(name)?);
        placeholders.push(b.param(name, value.clone()));
    }
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        b.table(),
        cols.join(", "),
        placeholders.join(", "),
        b.pk()
    );
    Ok(b.finish(sql))
}

/// UPDATE by id. The primary key is never part of SET. Rows already holding every given value
/// are excluded, so the affected-row count is the number of rows that actually changed.
pub fn update(spec: &TableSpec, dialect: Dialect, id: &Value, fields: &Fields) -> Result<QueryBuf, DbError> {
    let mut b = Builder::new(spec, dialect);
    let mut sets = Vec::new();
    let mut changed = Vec::new();
    for (name, value) in fields {
        if name == spec.primary_key {
            continue;
        }
        let col = checked_column(name)?;
        let ph = b.param(name, value.clone());
        sets.push(format!("{} = {}", col, ph));
        changed.push(format!("{} IS DISTINCT FROM {}", col, ph));
    }
    if sets.is_empty() {
        return Err(DbError::Query(format!("update of {} with no fields", spec.table)));
    }
    let id_ph = b.param(spec.primary_key, id.clone());
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}{} AND ({})",
        b.table(),
        sets.join(", "),
        b.pk(),
        id_ph,
        b.live_filter(),
        changed.join(" OR ")
    );
    Ok(b.finish(sql))
}

/// DELETE by id, or mark deleted for soft-delete tables.
pub fn delete(spec: &TableSpec, dialect: Dialect, id: &Value) -> QueryBuf {
    let mut b = Builder::new(spec, dialect);
    let ph = b.param(spec.primary_key, id.clone());
    let sql = if spec.soft_delete {
        format!(
            "UPDATE {} SET \"deleted_at\" = CURRENT_TIMESTAMP WHERE {} = {} AND \"deleted_at\" IS NULL",
            b.table(),
            b.pk(),
            ph
        )
    } else {
        format!("DELETE FROM {} WHERE {} = {}", b.table(), b.pk(), ph)
    };
    b.finish(sql)
}
