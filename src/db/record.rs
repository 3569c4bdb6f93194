//! One row of a backing table as a named map of primitive values.

use crate::error::AppError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Column values for an insert or update. Ordered so generated SQL is stable.
pub type Fields = BTreeMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Record(Map::new())
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Integer column; SQLite may hand numeric text back for untyped expressions.
    pub fn i64(&self, column: &str) -> Option<i64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn f64(&self, column: &str) -> Option<f64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn str(&self, column: &str) -> Option<&str> {
        self.0.get(column)?.as_str()
    }

    /// Boolean column; integer 0/1 is accepted since SQLite stores booleans that way.
    pub fn bool(&self, column: &str) -> Option<bool> {
        match self.0.get(column)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        }
    }

    pub fn require_i64(&self, entity: &'static str, column: &str) -> Result<i64, AppError> {
        self.i64(column).ok_or_else(|| missing(entity, column))
    }

    pub fn require_str(&self, entity: &'static str, column: &str) -> Result<String, AppError> {
        self.str(column).map(str::to_string).ok_or_else(|| missing(entity, column))
    }

    /// Text column that may be null.
    pub fn opt_str(&self, column: &str) -> Option<String> {
        self.str(column).map(str::to_string)
    }
}

fn missing(entity: &'static str, column: &str) -> AppError {
    AppError::Decode {
        entity,
        message: format!("column '{}' missing or of the wrong type", column),
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_getters_tolerate_sqlite_storage() {
        let r: Record = [
            ("id".to_string(), json!(3)),
            ("active".to_string(), json!(1)),
            ("code".to_string(), json!("17")),
            ("name".to_string(), json!(null)),
        ]
        .into_iter()
        .collect();
        assert_eq!(r.i64("id"), Some(3));
        assert_eq!(r.bool("active"), Some(true));
        assert_eq!(r.i64("code"), Some(17));
        assert_eq!(r.opt_str("name"), None);
        assert!(matches!(r.require_str("student", "name"), Err(AppError::Decode { .. })));
    }
}
