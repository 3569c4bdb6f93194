//! Typed data-access object: a [`Table`] whose rows decode into one entity type.

use crate::db::{Connection, ConnectionManager, Fields, Record};
use crate::error::AppError;
use crate::model::{Entity, Table};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Dao<E> {
    table: Table,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Dao<E> {
    fn clone(&self) -> Self {
        Dao {
            table: self.table.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Dao<E> {
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Dao {
            table: Table::new(conn, E::SPEC),
            _entity: PhantomData,
        }
    }

    /// Bind to the manager's shared handle.
    pub async fn connect(manager: &ConnectionManager) -> Result<Self, AppError> {
        Ok(Self::new(manager.get_connection().await?))
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Record>, AppError> {
        Ok(self.table.query(sql, params).await?)
    }

    pub async fn all(&self) -> Result<Vec<E>, AppError> {
        decode_all(self.table.all().await?)
    }

    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<E>, AppError> {
        self.table.find(&id.into()).await?.map(E::from_record).transpose()
    }

    /// Like `find`, but a missing row becomes `AppError::NotFound` for actions that answer 404.
    pub async fn find_or_404(&self, id: impl Into<Value>) -> Result<E, AppError> {
        let id = id.into();
        self.find(id.clone())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {}", E::SPEC.table, id)))
    }

    pub async fn where_eq(&self, column: &str, value: impl Into<Value>) -> Result<Vec<E>, AppError> {
        decode_all(self.table.where_eq(column, &value.into()).await?)
    }

    pub async fn first_where(&self, column: &str, value: impl Into<Value>) -> Result<Option<E>, AppError> {
        self.table
            .first_where(column, &value.into())
            .await?
            .map(E::from_record)
            .transpose()
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        Ok(self.table.count().await?)
    }

    pub async fn create(&self, fields: &Fields) -> Result<Value, AppError> {
        Ok(self.table.create(fields).await?)
    }

    pub async fn update(&self, id: impl Into<Value>, fields: &Fields) -> Result<bool, AppError> {
        Ok(self.table.update(&id.into(), fields).await?)
    }

    pub async fn delete(&self, id: impl Into<Value>) -> Result<bool, AppError> {
        Ok(self.table.delete(&id.into()).await?)
    }
}

fn decode_all<E: Entity>(records: Vec<Record>) -> Result<Vec<E>, AppError> {
    records.into_iter().map(E::from_record).collect()
}
