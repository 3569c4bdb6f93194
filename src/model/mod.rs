//! Data-access base: generic CRUD over one table, and the typed entity layer on top.

mod dao;
mod table;

pub use dao::Dao;
pub use table::Table;

use crate::db::Record;
use crate::error::AppError;

/// Fixed schema of one entity kind: table, primary key, soft-delete opt-in, and PostgreSQL casts
/// for columns whose text input needs one (dates, uuids, enums).
#[derive(Clone, Copy, Debug)]
pub struct TableSpec {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub soft_delete: bool,
    pub casts: &'static [(&'static str, &'static str)],
}

impl TableSpec {
    pub const fn new(table: &'static str) -> Self {
        TableSpec {
            table,
            primary_key: "id",
            soft_delete: false,
            casts: &[],
        }
    }

    pub const fn with_primary_key(self, primary_key: &'static str) -> Self {
        TableSpec { primary_key, ..self }
    }

    /// Rows are hidden by `deleted_at` instead of removed.
    pub const fn with_soft_delete(self) -> Self {
        TableSpec {
            soft_delete: true,
            ..self
        }
    }

    pub const fn with_casts(self, casts: &'static [(&'static str, &'static str)]) -> Self {
        TableSpec { casts, ..self }
    }

    pub fn cast_for(&self, column: &str) -> Option<&'static str> {
        self.casts.iter().find(|(c, _)| *c == column).map(|(_, ty)| *ty)
    }
}

/// A typed row. Each entity decodes itself from a [`Record`] explicitly.
pub trait Entity: Sized + Send + Sync {
    const SPEC: TableSpec;

    fn from_record(record: Record) -> Result<Self, AppError>;
}
