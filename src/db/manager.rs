//! Owns the one shared database handle for the process.

use crate::config::{DatabaseSettings, Driver};
use crate::db::{connect, Connection};
use crate::error::DbError;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lazily opens the connection on first use and hands the same handle to every caller after
/// that. Constructed once by the composition root and injected into data-access code.
pub struct ConnectionManager {
    settings: Option<DatabaseSettings>,
    conn: Mutex<Option<Arc<dyn Connection>>>,
}

impl ConnectionManager {
    pub fn new(settings: DatabaseSettings) -> Self {
        ConnectionManager {
            settings: Some(settings),
            conn: Mutex::new(None),
        }
    }

    /// Wrap an already-open handle. After `disconnect` there is nothing to reconnect with.
    pub fn from_connection(conn: Arc<dyn Connection>) -> Self {
        ConnectionManager {
            settings: None,
            conn: Mutex::new(Some(conn)),
        }
    }

    /// The shared handle, connecting first if needed. Concurrent first callers wait on the
    /// lock and all receive the same handle.
    pub async fn get_connection(&self) -> Result<Arc<dyn Connection>, DbError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(Arc::clone(conn));
        }
        let Some(settings) = &self.settings else {
            tracing::error!("connection requested after disconnect of an injected handle");
            return Err(DbError::Connection);
        };
        match connect(settings).await {
            Ok(conn) => {
                tracing::info!(driver = ?settings.driver, database = %settings.database, "database connected");
                *slot = Some(Arc::clone(&conn));
                Ok(conn)
            }
            Err(e) => {
                // host and driver detail stay in the log
                match settings.driver {
                    Driver::Postgres => tracing::error!(
                        host = %settings.host,
                        port = settings.port,
                        database = %settings.database,
                        error = %e,
                        "database connection failed"
                    ),
                    Driver::Sqlite => tracing::error!(
                        database = %settings.database,
                        error = %e,
                        "database connection failed"
                    ),
                }
                Err(DbError::Connection)
            }
        }
    }

    /// Close and forget the handle; the next `get_connection` reconnects.
    pub async fn disconnect(&self) {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.close().await;
            tracing::info!("database disconnected");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_handle_until_disconnect() {
        let manager = ConnectionManager::new(DatabaseSettings::sqlite_memory());
        assert!(!manager.is_connected().await);
        let a = manager.get_connection().await.unwrap();
        let b = manager.get_connection().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        manager.disconnect().await;
        assert!(!manager.is_connected().await);
        let c = manager.get_connection().await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_handle() {
        let manager = Arc::new(ConnectionManager::new(DatabaseSettings::sqlite_memory()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&manager);
                tokio::spawn(async move { m.get_connection().await.unwrap() })
            })
            .collect();
        let mut conns = Vec::new();
        for h in handles {
            conns.push(h.await.unwrap());
        }
        assert!(conns.iter().all(|c| Arc::ptr_eq(c, &conns[0])));
    }

    #[tokio::test]
    async fn failure_is_generic() {
        let mut settings = DatabaseSettings::sqlite_memory();
        settings.database = "/nonexistent-registrar-dir/nested/registrar.db".into();
        let manager = ConnectionManager::new(settings);
        let err = manager.get_connection().await.err().unwrap();
        assert!(matches!(err, DbError::Connection));
        assert!(!err.to_string().contains("nonexistent"));
        assert!(!manager.is_connected().await);
    }

    #[tokio::test]
    async fn injected_handle_cannot_reconnect() {
        let conn = connect(&DatabaseSettings::sqlite_memory()).await.unwrap();
        let manager = ConnectionManager::from_connection(Arc::clone(&conn));
        assert!(Arc::ptr_eq(&manager.get_connection().await.unwrap(), &conn));
        manager.disconnect().await;
        assert!(matches!(manager.get_connection().await, Err(DbError::Connection)));
    }
}
