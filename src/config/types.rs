//! Runtime settings, loaded once at process start.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Backing database engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Postgres,
    Sqlite,
}

impl Driver {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Some(Driver::Postgres),
            "sqlite" | "sqlite3" => Some(Driver::Sqlite),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    /// Database name; for SQLite a file path or `:memory:`.
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub charset: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl DatabaseSettings {
    /// In-memory SQLite, used for local runs and tests.
    pub fn sqlite_memory() -> Self {
        DatabaseSettings {
            driver: Driver::Sqlite,
            host: DEFAULT_DB_HOST.into(),
            port: DEFAULT_DB_PORT,
            database: ":memory:".into(),
            username: None,
            password: None,
            charset: DEFAULT_DB_CHARSET.into(),
            max_connections: 1,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub name: String,
    pub base_url: String,
    pub timezone: String,
    pub environment: String,
    /// Reflect error detail in 500 pages. Never enabled by default.
    pub debug: bool,
    pub bind: String,
    pub views_path: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl AppSettings {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
}

pub const DEFAULT_DB_HOST: &str = "127.0.0.1";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "registrar";
pub const DEFAULT_DB_CHARSET: &str = "UTF8";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_APP_NAME: &str = "Registrar";
pub const DEFAULT_APP_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_ENVIRONMENT: &str = "production";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_VIEWS_PATH: &str = "views";
