//! Settings validation: values that make startup impossible.

use crate::config::{Driver, Settings};
use crate::error::ConfigError;

pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    let db = &settings.database;
    if db.driver == Driver::Postgres {
        if db.username.is_none() {
            return Err(ConfigError::Missing("DB_USERNAME"));
        }
        if db.password.is_none() {
            return Err(ConfigError::Missing("DB_PASSWORD"));
        }
    }
    if db.max_connections == 0 {
        return Err(ConfigError::Invalid {
            key: "DB_MAX_CONNECTIONS",
            message: "must be at least 1".into(),
        });
    }
    if db.database.is_empty() {
        return Err(ConfigError::Missing("DB_DATABASE"));
    }
    if !settings.app.base_url.starts_with("http://") && !settings.app.base_url.starts_with("https://") {
        return Err(ConfigError::Invalid {
            key: "APP_URL",
            message: format!("'{}' is not an http(s) url", settings.app.base_url),
        });
    }
    Ok(())
}
