//! Load settings from the environment (after `.env`) or from any key lookup.

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

impl Settings {
    /// Read `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a lookup function. Missing optional keys fall back to defaults;
    /// database credentials are required for drivers that use them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let driver = match get("DB_DRIVER") {
            Some(s) => Driver::parse(&s).ok_or_else(|| ConfigError::Invalid {
                key: "DB_DRIVER",
                message: format!("unknown driver '{}'", s),
            })?,
            None => Driver::Postgres,
        };
        let port = parse_or("DB_PORT", get("DB_PORT"), DEFAULT_DB_PORT)?;
        let max_connections = parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?;
        let connect_timeout = parse_or(
            "DB_CONNECT_TIMEOUT_SECS",
            get("DB_CONNECT_TIMEOUT_SECS"),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;

        let database = DatabaseSettings {
            driver,
            host: get("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.into()),
            port,
            database: get("DB_DATABASE").unwrap_or_else(|| DEFAULT_DB_NAME.into()),
            username: get("DB_USERNAME"),
            // an empty password is a value, not an absence
            password: lookup("DB_PASSWORD"),
            charset: get("DB_CHARSET").unwrap_or_else(|| DEFAULT_DB_CHARSET.into()),
            max_connections,
            connect_timeout: Duration::from_secs(connect_timeout),
        };

        let app = AppSettings {
            name: get("APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.into()),
            base_url: get("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.into()),
            timezone: get("APP_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.into()),
            environment: get("APP_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.into()),
            debug: parse_bool("APP_DEBUG", get("APP_DEBUG"))?,
            bind: get("APP_BIND").unwrap_or_else(|| DEFAULT_BIND.into()),
            views_path: PathBuf::from(get("VIEWS_PATH").unwrap_or_else(|| DEFAULT_VIEWS_PATH.into())),
            log_dir: get("LOG_DIR").map(PathBuf::from),
        };

        let settings = Settings { app, database };
        validate(&settings)?;
        Ok(settings)
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(s) => s.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_credentials() {
        let s = Settings::from_lookup(lookup(&[("DB_USERNAME", "registrar"), ("DB_PASSWORD", "secret")])).unwrap();
        assert_eq!(s.database.driver, Driver::Postgres);
        assert_eq!(s.database.host, DEFAULT_DB_HOST);
        assert_eq!(s.database.port, 5432);
        assert_eq!(s.database.charset, "UTF8");
        assert_eq!(s.app.timezone, "UTC");
        assert!(s.app.is_production());
        assert!(!s.app.debug);
        assert_eq!(s.app.views_path, PathBuf::from("views"));
    }

    #[test]
    fn missing_credentials_are_fatal_for_postgres() {
        let err = Settings::from_lookup(lookup(&[("DB_PASSWORD", "secret")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DB_USERNAME")));
        let err = Settings::from_lookup(lookup(&[("DB_USERNAME", "registrar")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DB_PASSWORD")));
    }

    #[test]
    fn empty_password_is_accepted() {
        let s = Settings::from_lookup(lookup(&[("DB_USERNAME", "registrar"), ("DB_PASSWORD", "")])).unwrap();
        assert_eq!(s.database.password.as_deref(), Some(""));
    }

    #[test]
    fn sqlite_needs_no_credentials() {
        let s = Settings::from_lookup(lookup(&[("DB_DRIVER", "sqlite"), ("DB_DATABASE", ":memory:")])).unwrap();
        assert_eq!(s.database.driver, Driver::Sqlite);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = Settings::from_lookup(lookup(&[("DB_DRIVER", "sqlite"), ("DB_PORT", "fifty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_PORT", .. }));
        let err = Settings::from_lookup(lookup(&[("DB_DRIVER", "oracle")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DB_DRIVER", .. }));
        let err = Settings::from_lookup(lookup(&[("DB_DRIVER", "sqlite"), ("APP_DEBUG", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "APP_DEBUG", .. }));
    }
}
