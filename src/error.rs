//! Typed errors and HTTP status mapping.

use axum::http::StatusCode;
use thiserror::Error;

/// Startup-time misconfiguration: bad settings or invalid route callbacks.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("invalid route pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("invalid callback: {0}")]
    InvalidCallback(String),
}

/// Failures of the data layer.
#[derive(Error, Debug)]
pub enum DbError {
    /// Message is deliberately generic; the driver error is logged where it happens.
    #[error("database unavailable")]
    Connection,
    #[error("query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        DbError::Query(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("template {path} failed: {message}")]
    Render { path: String, message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("decode {entity}: {message}")]
    Decode { entity: &'static str, message: String },
}

impl AppError {
    /// Status the kernel answers with when this error escapes an action.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Db(_)
            | AppError::Template(_)
            | AppError::Decode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(DbError::from(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_hides_driver_detail() {
        let e = AppError::from(DbError::Connection);
        assert_eq!(e.to_string(), "database unavailable");
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn expected_negatives_map_to_client_statuses() {
        assert_eq!(AppError::NotFound("7".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("id".into()).status(), StatusCode::BAD_REQUEST);
    }
}
