//! Registrar: server-rendered MVC runtime for an academic records admin application.
//!
//! Routes map paths to controller actions, actions read and write rows through the data-access
//! base, and views are rendered inside a layout.

pub mod config;
pub mod db;
pub mod error;
pub mod kernel;
pub mod logging;
pub mod model;
pub mod request;
pub mod response;
pub mod router;
pub mod sql;
pub mod state;
pub mod view;

pub use config::Settings;
pub use db::{Connection, ConnectionManager, Fields, Record, UnitOfWork};
pub use error::{AppError, ConfigError, DbError, TemplateError};
pub use kernel::Kernel;
pub use model::{Dao, Entity, Table, TableSpec};
pub use request::Request;
pub use response::Response;
pub use router::{Callback, Context, Controller, Router};
pub use state::AppState;
pub use view::{RenderContext, Renderer};
