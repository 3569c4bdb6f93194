//! Path router: per-method route tables scanned in registration order; first match wins.

mod handler;
mod route;

pub use handler::{Callback, Context, Controller, HandlerFn, HandlerFuture};
pub use route::{normalize_path, Pattern};

use crate::error::{AppError, ConfigError};
use crate::request::Request;
use crate::response::Response;
use crate::state::AppState;
use axum::http::{Method, StatusCode};
use std::collections::HashMap;
use std::future::Future;

pub struct Route {
    method: Method,
    pattern: Pattern,
    target: String,
    handler: HandlerFn,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        self.pattern.source()
    }

    /// Human-readable handler description, e.g. `StudentsController::show`.
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// Result of matching a request path.
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Placeholder values in the order they appear in the pattern.
    pub params: Vec<String>,
}

/// Routes are registered through `&mut Router` at startup; once the router is shared it is
/// read-only.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    functions: HashMap<String, HandlerFn>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named function for `Callback::named`.
    pub fn define<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(Context, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
    {
        self.functions.insert(name.to_string(), handler::handler_fn(f));
        self
    }

    pub fn get(&mut self, pattern: &str, callback: Callback) -> Result<&mut Self, ConfigError> {
        self.add(Method::GET, pattern, callback)
    }

    pub fn post(&mut self, pattern: &str, callback: Callback) -> Result<&mut Self, ConfigError> {
        self.add(Method::POST, pattern, callback)
    }

    pub fn put(&mut self, pattern: &str, callback: Callback) -> Result<&mut Self, ConfigError> {
        self.add(Method::PUT, pattern, callback)
    }

    pub fn patch(&mut self, pattern: &str, callback: Callback) -> Result<&mut Self, ConfigError> {
        self.add(Method::PATCH, pattern, callback)
    }

    pub fn delete(&mut self, pattern: &str, callback: Callback) -> Result<&mut Self, ConfigError> {
        self.add(Method::DELETE, pattern, callback)
    }

    pub fn add(&mut self, method: Method, pattern: &str, callback: Callback) -> Result<&mut Self, ConfigError> {
        let pattern = Pattern::compile(pattern)?;
        let (handler, target) = self.resolve_callback(callback)?;
        tracing::debug!(method = %method, pattern = %pattern.source(), handler = %target, "route registered");
        self.routes.push(Route {
            method,
            pattern,
            target,
            handler,
        });
        Ok(self)
    }

    /// Controller action first, then function value, then named function.
    fn resolve_callback(&self, callback: Callback) -> Result<(HandlerFn, String), ConfigError> {
        match callback {
            Callback::Action {
                controller,
                action,
                known,
                invoke,
            } => {
                if !known.contains(&action) {
                    return Err(ConfigError::InvalidCallback(format!(
                        "{} has no action '{}'",
                        controller, action
                    )));
                }
                Ok((invoke, format!("{}::{}", controller, action)))
            }
            Callback::Function(f) => Ok((f, "<function>".to_string())),
            Callback::Named(name) => match self.functions.get(&name) {
                Some(f) => Ok((f.clone(), name)),
                None => Err(ConfigError::InvalidCallback(format!("no function named '{}'", name))),
            },
        }
    }

    /// All routes as registered.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route of `method` whose pattern matches `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize_path(path);
        self.routes
            .iter()
            .filter(|r| r.method == *method)
            .find_map(|route| route.pattern.captures(&path).map(|params| RouteMatch { route, params }))
    }

    /// Route one request. An unmatched path yields the 404 page and runs no handler.
    pub async fn dispatch(&self, state: &AppState, request: Request) -> Result<Response, AppError> {
        let method = request.effective_method();
        let Some(matched) = self.resolve(&method, request.path()) else {
            tracing::info!(method = %method, path = %request.path(), "no route matched");
            let mut data = serde_json::Map::new();
            data.insert("path".into(), request.path().into());
            return Ok(Response::from(state.views.render_error(StatusCode::NOT_FOUND, data)));
        };
        tracing::debug!(
            method = %method,
            path = %request.path(),
            handler = %matched.route.target,
            params = ?matched.params,
            "route matched"
        );
        let ctx = Context {
            state: state.clone(),
            request,
        };
        (matched.route.handler)(ctx, matched.params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Grades;

    #[async_trait]
    impl Controller for Grades {
        const NAME: &'static str = "Grades";
        const ACTIONS: &'static [&'static str] = &["index"];

        fn from_state(_: &AppState) -> Self {
            Grades
        }

        async fn call(&mut self, _action: &str, _request: Request, _params: Vec<String>) -> Result<Response, AppError> {
            Ok(Response::html("grades".into()))
        }
    }

    fn ok() -> Callback {
        Callback::function(|_ctx, _params| async { Ok(Response::html(String::new())) })
    }

    #[test]
    fn unknown_controller_action_fails_at_registration() {
        let mut router = Router::new();
        assert!(router.get("/grades", Callback::action::<Grades>("index")).is_ok());
        let err = router.get("/grades/{id}", Callback::action::<Grades>("show")).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidCallback(_)));
        assert_eq!(router.routes().len(), 1);
    }

    #[test]
    fn undefined_named_function_fails_at_registration() {
        let mut router = Router::new();
        assert!(router.get("/", Callback::named("dashboard")).is_err());
        router.define("dashboard", |_ctx, _params| async { Ok(Response::html(String::new())) });
        assert!(router.get("/", Callback::named("dashboard")).is_ok());
        assert_eq!(router.routes()[0].target(), "dashboard");
    }

    #[test]
    fn resolve_is_per_method_and_first_match_wins() {
        let mut router = Router::new();
        router
            .get("/students/new", ok())
            .unwrap()
            .get("/students/{id}", ok())
            .unwrap()
            .delete("/students/{id}", ok())
            .unwrap();

        let m = router.resolve(&Method::GET, "/students/new").unwrap();
        assert_eq!(m.route.pattern(), "/students/new");
        assert!(m.params.is_empty());

        let m = router.resolve(&Method::GET, "/students/42/").unwrap();
        assert_eq!(m.route.pattern(), "/students/{id}");
        assert_eq!(m.params, vec!["42"]);

        assert!(router.resolve(&Method::PUT, "/students/42").is_none());
        assert_eq!(router.resolve(&Method::DELETE, "/students/42").unwrap().route.method(), &Method::DELETE);
    }
}
