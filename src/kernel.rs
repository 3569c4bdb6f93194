//! Application kernel: one request in, one response out, nothing escapes.

use crate::db::Connection;
use crate::error::AppError;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::state::AppState;
use crate::view::Renderer;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use serde::Serialize;
use std::any::Any;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

/// Largest accepted request body. Admin forms are small.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct Kernel {
    router: Arc<Router>,
    state: AppState,
}

impl Kernel {
    /// Freezes the route table; nothing can be registered after this.
    pub fn new(router: Router, state: AppState) -> Self {
        Kernel {
            router: Arc::new(router),
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Dispatch one request. Handler errors are logged and turned into error pages.
    pub async fn run(&self, request: Request) -> Response {
        let id = request.id().to_string();
        let method = request.effective_method();
        let path = request.path().to_string();
        match self.router.dispatch(&self.state, request).await {
            Ok(response) => response,
            Err(err) => self.failure(&id, &method, &path, &err),
        }
    }

    fn failure(&self, id: &str, method: &Method, path: &str, err: &AppError) -> Response {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(
                request_id = %id,
                method = %method,
                path = %path,
                error = %err,
                debug = ?err,
                backtrace = %Backtrace::force_capture(),
                "request failed"
            );
            if self.state.settings.app.debug {
                return Response::text(status, format!("{} {}\n\n{}", status.as_u16(), reason(status), err));
            }
            return Response::from(self.state.views.render_error(status, serde_json::Map::new()));
        }

        tracing::info!(request_id = %id, method = %method, path = %path, status = status.as_u16(), error = %err, "request rejected");
        let mut data = serde_json::Map::new();
        data.insert("path".into(), path.into());
        Response::from(self.state.views.render_error(status, data))
    }

    /// The HTTP service: `/health` and `/ready`, everything else through [`Kernel::run`].
    pub fn into_router(self) -> axum::Router {
        let views = Arc::clone(&self.state.views);
        let state = self.state.clone();
        let kernel = Arc::new(self);

        axum::Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .with_state(state)
            .fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                let kernel = Arc::clone(&kernel);
                async move {
                    let request = Request::from_parts(method, &uri, headers, &body);
                    kernel.run(request).await
                }
            })
            .layer(CatchPanicLayer::custom(move |panic: Box<dyn Any + Send + 'static>| {
                panic_response(&views, panic)
            }))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
    }
}

/// Span around every HTTP request. Also carries method and path into the panic log, which only
/// sees the panic payload.
fn request_span(req: &axum::http::Request<Body>) -> Span {
    tracing::info_span!("request", method = %req.method(), path = %req.uri().path())
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Error")
}

fn panic_response(views: &Renderer, panic: Box<dyn Any + Send + 'static>) -> axum::http::Response<Body> {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %message, "handler panicked");
    Response::from(views.render_error(StatusCode::INTERNAL_SERVER_ERROR, serde_json::Map::new())).into_response()
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    database: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyBody>) {
    let reachable = match state.db.get_connection().await {
        Ok(conn) => conn.fetch_optional("SELECT 1", &[]).await.is_ok(),
        Err(_) => false,
    };
    if reachable {
        (StatusCode::OK, Json(ReadyBody { status: "ok", database: "ok" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                database: "unavailable",
            }),
        )
    }
}
