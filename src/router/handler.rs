//! The callable shapes a route can be bound to.

use crate::error::AppError;
use crate::request::Request;
use crate::response::Response;
use crate::state::AppState;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// What an action receives besides its positional parameters.
pub struct Context {
    pub state: AppState,
    pub request: Request,
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// A resolved, invocable handler.
pub type HandlerFn = Arc<dyn Fn(Context, Vec<String>) -> HandlerFuture + Send + Sync>;

/// A controller is constructed fresh for every dispatch and asked to run one named action.
#[async_trait]
pub trait Controller: Send + 'static {
    /// Type name shown in configuration errors.
    const NAME: &'static str;
    /// Actions `call` understands. Routes naming any other action fail at registration.
    const ACTIONS: &'static [&'static str];

    fn from_state(state: &AppState) -> Self;

    async fn call(&mut self, action: &str, request: Request, params: Vec<String>) -> Result<Response, AppError>;
}

/// An unresolved route target.
pub enum Callback {
    Action {
        controller: &'static str,
        action: &'static str,
        known: &'static [&'static str],
        invoke: HandlerFn,
    },
    Function(HandlerFn),
    Named(String),
}

impl Callback {
    /// `(controller type, action name)`.
    pub fn action<C: Controller>(action: &'static str) -> Self {
        let invoke: HandlerFn = Arc::new(move |ctx: Context, params: Vec<String>| {
            Box::pin(async move {
                let mut controller = C::from_state(&ctx.state);
                controller.call(action, ctx.request, params).await
            }) as HandlerFuture
        });
        Callback::Action {
            controller: C::NAME,
            action,
            known: C::ACTIONS,
            invoke,
        }
    }

    /// Any async function or closure taking the context and parameters.
    pub fn function<F, Fut>(f: F) -> Self
    where
        F: Fn(Context, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
    {
        Callback::Function(handler_fn(f))
    }

    /// A function registered on the router with `Router::define`.
    pub fn named(name: impl Into<String>) -> Self {
        Callback::Named(name.into())
    }
}

pub(crate) fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Context, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    Arc::new(move |ctx, params| Box::pin(f(ctx, params)) as HandlerFuture)
}
