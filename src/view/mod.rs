//! Server-side HTML rendering.

mod context;
mod renderer;

pub use context::{RenderContext, DEFAULT_LAYOUT};
pub use renderer::{ErrorPage, Renderer};
