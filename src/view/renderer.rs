//! Two-stage rendering: the view produces `content`, the layout wraps it.

use crate::config::AppSettings;
use crate::error::TemplateError;
use crate::view::RenderContext;
use axum::http::StatusCode;
use minijinja::{context, Environment, Value};
use serde_json::Map;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "html";

/// Rendered error page. `fallback` is set when the error template itself could not be used
/// and `body` is the static plain-text page.
#[derive(Debug)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub body: String,
    pub fallback: bool,
}

pub struct Renderer {
    base_dir: PathBuf,
    env: Environment<'static>,
}

impl Renderer {
    /// Templates are read from `base_dir`; `{% include %}` resolves against it too.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(&base_dir));
        Renderer { base_dir, env }
    }

    /// Expose application settings to every template.
    pub fn with_globals(mut self, app: &AppSettings) -> Self {
        self.env.add_global("app_name", app.name.clone());
        self.env.add_global("base_url", app.base_url.trim_end_matches('/').to_string());
        self.env.add_global("environment", app.environment.clone());
        self.env.add_global("timezone", app.timezone.clone());
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Render `view` inside the context's layout.
    pub fn render(&self, view: &str, ctx: &RenderContext) -> Result<String, TemplateError> {
        let view_name = template_name(view)?;
        let layout_name = template_name(&format!("layouts/{}", ctx.layout_name()))?;
        let view_source = self.read(&view_name)?;
        let layout_source = self.read(&layout_name)?;

        let data = Value::from_serialize(ctx.data());
        let content = self.execute(&view_name, &view_source, data.clone())?;
        let layout_ctx = context! {
            content => Value::from_safe_string(content),
            ..data
        };
        self.execute(&layout_name, &layout_source, layout_ctx)
    }

    /// Render `errors/{status}`. Any failure there yields a static page instead, never another
    /// error render.
    pub fn render_error(&self, status: StatusCode, data: Map<String, serde_json::Value>) -> ErrorPage {
        let reason = status.canonical_reason().unwrap_or("Error");
        let mut data = data;
        data.insert("status".into(), status.as_u16().into());
        data.insert("reason".into(), reason.into());
        let view = format!("errors/{}", status.as_u16());
        match self.render(&view, &RenderContext::from(data)) {
            Ok(body) => ErrorPage {
                status,
                body,
                fallback: false,
            },
            Err(e) => {
                tracing::warn!(view = %view, error = %e, "error template unavailable, using fallback");
                ErrorPage {
                    status,
                    body: format!("{} {}", status.as_u16(), reason),
                    fallback: true,
                }
            }
        }
    }

    fn read(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.base_dir.join(name);
        if !path.is_file() {
            return Err(TemplateError::NotFound(path.display().to_string()));
        }
        fs::read_to_string(&path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "template unreadable");
            TemplateError::NotFound(path.display().to_string())
        })
    }

    /// Output is only returned whole; a failure part-way leaves nothing behind.
    fn execute(&self, name: &str, source: &str, ctx: Value) -> Result<String, TemplateError> {
        self.env.render_named_str(name, source, ctx).map_err(|e| {
            let path = self.base_dir.join(name).display().to_string();
            tracing::error!(path = %path, error = %e, "template execution failed");
            TemplateError::Render {
                path,
                message: e.to_string(),
            }
        })
    }
}

/// `students/index` -> `students/index.html`. Only plain segments are allowed.
fn template_name(logical: &str) -> Result<String, TemplateError> {
    let valid = !logical.is_empty()
        && logical.split('/').all(|seg| {
            !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\') && !seg.contains(':')
        });
    if !valid {
        return Err(TemplateError::NotFound(logical.to_string()));
    }
    Ok(format!("{}.{}", logical, EXTENSION))
}
