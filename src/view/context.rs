//! Per-request view bindings and layout choice.

use crate::error::{AppError, TemplateError};
use serde::Serialize;
use serde_json::{Map, Value};

pub const DEFAULT_LAYOUT: &str = "main";

#[derive(Clone, Debug)]
pub struct RenderContext {
    data: Map<String, Value>,
    layout: String,
}

impl Default for RenderContext {
    fn default() -> Self {
        RenderContext {
            data: Map::new(),
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to any serializable value.
    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Result<Self, AppError> {
        let v = serde_json::to_value(value).map_err(|e| TemplateError::Render {
            path: format!("data.{}", key),
            message: e.to_string(),
        })?;
        self.data.insert(key.to_string(), v);
        Ok(self)
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn layout_name(&self) -> &str {
        &self.layout
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl From<Map<String, Value>> for RenderContext {
    fn from(data: Map<String, Value>) -> Self {
        RenderContext {
            data,
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }
}
