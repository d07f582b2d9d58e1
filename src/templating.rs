use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use handlebars::Handlebars;
use serde_json::Value;

/// Abstraction for rendering the simulated reply template.
pub trait ReplyRenderer: Send + Sync {
    /// Render a template with the given data.
    fn render(&self, template: &str, data: &Value) -> Result<String>;
}

#[derive(Clone)]
pub struct HandlebarsRenderer {
    engine: Arc<Handlebars<'static>>,
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Replies are plain text, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        Self {
            engine: Arc::new(handlebars),
        }
    }
}

impl ReplyRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<String> {
        self.engine
            .render_template(template, data)
            .context("failed to render reply template")
    }
}
