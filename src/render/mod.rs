//! Template rendering seam.
//!
//! Library templates and generator scripts contain `{{ name }}` tags that are
//! filled from a context object. Anything implementing [`Renderer`] can be
//! plugged in; [`PlaceholderRenderer`] is the built-in one.

mod placeholder;

pub use placeholder::PlaceholderRenderer;

use crate::error::{LibraryError, LibraryResult};
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("'{name}' is undefined in the render context")]
    Undefined { name: String },

    #[error("unsupported tag '{{{{{tag}}}}}'")]
    UnsupportedTag { tag: String },
}

pub trait Renderer {
    fn render(&self, template: &str, context: &Map<String, JsonValue>) -> Result<String, RenderError>;
}

/// Read a template file and render it.
pub fn render_file(
    renderer: &dyn Renderer,
    path: impl AsRef<Path>,
    context: &Map<String, JsonValue>,
) -> LibraryResult<String> {
    let path = path.as_ref();
    let template = fs::read_to_string(path)?;
    renderer
        .render(&template, context)
        .map_err(|source| LibraryError::Render {
            path: path.to_path_buf(),
            source,
        })
}
