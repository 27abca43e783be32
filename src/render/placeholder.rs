use crate::render::{RenderError, Renderer};
use regex::{Captures, Regex};
use serde_json::{Map, Value as JsonValue};

/// Substitutes `{{ name }}` tags with context values.
///
/// Strings are inserted verbatim; every other value is inserted as its JSON text
/// (`6.0`, `true`, `[1, 2]`). Tags must be a bare identifier.
#[derive(Debug, Clone)]
pub struct PlaceholderRenderer {
    tag: Regex,
}

impl PlaceholderRenderer {
    pub fn new() -> Result<Self, regex::Error> {
        // Non-greedy so two tags on one line stay separate.
        let tag = Regex::new(r"\{\{(.*?)\}\}")?;
        Ok(Self { tag })
    }
}

impl Renderer for PlaceholderRenderer {
    fn render(&self, template: &str, context: &Map<String, JsonValue>) -> Result<String, RenderError> {
        let mut failure: Option<RenderError> = None;

        let out = self.tag.replace_all(template, |caps: &Captures| {
            let inner = caps.get(1).map_or("", |m| m.as_str()).trim();
            if failure.is_some() {
                return String::new();
            }
            if !is_identifier(inner) {
                failure = Some(RenderError::UnsupportedTag {
                    tag: inner.to_string(),
                });
                return String::new();
            }
            match context.get(inner) {
                Some(JsonValue::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => {
                    failure = Some(RenderError::Undefined {
                        name: inner.to_string(),
                    });
                    String::new()
                }
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(out.into_owned()),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
