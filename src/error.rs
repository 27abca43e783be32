//! Error types for loading, resolving, checking and generating a parts library.
//!
//! Per-part findings (rule violations, schema mismatches) are never errors: they
//! are collected into [`crate::check::ErrorMap`]. The variants below describe a
//! library that cannot be processed at all.

use crate::expr::ExprError;
use crate::render::RenderError;
use std::path::PathBuf;
use thiserror::Error;

pub type LibraryResult<T> = std::result::Result<T, LibraryError>;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// The document is valid JSON but a section has the wrong shape.
    #[error("library section '{section}' is malformed: {message}")]
    InvalidSection {
        section: &'static str,
        message: String,
    },

    #[error("part {part} references unknown alias '{alias}'")]
    UnknownAlias { part: String, alias: String },

    /// Expansion limit hit; the alias graph is almost certainly cyclic.
    #[error("part {part} needed more than {limit} alias expansions (circular aliases?)")]
    AliasDepthExceeded { part: String, limit: usize },

    /// A rule is broken for the whole library (syntax, unknown name, type mismatch).
    #[error("invalid rule '{rule}': {source}")]
    Rule {
        rule: String,
        #[source]
        source: ExprError,
    },

    #[error("part {part} uses unknown generator '{generator}'")]
    UnknownGenerator { part: String, generator: String },

    #[error("part {part} has no 'generator' field")]
    MissingGenerator { part: String },

    #[error("cannot render script of part {part} with generator '{generator}': {source}")]
    PartRender {
        part: String,
        generator: String,
        #[source]
        source: RenderError,
    },

    #[error("cannot render {}: {source}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
}
