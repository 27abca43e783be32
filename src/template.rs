//! Library creation from a template.
//!
//! A template is a library document that may still contain:
//! - a `{{ generators }}` tag, replaced by the sources found in the
//!   `generators/` directory next to the template;
//! - alias references (`__alias__...`), expanded in place.
//!
//! [`autocreate_library`] looks at which of the two are present and runs the
//! matching steps, generators first.

use crate::alias::{self, ALIAS_MARKER};
use crate::error::{LibraryError, LibraryResult};
use crate::library::{self, write_text};
use crate::render::Renderer;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const GENERATORS_TAGS: [&str; 2] = ["{{generators}}", "{{ generators }}"];
pub const GENERATORS_DIR: &str = "generators";
pub const LIBRARY_FILE: &str = "library.json";
const INTERMEDIATE_FILE: &str = "tmp.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateFeatures {
    pub generators: bool,
    pub aliases: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutocreateOutcome {
    Created {
        path: PathBuf,
        features: TemplateFeatures,
    },
    /// The template had neither a generators tag nor aliases; nothing was written.
    NothingToDo,
}

pub fn analyze_template_text(text: &str) -> TemplateFeatures {
    let mut features = TemplateFeatures::default();
    for line in text.lines() {
        if GENERATORS_TAGS.iter().any(|tag| line.contains(tag)) {
            features.generators = true;
        }
        if line.contains(ALIAS_MARKER) {
            features.aliases = true;
        }
    }
    features
}

pub fn analyze_template(path: impl AsRef<Path>) -> LibraryResult<TemplateFeatures> {
    Ok(analyze_template_text(&fs::read_to_string(path)?))
}

/// Create `library.json` next to the template.
pub fn autocreate_library(
    template: impl AsRef<Path>,
    renderer: &dyn Renderer,
) -> LibraryResult<AutocreateOutcome> {
    let template = template.as_ref();
    let features = analyze_template(template)?;
    tracing::info!("template file has generators tag : {}", features.generators);
    tracing::info!("template file has aliases : {}", features.aliases);

    let folder = template.parent().unwrap_or_else(|| Path::new("."));
    let generators_dir = folder.join(GENERATORS_DIR);
    let tmp_path = folder.join(INTERMEDIATE_FILE);
    let final_path = folder.join(LIBRARY_FILE);

    match (features.generators, features.aliases) {
        (true, true) => {
            template_handle_generators(template, &tmp_path, &generators_dir, renderer)?;
            template_handle_aliases(&tmp_path, &final_path)?;
            fs::remove_file(&tmp_path)?;
        }
        (true, false) => {
            template_handle_generators(template, &final_path, &generators_dir, renderer)?;
        }
        (false, true) => {
            template_handle_aliases(template, &final_path)?;
        }
        (false, false) => {
            tracing::warn!(
                "{} has no generators tag and no aliases, nothing to do",
                template.display()
            );
            return Ok(AutocreateOutcome::NothingToDo);
        }
    }

    tracing::info!("wrote {}", final_path.display());
    Ok(AutocreateOutcome::Created {
        path: final_path,
        features,
    })
}

/// Expand aliases of `file_in` and write the resolved document to `file_out`.
pub fn template_handle_aliases(
    file_in: impl AsRef<Path>,
    file_out: impl AsRef<Path>,
) -> LibraryResult<()> {
    let doc = library::load_document(file_in)?;
    let resolved = alias::resolve_document(doc)?;
    library::write_document(file_out, &resolved)
}

/// Replace the generators tag of `file_in` with the sources in `generators_dir`.
pub fn template_handle_generators(
    file_in: impl AsRef<Path>,
    file_out: impl AsRef<Path>,
    generators_dir: impl AsRef<Path>,
    renderer: &dyn Renderer,
) -> LibraryResult<()> {
    let generators = read_generators_dir(generators_dir)?;
    tracing::debug!("{} generator(s) found", generators.len());

    let mut context = Map::new();
    context.insert(
        "generators".to_string(),
        JsonValue::String(generators_json_body(&generators)?),
    );

    let text = crate::render::render_file(renderer, file_in, &context)?;
    write_text(file_out, &text)
}

/// Generator id (file stem) -> source lines, line endings kept.
pub fn read_generators_dir(dir: impl AsRef<Path>) -> LibraryResult<BTreeMap<String, Vec<String>>> {
    let mut generators = BTreeMap::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source = fs::read_to_string(&path)?;
        let lines = source.split_inclusive('\n').map(str::to_string).collect();
        generators.insert(id.to_string(), lines);
    }
    Ok(generators)
}

/// JSON object text of the generators map without its outer braces, so that it
/// can sit inside the template's own `{ ... }`.
pub fn generators_json_body(generators: &BTreeMap<String, Vec<String>>) -> LibraryResult<String> {
    let text = serde_json::to_string(generators)?;
    let body = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .ok_or_else(|| LibraryError::InvalidSection {
            section: "generators",
            message: "generators did not serialize to an object".to_string(),
        })?;
    Ok(body.to_string())
}
