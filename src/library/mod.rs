//! Library layer: JSON document shape, loading and storing.
//!
//! JSON shape:
//! {
//!   "metadata": {
//!     "name": "ISO_4014",
//!     "units": { "length": ["mm", ["d", "l"]], "weight": ["g", ["weight"]] }
//!   },
//!   "generators": { "hex_screw": ["d = {{ d }}\n", "..."] },
//!   "rules": ["d > 0", "l > d"],
//!   "aliases": { "M6": { "d": 6.0, "k": 4.0 } },
//!   "data": {
//!     "M6x30": { "description": "...", "generator": "hex_screw", "size": "__alias__M6", "l": 30 }
//!   }
//! }
//!
//! Two views are kept:
//! - the raw `serde_json::Value` document, used for alias resolution and
//!   template output so unknown sections survive untouched;
//! - [`Library`], the typed view the checks run on.

pub mod units;

pub use units::{UnitSpec, Units};

use crate::error::LibraryResult;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Field name -> value, in document order.
pub type Record = Map<String, JsonValue>;

/// Fields every part may carry without a unit declaration.
pub const ALWAYS_ALLOWED_FIELDS: [&str; 2] = ["description", "generator"];

/// Typed view of a library document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub metadata: Metadata,

    /// Generator id -> template source lines.
    #[serde(default)]
    pub generators: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub rules: Vec<String>,

    /// Parts in document order; the first one is the field-uniformity reference.
    #[serde(default, deserialize_with = "deserialize_parts")]
    pub data: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub units: Units,
}

/// One entry of the `data` section.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub id: String,
    pub fields: Record,
}

impl Part {
    pub fn generator(&self) -> Option<&str> {
        self.fields.get("generator").and_then(JsonValue::as_str)
    }

    pub fn field_names(&self) -> BTreeSet<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

impl Library {
    pub fn from_document(doc: JsonValue) -> LibraryResult<Self> {
        Ok(serde_json::from_value(doc)?)
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.data.iter().find(|p| p.id == id)
    }
}

/// Read a JSON document, keeping key order.
///
/// A `serde_json::Value` map keeps only the last of two equal keys, so part ids
/// are checked for repeats on the raw text first.
pub fn load_document(path: impl AsRef<Path>) -> LibraryResult<JsonValue> {
    let text = fs::read_to_string(path.as_ref())?;
    serde_json::from_str::<PartIds>(&text)?;
    Ok(serde_json::from_str(&text)?)
}

/// Only the ids of the `data` section; every other section is skipped.
#[derive(Deserialize)]
struct PartIds {
    #[serde(default, rename = "data", deserialize_with = "deserialize_unique_ids")]
    _ids: Vec<String>,
}

fn deserialize_unique_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdsVisitor;

    impl<'de> Visitor<'de> for IdsVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of part id to part record")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut ids = Vec::with_capacity(access.size_hint().unwrap_or(0));
            let mut seen = BTreeSet::new();
            while let Some((id, IgnoredAny)) = access.next_entry::<String, IgnoredAny>()? {
                if !seen.insert(id.clone()) {
                    return Err(de::Error::custom(format!("duplicate part id '{}'", id)));
                }
                ids.push(id);
            }
            Ok(ids)
        }
    }

    deserializer.deserialize_map(IdsVisitor)
}

/// Write a document with 2-space indentation and a trailing newline.
///
/// The text is fully serialized before the file is opened, so a serialization
/// failure never leaves a truncated file behind.
pub fn write_document(path: impl AsRef<Path>, doc: &JsonValue) -> LibraryResult<()> {
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    write_text(path, &text)
}

/// Write text through a buffered handle and flush before returning.
pub fn write_text(path: impl AsRef<Path>, text: &str) -> LibraryResult<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn deserialize_parts<'de, D>(deserializer: D) -> Result<Vec<Part>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PartsVisitor;

    impl<'de> Visitor<'de> for PartsVisitor {
        type Value = Vec<Part>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of part id to part record")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut parts = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((id, fields)) = access.next_entry::<String, Record>()? {
                parts.push(Part { id, fields });
            }
            Ok(parts)
        }
    }

    deserializer.deserialize_map(PartsVisitor)
}
