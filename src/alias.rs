//! Alias expansion.
//!
//! A part field whose string value contains `__alias__` refers to an entry of the
//! `aliases` section: `"size": "__alias__M6"` is replaced by every field of
//! `aliases["M6"]`, and the `size` field itself is dropped. Alias entries may
//! reference other aliases; expansion repeats until no marker is left.

use crate::error::{LibraryError, LibraryResult};
use crate::library::Record;
use serde_json::{Map, Value as JsonValue};

pub const ALIAS_MARKER: &str = "__alias__";

/// Upper bound on expansions for one part record; cyclic alias graphs hit it.
pub const MAX_ALIAS_EXPANSIONS: usize = 256;

/// Alias key referenced by a value, if it carries the marker.
pub fn alias_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if s.contains(ALIAS_MARKER) => Some(s.replace(ALIAS_MARKER, "")),
        _ => None,
    }
}

pub fn has_aliases(record: &Record) -> bool {
    record.values().any(|v| alias_key(v).is_some())
}

fn first_alias_field(record: &Record) -> Option<(String, String)> {
    record
        .iter()
        .find_map(|(field, value)| alias_key(value).map(|key| (field.clone(), key)))
}

/// Expand every alias reference of one part record.
///
/// Alias fields are merged in (last write wins, new keys appended), then the
/// referencing field is removed without disturbing the order of the others.
pub fn resolve_record(
    part_id: &str,
    mut record: Record,
    aliases: &Map<String, JsonValue>,
) -> LibraryResult<Record> {
    let mut expansions = 0usize;

    while let Some((field, key)) = first_alias_field(&record) {
        if expansions == MAX_ALIAS_EXPANSIONS {
            return Err(LibraryError::AliasDepthExceeded {
                part: part_id.to_string(),
                limit: MAX_ALIAS_EXPANSIONS,
            });
        }
        expansions += 1;

        let entry = aliases
            .get(&key)
            .ok_or_else(|| LibraryError::UnknownAlias {
                part: part_id.to_string(),
                alias: key.clone(),
            })?;
        let entry = entry.as_object().ok_or_else(|| LibraryError::InvalidSection {
            section: "aliases",
            message: format!("alias '{}' is not an object", key),
        })?;

        for (k, v) in entry {
            record.insert(k.clone(), v.clone());
        }
        record.shift_remove(&field);
    }

    if expansions > 0 {
        tracing::debug!("part {}: {} alias expansion(s)", part_id, expansions);
    }
    Ok(record)
}

/// Resolve every part of a raw library document and drop the `aliases` section.
///
/// Other sections are carried through untouched and in their original order.
pub fn resolve_document(mut doc: JsonValue) -> LibraryResult<JsonValue> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| LibraryError::InvalidSection {
            section: "document",
            message: "top level is not an object".to_string(),
        })?;

    let aliases = match root.shift_remove("aliases") {
        None | Some(JsonValue::Null) => Map::new(),
        Some(JsonValue::Object(map)) => map,
        Some(_) => {
            return Err(LibraryError::InvalidSection {
                section: "aliases",
                message: "expected an object".to_string(),
            });
        }
    };

    if let Some(data) = root.get_mut("data") {
        let parts = data
            .as_object_mut()
            .ok_or_else(|| LibraryError::InvalidSection {
                section: "data",
                message: "expected an object".to_string(),
            })?;

        for (part_id, value) in parts.iter_mut() {
            let fields = value
                .as_object_mut()
                .ok_or_else(|| LibraryError::InvalidSection {
                    section: "data",
                    message: format!("part {} is not an object", part_id),
                })?;
            if !has_aliases(fields) {
                continue;
            }
            let record = std::mem::take(fields);
            *fields = resolve_record(part_id, record, &aliases)?;
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(v: JsonValue) -> Map<String, JsonValue> {
        match v {
            JsonValue::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn keys(record: &Record) -> Vec<&str> {
        record.keys().map(String::as_str).collect()
    }

    #[test]
    fn expands_and_drops_referencing_field() {
        let aliases = obj(json!({"M6": {"d": 6.0, "k": 4.0}}));
        let record = obj(json!({"description": "M6x30", "size": "__alias__M6", "l": 30}));

        let out = resolve_record("M6x30", record, &aliases).unwrap();
        assert_eq!(keys(&out), vec!["description", "l", "d", "k"]);
        assert_eq!(out["d"], json!(6.0));
        assert!(!out.contains_key("size"));
    }

    #[test]
    fn nested_aliases_expand_fully() {
        let aliases = obj(json!({
            "M6": {"d": 6.0, "thread": "__alias__coarse_M6"},
            "coarse_M6": {"p": 1.0}
        }));
        let record = obj(json!({"size": "__alias__M6"}));

        let out = resolve_record("p1", record, &aliases).unwrap();
        assert!(!has_aliases(&out));
        assert_eq!(out, obj(json!({"d": 6.0, "p": 1.0})));
    }

    #[test]
    fn alias_fields_overwrite_existing_values() {
        let aliases = obj(json!({"M6": {"d": 6.0}}));
        let record = obj(json!({"d": 5.0, "size": "__alias__M6"}));

        let out = resolve_record("p1", record, &aliases).unwrap();
        assert_eq!(out, obj(json!({"d": 6.0})));
    }

    #[test]
    fn resolving_a_resolved_record_is_a_no_op() {
        let aliases = obj(json!({"M6": {"d": 6.0}}));
        let record = obj(json!({"z": 1, "a": "plain", "m": 2.5}));

        let out = resolve_record("p1", record.clone(), &aliases).unwrap();
        assert_eq!(keys(&out), keys(&record));
        assert_eq!(out, record);
    }

    #[test]
    fn unknown_alias_is_an_error() {
        let err = resolve_record("p1", obj(json!({"s": "__alias__M8"})), &Map::new()).unwrap_err();
        match err {
            LibraryError::UnknownAlias { part, alias } => {
                assert_eq!(part, "p1");
                assert_eq!(alias, "M8");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn circular_aliases_hit_the_expansion_limit() {
        let aliases = obj(json!({
            "a": {"x": "__alias__b"},
            "b": {"y": "__alias__a"}
        }));
        let err = resolve_record("p1", obj(json!({"s": "__alias__a"})), &aliases).unwrap_err();
        assert!(matches!(
            err,
            LibraryError::AliasDepthExceeded { limit: MAX_ALIAS_EXPANSIONS, .. }
        ));
    }

    #[test]
    fn non_string_values_never_carry_the_marker() {
        assert_eq!(alias_key(&json!(12)), None);
        assert_eq!(alias_key(&json!(["__alias__M6"])), None);
        assert_eq!(alias_key(&json!("__alias__M6")), Some("M6".to_string()));
    }

    #[test]
    fn document_resolution_removes_aliases_section_and_keeps_order() {
        let doc = json!({
            "metadata": {"name": "screws"},
            "rules": ["d > 0"],
            "aliases": {"M6": {"d": 6.0}},
            "data": {"b": {"size": "__alias__M6"}, "a": {"d": 8.0}}
        });

        let out = resolve_document(doc).unwrap();
        let root = out.as_object().unwrap();
        assert_eq!(keys(root), vec!["metadata", "rules", "data"]);
        assert_eq!(keys(root["data"].as_object().unwrap()), vec!["b", "a"]);
        assert_eq!(out["data"]["b"], json!({"d": 6.0}));
    }
}
