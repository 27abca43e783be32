//! Library checks: rules, units declaration, field uniformity.
//!
//! Every check returns a [`CheckOutcome`]: a pass/fail flag plus the findings
//! keyed by part id (or [`UNITS_DEFINITION_KEY`] for the units table itself).
//! Findings are data, not errors. Only a library that cannot be checked at all
//! (bad JSON, broken rule, broken alias) yields `Err`.

pub mod fields;
pub mod rules;
pub mod units;

pub use fields::check_fields_uniformity;
pub use rules::check_rules;
pub use units::{UNITS_DEFINITION_KEY, check_units_definition};

use crate::alias;
use crate::error::LibraryResult;
use crate::library::{self, Library};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Identifier (part id or "units definition") -> human readable findings.
pub type ErrorMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub ok: bool,
    pub errors: ErrorMap,
}

impl CheckOutcome {
    pub fn from_errors(errors: ErrorMap) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }
}

pub(crate) fn push_error(errors: &mut ErrorMap, key: &str, message: impl Into<String>) {
    errors.entry(key.to_string()).or_default().push(message.into());
}

/// Combined result of the three checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub rules: CheckOutcome,
    pub units: CheckOutcome,
    pub fields: CheckOutcome,
}

impl CheckReport {
    /// `[rules_ok, units_ok, fields_ok]`
    pub fn results(&self) -> [bool; 3] {
        [self.rules.ok, self.units.ok, self.fields.ok]
    }

    /// `[rules_errors, units_errors, fields_errors]`
    pub fn errors(&self) -> [&ErrorMap; 3] {
        [&self.rules.errors, &self.units.errors, &self.fields.errors]
    }

    pub fn is_ok(&self) -> bool {
        self.results().iter().all(|ok| *ok)
    }
}

/// Run all three checks. None short-circuits the others; only a broken rule
/// definition aborts.
pub fn check_all(library: &Library) -> LibraryResult<CheckReport> {
    let rules = check_rules(library)?;
    let units = check_units_definition(library);
    let fields = check_fields_uniformity(library);

    tracing::info!(
        "checked {} part(s): rules {}, units {}, fields {}",
        library.data.len(),
        verdict(rules.ok),
        verdict(units.ok),
        verdict(fields.ok)
    );

    Ok(CheckReport {
        rules,
        units,
        fields,
    })
}

fn verdict(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAILED" }
}

/// Load a library file, expand any aliases still in it, and return the typed view.
pub fn load_resolved(path: impl AsRef<Path>) -> LibraryResult<Library> {
    let doc = library::load_document(path)?;
    Library::from_document(alias::resolve_document(doc)?)
}

pub fn check_library_file(path: impl AsRef<Path>) -> LibraryResult<CheckReport> {
    check_all(&load_resolved(path)?)
}

pub fn check_library_json_rules(path: impl AsRef<Path>) -> LibraryResult<CheckOutcome> {
    check_rules(&load_resolved(path)?)
}

pub fn check_library_units_definition(path: impl AsRef<Path>) -> LibraryResult<CheckOutcome> {
    Ok(check_units_definition(&load_resolved(path)?))
}

pub fn check_library_fields(path: impl AsRef<Path>) -> LibraryResult<CheckOutcome> {
    Ok(check_fields_uniformity(&load_resolved(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;
    use serde_json::json;

    #[test]
    fn all_three_checks_run_even_when_each_fails() {
        let lib = Library::from_document(json!({
            "metadata": {"units": {"length": ["mm", ["d", "d"]], "weight": ["g", ["weight"]]}},
            "rules": ["weight > 0"],
            "data": {
                "a": {"d": 1, "weight": -5},
                "b": {"d": 1, "weight": 3, "extra": 1}
            }
        }))
        .unwrap();

        let report = check_all(&lib).unwrap();
        assert_eq!(report.results(), [false, false, false]);
        assert!(!report.is_ok());

        let [rules, units, fields] = report.errors();
        assert_eq!(rules["a"], vec!["weight > 0".to_string()]);
        assert!(units.contains_key(UNITS_DEFINITION_KEY));
        assert!(units.contains_key("b"));
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn broken_rule_aborts_the_whole_check() {
        let lib = Library::from_document(json!({
            "rules": ["weight >"],
            "data": {"a": {"weight": 1}}
        }))
        .unwrap();
        assert!(matches!(check_all(&lib), Err(LibraryError::Rule { .. })));
    }
}
