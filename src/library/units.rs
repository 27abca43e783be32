//! Units table from `metadata.units`.
//!
//! JSON shape: { "length": ["mm", ["d", "l", "k"]], "weight": ["g", ["weight"]] }

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// `[symbol, [fields...]]` for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnitSpec {
    pub symbol: String,
    pub fields: Vec<String>,
}

/// Unit name -> declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Units(pub BTreeMap<String, UnitSpec>);

impl Units {
    /// Every field name declared under any unit.
    pub fn declared_fields(&self) -> BTreeSet<&str> {
        self.0
            .values()
            .flat_map(|u| u.fields.iter().map(String::as_str))
            .collect()
    }

    /// Fields claimed more than once, with every unit name that claims them
    /// (a unit appears twice if it lists the field twice).
    pub fn duplicate_fields(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut claims: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (unit, spec) in &self.0 {
            for field in &spec.fields {
                claims.entry(field.as_str()).or_default().push(unit.as_str());
            }
        }
        claims.retain(|_, units| units.len() > 1);
        claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn units(json: &str) -> Units {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_symbol_and_field_pairs() {
        let u = units(r#"{"length": ["mm", ["d", "l"]], "weight": ["g", ["weight"]]}"#);
        assert_eq!(u.0["length"].symbol, "mm");
        assert_eq!(u.0["weight"].fields, vec!["weight".to_string()]);
        assert_eq!(
            u.declared_fields().into_iter().collect::<Vec<_>>(),
            vec!["d", "l", "weight"]
        );
    }

    #[test]
    fn duplicates_across_and_within_units() {
        let u = units(r#"{"length": ["mm", ["p", "d", "p"]], "force": ["N", ["d"]]}"#);
        let dups = u.duplicate_fields();
        assert_eq!(dups.len(), 2);
        assert_eq!(dups["p"], vec!["length", "length"]);
        assert_eq!(dups["d"], vec!["force", "length"]);
    }
}
