use crate::check::{CheckOutcome, ErrorMap, push_error};
use crate::error::{LibraryError, LibraryResult};
use crate::expr::{Env, Expr};
use crate::library::Library;

/// Evaluate every rule against every part.
///
/// A rule that is not `True` for a part is recorded under that part id. A rule
/// that cannot be evaluated (syntax, unknown name, type mismatch) fails the
/// whole check, since it is the rule set that is broken, not the part.
pub fn check_rules(library: &Library) -> LibraryResult<CheckOutcome> {
    let compiled = library
        .rules
        .iter()
        .map(|rule| {
            Expr::parse(rule).map_err(|source| LibraryError::Rule {
                rule: rule.clone(),
                source,
            })
        })
        .collect::<LibraryResult<Vec<_>>>()?;

    let mut errors = ErrorMap::new();
    for part in &library.data {
        let env = Env::from_record(&part.fields);
        for rule in &compiled {
            let satisfied = rule
                .is_satisfied(&env)
                .map_err(|source| LibraryError::Rule {
                    rule: rule.source().to_string(),
                    source,
                })?;
            if !satisfied {
                tracing::error!("part {} breaks rule '{}'", part.id, rule.source());
                push_error(&mut errors, &part.id, rule.source());
            }
        }
    }

    Ok(CheckOutcome::from_errors(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprError;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bearings(rules: &[&str], data: serde_json::Value) -> Library {
        Library::from_document(json!({ "rules": rules, "data": data })).unwrap()
    }

    #[test]
    fn clean_library_has_no_errors() {
        let lib = bearings(
            &["weight > 0", "inner_diameter < outer_diameter"],
            json!({
                "608ZZ": {"inner_diameter": 8, "outer_diameter": 22, "weight": 12},
                "624ZZ": {"inner_diameter": 4, "outer_diameter": 13, "weight": 2}
            }),
        );
        let outcome = check_rules(&lib).unwrap();
        assert!(outcome.ok);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn negative_weight_is_one_violation() {
        let lib = bearings(
            &["weight > 0"],
            json!({
                "608ZZ": {"weight": -5},
                "624ZZ": {"weight": 2}
            }),
        );
        let outcome = check_rules(&lib).unwrap();
        assert!(!outcome.ok);
        assert_eq!(
            outcome.errors,
            ErrorMap::from([("608ZZ".to_string(), vec!["weight > 0".to_string()])])
        );
    }

    #[test]
    fn two_broken_rules_are_both_named() {
        let lib = bearings(
            &["weight > 0", "inner_diameter < outer_diameter"],
            json!({
                "624ZZ": {"inner_diameter": 14, "outer_diameter": 13, "weight": -2}
            }),
        );
        let outcome = check_rules(&lib).unwrap();
        assert_eq!(
            outcome.errors["624ZZ"],
            vec![
                "weight > 0".to_string(),
                "inner_diameter < outer_diameter".to_string()
            ]
        );
    }

    #[test]
    fn undeclared_name_is_a_rule_defect() {
        let lib = bearings(
            &["out_diam > inner_diameter"],
            json!({"608ZZ": {"inner_diameter": 8, "outer_diameter": 22}}),
        );
        match check_rules(&lib).unwrap_err() {
            LibraryError::Rule { rule, source } => {
                assert_eq!(rule, "out_diam > inner_diameter");
                assert!(matches!(source, ExprError::NameReference { name, .. } if name == "out_diam"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn syntax_error_surfaces_even_without_parts() {
        let lib = bearings(&["outer_diameter ! inner_diameter"], json!({}));
        assert!(matches!(
            check_rules(&lib),
            Err(LibraryError::Rule {
                source: ExprError::Syntax { .. },
                ..
            })
        ));
    }
}
