use crate::check::{CheckOutcome, ErrorMap, push_error};
use crate::library::{ALWAYS_ALLOWED_FIELDS, Library};

/// Key under which problems with the units table itself are reported.
pub const UNITS_DEFINITION_KEY: &str = "units definition";

/// Every field must be declared under exactly one unit, and every part field
/// (besides description / generator) must be declared.
pub fn check_units_definition(library: &Library) -> CheckOutcome {
    let units = &library.metadata.units;
    let mut errors = ErrorMap::new();

    let duplicates = units.duplicate_fields();
    if !duplicates.is_empty() {
        let listed: Vec<String> = duplicates
            .iter()
            .map(|(field, claimed_by)| format!("{} ({})", field, claimed_by.join(", ")))
            .collect();
        tracing::error!("units declare some fields more than once");
        push_error(
            &mut errors,
            UNITS_DEFINITION_KEY,
            format!("field(s) declared more than once: {}", listed.join("; ")),
        );
    }

    let declared = units.declared_fields();
    for part in &library.data {
        for field in part.fields.keys() {
            if ALWAYS_ALLOWED_FIELDS.contains(&field.as_str()) {
                continue;
            }
            if !declared.contains(field.as_str()) {
                tracing::error!("part {}: field {} not defined in units", part.id, field);
                push_error(
                    &mut errors,
                    &part.id,
                    format!("field {} not defined in units", field),
                );
            }
        }
    }

    CheckOutcome::from_errors(errors)
}
