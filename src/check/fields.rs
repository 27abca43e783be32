use crate::check::{CheckOutcome, ErrorMap, push_error};
use crate::library::{ALWAYS_ALLOWED_FIELDS, Library, Part};
use std::collections::BTreeSet;

/// Every part must carry the same field names as the first part in the document,
/// `description` and `generator` aside.
///
/// The reference is positional: reordering `data` changes which part the
/// mismatch is reported against.
pub fn check_fields_uniformity(library: &Library) -> CheckOutcome {
    let mut errors = ErrorMap::new();

    let Some((reference, others)) = library.data.split_first() else {
        return CheckOutcome::from_errors(errors);
    };
    let expected = compared_fields(reference);

    for part in others {
        let actual = compared_fields(part);
        let differing: Vec<&str> = expected.symmetric_difference(&actual).copied().collect();
        if !differing.is_empty() {
            tracing::error!(
                "part {} fields differ from {}: {}",
                part.id,
                reference.id,
                differing.join(", ")
            );
            push_error(
                &mut errors,
                &part.id,
                format!(
                    "fields differ from part {}: {}",
                    reference.id,
                    differing.join(", ")
                ),
            );
        }
    }

    CheckOutcome::from_errors(errors)
}

fn compared_fields(part: &Part) -> BTreeSet<&str> {
    let mut names = part.field_names();
    names.retain(|name| !ALWAYS_ALLOWED_FIELDS.contains(name));
    names
}
