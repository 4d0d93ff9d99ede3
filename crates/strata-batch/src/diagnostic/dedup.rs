//! Deduplication of diagnostic errors.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use super::ErrorObject;

/// Computes the stable fingerprint of an error.
///
/// The fingerprint covers status code, code, title and detail, plus property
/// path, pointer and parameter when the error has a source. The cause is not
/// part of it: two completed errors that read the same are duplicates.
pub fn fingerprint(error: &ErrorObject) -> [u8; 32] {
    let mut hasher = Sha256::new();

    let status = error.status_code().map(|status| status.to_string());
    let mut fields = vec![
        status.as_deref(),
        error.code(),
        error.title(),
        error.detail(),
    ];

    if let Some(source) = error.source() {
        fields.extend([
            source.property_path(),
            source.pointer(),
            source.parameter(),
        ]);
    }

    for field in fields {
        match field {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }

    hasher.finalize().into()
}

/// Returns the errors with duplicates removed, keeping the first occurrence
/// of each fingerprint and the original order.
pub fn deduplicate(errors: &[ErrorObject]) -> Vec<ErrorObject> {
    let mut seen = HashSet::with_capacity(errors.len());
    errors
        .iter()
        .filter(|error| seen.insert(fingerprint(error)))
        .cloned()
        .collect()
}

/// Removes duplicate errors in place.
///
/// Lists with fewer than two errors are left untouched without hashing, and
/// the list is only rewritten when a duplicate was actually found. Returns the
/// number of removed errors.
pub fn deduplicate_in_place(errors: &mut Vec<ErrorObject>) -> usize {
    if errors.len() < 2 {
        return 0;
    }

    let unique = deduplicate(errors);
    let removed = errors.len() - unique.len();
    if removed > 0 {
        *errors = unique;
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ErrorSource;

    fn completed(code: &str, detail: &str) -> ErrorObject {
        ErrorObject::default()
            .with_status_code(400)
            .with_code(code)
            .with_title("title")
            .with_detail(detail)
    }

    #[test]
    fn test_keeps_first_occurrence_in_order() {
        let errors = vec![
            completed("a", "one"),
            completed("b", "two"),
            completed("a", "one"),
            completed("c", "three"),
            completed("b", "two"),
        ];

        let unique = deduplicate(&errors);
        let codes: Vec<_> = unique.iter().filter_map(ErrorObject::code).collect();
        assert_eq!(codes, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deduplication_is_idempotent() {
        let errors = vec![completed("a", "one"), completed("a", "one"), completed("b", "two")];

        let once = deduplicate(&errors);
        let twice = deduplicate(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_list_without_duplicates_is_returned_unchanged() {
        let errors = vec![completed("a", "one"), completed("b", "two"), completed("c", "three")];
        assert_eq!(deduplicate(&errors), errors);
    }

    #[test]
    fn test_source_distinguishes_errors() {
        let first = completed("a", "one").with_property_path("name");
        let second = completed("a", "one").with_property_path("email");
        let third = completed("a", "one").with_source(ErrorSource::from_pointer("/data/id"));

        assert_ne!(fingerprint(&first), fingerprint(&second));
        assert_ne!(fingerprint(&first), fingerprint(&third));
        assert_eq!(deduplicate(&[first, second, third]).len(), 3);
    }

    #[test]
    fn test_field_boundaries_are_part_of_the_fingerprint() {
        let first = ErrorObject::default().with_code("ab").with_title("c");
        let second = ErrorObject::default().with_code("a").with_title("bc");

        assert_ne!(fingerprint(&first), fingerprint(&second));
    }

    #[test]
    fn test_in_place_reports_removed_count() {
        let mut errors = vec![completed("a", "one"), completed("a", "one")];
        assert_eq!(deduplicate_in_place(&mut errors), 1);
        assert_eq!(errors.len(), 1);

        let mut single = vec![completed("a", "one")];
        assert_eq!(deduplicate_in_place(&mut single), 0);
    }
}
