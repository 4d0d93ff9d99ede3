//! Completion of diagnostic errors before they are surfaced.

use super::{EntityMetadata, ErrorCause, ErrorObject};
use crate::context::RequestType;

/// Status code for validation failures.
pub const VALIDATION_STATUS_CODE: u16 = 400;

/// Status code for business rule violations.
pub const BUSINESS_RULE_STATUS_CODE: u16 = 409;

/// Status code for unforeseen failures.
pub const UNEXPECTED_STATUS_CODE: u16 = 500;

/// Code reported for unforeseen failures.
pub const UNEXPECTED_ERROR_CODE: &str = "unexpected_error";

/// Fills the missing fields of an error.
///
/// Implementations must only fill fields that are still unset; fields set by
/// the error producer always win. The request type is passed explicitly so a
/// completer never depends on ambient request state.
pub trait ErrorCompleter: Send + Sync {
    fn complete(
        &self,
        error: &mut ErrorObject,
        request_type: &RequestType,
        metadata: Option<&EntityMetadata>,
    );
}

/// Protocol-agnostic completion driven by the error cause.
///
/// - validation: `400`, code and title derived from the constraint name
/// - business rule: `409`, code and title derived from the rule name
/// - exception or unknown cause: `500`, `unexpected_error`
///
/// The detail falls back to the exception message, then to the title.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorCompleter;

impl ErrorCompleter for DefaultErrorCompleter {
    fn complete(
        &self,
        error: &mut ErrorObject,
        _request_type: &RequestType,
        _metadata: Option<&EntityMetadata>,
    ) {
        let (status_code, code, title, message) = match error.cause() {
            Some(ErrorCause::Validation { constraint }) => {
                let words = split_words(constraint);
                (
                    VALIDATION_STATUS_CODE,
                    words.join("_"),
                    format!("{} constraint", words.join(" ")),
                    None,
                )
            }
            Some(ErrorCause::BusinessRule { rule }) => {
                let words = split_words(rule);
                (
                    BUSINESS_RULE_STATUS_CODE,
                    words.join("_"),
                    format!("{} rule", words.join(" ")),
                    None,
                )
            }
            Some(ErrorCause::Exception { message }) => (
                UNEXPECTED_STATUS_CODE,
                UNEXPECTED_ERROR_CODE.to_owned(),
                "unexpected error".to_owned(),
                Some(message.clone()),
            ),
            None => (
                UNEXPECTED_STATUS_CODE,
                UNEXPECTED_ERROR_CODE.to_owned(),
                "unexpected error".to_owned(),
                None,
            ),
        };

        error.fill_status_code(status_code);
        error.fill_code(code);
        if let Some(message) = message.filter(|message| !message.is_empty()) {
            error.fill_detail(message);
        }
        error.fill_title(title);
        if let Some(title) = error.title().map(str::to_owned) {
            error.fill_detail(title);
        }
    }
}

/// Completion for JSON:API requests.
///
/// Performs the default completion and, when entity metadata is available,
/// converts the property path of a field-level error into a JSON pointer into
/// the request document. Without metadata no pointer is guessed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiErrorCompleter {
    base: DefaultErrorCompleter,
}

impl JsonApiErrorCompleter {
    pub fn new() -> Self {
        Self::default()
    }

    fn pointer_for(property_path: &str, metadata: &EntityMetadata) -> Option<String> {
        let (head, rest) = match property_path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (property_path, None),
        };

        let pointer = if metadata.is_identifier(head) {
            "/data/id".to_owned()
        } else if metadata.has_association(head) {
            format!("/data/relationships/{head}")
        } else if metadata.has_field(head) {
            format!("/data/attributes/{head}")
        } else {
            return None;
        };

        Some(match rest {
            Some(rest) if !metadata.is_identifier(head) => {
                format!("{pointer}/{}", rest.replace('.', "/"))
            }
            _ => pointer,
        })
    }
}

impl ErrorCompleter for JsonApiErrorCompleter {
    fn complete(
        &self,
        error: &mut ErrorObject,
        request_type: &RequestType,
        metadata: Option<&EntityMetadata>,
    ) {
        self.base.complete(error, request_type, metadata);

        let Some(metadata) = metadata else {
            return;
        };

        let pointer = error
            .source()
            .filter(|source| source.pointer().is_none())
            .and_then(|source| source.property_path())
            .and_then(|path| Self::pointer_for(path, metadata));

        if let Some(pointer) = pointer {
            error.fill_pointer(pointer);
        }
    }
}

/// Splits `NotBlank`, `not_blank` or `HTTPStatus` style names into lowercase words.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }

        current.extend(c.to_lowercase());
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_api() -> RequestType {
        RequestType::new(["rest", "json_api"])
    }

    fn user_metadata() -> EntityMetadata {
        EntityMetadata::new("user")
            .with_identifier_field("id")
            .with_field("email")
            .with_association("organization")
    }

    #[test]
    fn test_split_words_handles_common_styles() {
        assert_eq!(split_words("NotBlank"), vec!["not", "blank"]);
        assert_eq!(split_words("not_blank"), vec!["not", "blank"]);
        assert_eq!(split_words("HTTPStatus"), vec!["http", "status"]);
        assert_eq!(split_words("Uuid"), vec!["uuid"]);
        assert_eq!(split_words("Length2Max"), vec!["length2", "max"]);
    }

    #[test]
    fn test_default_completes_validation_errors() {
        let mut error = ErrorObject::validation("NotBlank");
        DefaultErrorCompleter.complete(&mut error, &RequestType::default(), None);

        assert_eq!(error.status_code(), Some(400));
        assert_eq!(error.code(), Some("not_blank"));
        assert_eq!(error.title(), Some("not blank constraint"));
        assert_eq!(error.detail(), Some("not blank constraint"));
        assert!(error.is_complete());
    }

    #[test]
    fn test_default_completes_exceptions_with_message() {
        let mut error = ErrorObject::exception("lock wait timeout");
        DefaultErrorCompleter.complete(&mut error, &RequestType::default(), None);

        assert_eq!(error.status_code(), Some(500));
        assert_eq!(error.code(), Some(UNEXPECTED_ERROR_CODE));
        assert_eq!(error.title(), Some("unexpected error"));
        assert_eq!(error.detail(), Some("lock wait timeout"));
    }

    #[test]
    fn test_default_completes_business_rules() {
        let mut error = ErrorObject::business_rule("UniqueEmail").with_detail("taken");
        DefaultErrorCompleter.complete(&mut error, &RequestType::default(), None);

        assert_eq!(error.status_code(), Some(409));
        assert_eq!(error.code(), Some("unique_email"));
        assert_eq!(error.title(), Some("unique email rule"));
        assert_eq!(error.detail(), Some("taken"));
    }

    #[test]
    fn test_default_keeps_producer_fields() {
        let mut error = ErrorObject::validation("NotBlank")
            .with_status_code(422)
            .with_code("custom");
        DefaultErrorCompleter.complete(&mut error, &RequestType::default(), None);

        assert_eq!(error.status_code(), Some(422));
        assert_eq!(error.code(), Some("custom"));
    }

    #[test]
    fn test_json_api_maps_property_paths_to_pointers() {
        let metadata = user_metadata();
        let cases = [
            ("email", Some("/data/attributes/email")),
            ("organization", Some("/data/relationships/organization")),
            ("id", Some("/data/id")),
            ("email.domain", Some("/data/attributes/email/domain")),
            ("unknown", None),
        ];

        for (path, expected) in cases {
            let mut error = ErrorObject::validation("NotBlank").with_property_path(path);
            JsonApiErrorCompleter::new().complete(&mut error, &json_api(), Some(&metadata));

            let source = error.source().unwrap();
            assert_eq!(source.pointer(), expected, "property path {path}");
            assert_eq!(source.property_path(), Some(path));
        }
    }

    #[test]
    fn test_json_api_without_metadata_keeps_property_path_only() {
        let mut error = ErrorObject::validation("NotBlank").with_property_path("email");
        JsonApiErrorCompleter::new().complete(&mut error, &json_api(), None);

        let source = error.source().unwrap();
        assert_eq!(source.pointer(), None);
        assert_eq!(source.property_path(), Some("email"));
        assert!(error.is_complete());
    }
}
