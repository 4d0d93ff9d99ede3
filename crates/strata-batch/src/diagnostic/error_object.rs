//! Diagnostic error values reported for batches and items.

use serde::{Deserialize, Serialize};

/// Field-level attribution of an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    property_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameter: Option<String>,
}

impl ErrorSource {
    /// Creates a source attributed to a property path (e.g. `attributes.name`).
    pub fn from_property_path(path: impl Into<String>) -> Self {
        Self {
            property_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates a source attributed to a JSON pointer (e.g. `/data/attributes/name`).
    pub fn from_pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            ..Self::default()
        }
    }

    /// Creates a source attributed to a request parameter.
    pub fn from_parameter(parameter: impl Into<String>) -> Self {
        Self {
            parameter: Some(parameter.into()),
            ..Self::default()
        }
    }

    #[inline]
    pub fn property_path(&self) -> Option<&str> {
        self.property_path.as_deref()
    }

    #[inline]
    pub fn pointer(&self) -> Option<&str> {
        self.pointer.as_deref()
    }

    #[inline]
    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// Returns whether no attribution is set.
    pub fn is_empty(&self) -> bool {
        self.property_path.is_none() && self.pointer.is_none() && self.parameter.is_none()
    }
}

/// What produced an error, used to fill its missing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorCause {
    /// A validation constraint rejected the input (e.g. `NotBlank`).
    Validation { constraint: String },
    /// An explicit business check rejected the input.
    BusinessRule { rule: String },
    /// An unforeseen failure.
    Exception { message: String },
}

impl ErrorCause {
    /// Returns whether the cause is not an anticipated validation or business outcome.
    #[inline]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }
}

/// A diagnostic error attached to a batch or to one of its items.
///
/// Errors are created with whatever the producer knows and completed later by
/// an [`ErrorCompleter`]. Completion only fills fields that are still missing,
/// so a completed error never changes again.
///
/// [`ErrorCompleter`]: super::ErrorCompleter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cause: Option<ErrorCause>,
}

impl ErrorObject {
    /// Creates an error with the given cause and no other field set.
    pub fn new(cause: ErrorCause) -> Self {
        Self {
            cause: Some(cause),
            ..Self::default()
        }
    }

    /// Creates an error for a failed validation constraint.
    pub fn validation(constraint: impl Into<String>) -> Self {
        Self::new(ErrorCause::Validation {
            constraint: constraint.into(),
        })
    }

    /// Creates an error for a failed business rule.
    pub fn business_rule(rule: impl Into<String>) -> Self {
        Self::new(ErrorCause::BusinessRule { rule: rule.into() })
    }

    /// Creates an error for an unforeseen failure.
    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(ErrorCause::Exception {
            message: message.into(),
        })
    }

    /// Creates an unexpected error from a caught failure.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::exception(error.to_string())
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_source(mut self, source: ErrorSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Attributes the error to a property path.
    pub fn with_property_path(self, path: impl Into<String>) -> Self {
        self.with_source(ErrorSource::from_property_path(path))
    }

    #[inline]
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    #[inline]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[inline]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[inline]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    #[inline]
    pub fn source(&self) -> Option<&ErrorSource> {
        self.source.as_ref()
    }

    #[inline]
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// Returns whether status code, code, title and detail are all set.
    pub fn is_complete(&self) -> bool {
        self.status_code.is_some()
            && self.code.is_some()
            && self.title.is_some()
            && self.detail.is_some()
    }

    /// Returns whether this error signals a systemic failure rather than an
    /// anticipated validation or business outcome.
    pub fn is_unexpected(&self) -> bool {
        self.cause.as_ref().is_some_and(ErrorCause::is_unexpected)
            || self.status_code.is_some_and(|status| status >= 500)
    }

    /// Sets the status code if it is missing.
    pub fn fill_status_code(&mut self, status_code: u16) {
        self.status_code.get_or_insert(status_code);
    }

    /// Sets the code if it is missing.
    pub fn fill_code(&mut self, code: impl Into<String>) {
        if self.code.is_none() {
            self.code = Some(code.into());
        }
    }

    /// Sets the title if it is missing.
    pub fn fill_title(&mut self, title: impl Into<String>) {
        if self.title.is_none() {
            self.title = Some(title.into());
        }
    }

    /// Sets the detail if it is missing.
    pub fn fill_detail(&mut self, detail: impl Into<String>) {
        if self.detail.is_none() {
            self.detail = Some(detail.into());
        }
    }

    /// Sets the source pointer if the error has no pointer yet.
    pub fn fill_pointer(&mut self, pointer: impl Into<String>) {
        let source = self.source.get_or_insert_with(ErrorSource::default);
        if source.pointer.is_none() {
            source.pointer = Some(pointer.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_never_overwrites() {
        let mut error = ErrorObject::validation("NotBlank")
            .with_status_code(422)
            .with_title("custom title");

        error.fill_status_code(400);
        error.fill_title("not blank constraint");
        error.fill_code("not_blank");
        error.fill_detail("This value should not be blank.");

        assert_eq!(error.status_code(), Some(422));
        assert_eq!(error.title(), Some("custom title"));
        assert_eq!(error.code(), Some("not_blank"));
        assert!(error.is_complete());
    }

    #[test]
    fn test_fill_pointer_keeps_property_path() {
        let mut error = ErrorObject::validation("NotBlank").with_property_path("name");
        error.fill_pointer("/data/attributes/name");
        error.fill_pointer("/data/attributes/other");

        let source = error.source().unwrap();
        assert_eq!(source.property_path(), Some("name"));
        assert_eq!(source.pointer(), Some("/data/attributes/name"));
    }

    #[test]
    fn test_unexpected_by_cause_or_status() {
        assert!(ErrorObject::exception("boom").is_unexpected());
        assert!(!ErrorObject::validation("NotBlank").is_unexpected());
        assert!(!ErrorObject::business_rule("UniqueEmail").is_unexpected());
        assert!(ErrorObject::default().with_status_code(503).is_unexpected());
    }

    #[test]
    fn test_from_error_uses_display() {
        let io = std::io::Error::other("connection reset");
        let error = ErrorObject::from_error(&io);

        assert_eq!(
            error.cause(),
            Some(&ErrorCause::Exception {
                message: "connection reset".into()
            })
        );
    }

    #[test]
    fn test_serialization_skips_missing_fields() {
        let error = ErrorObject::validation("NotBlank").with_detail("missing");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["detail"], "missing");
        assert_eq!(json["cause"]["kind"], "validation");
        assert!(json.get("status_code").is_none());
        assert!(json.get("source").is_none());
    }
}
