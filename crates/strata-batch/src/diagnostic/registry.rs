//! Resolution of error completers by request type.

use std::fmt;
use std::sync::Arc;

use super::{DefaultErrorCompleter, ErrorCompleter, JsonApiErrorCompleter};
use crate::context::RequestType;

/// Aspect that selects the JSON:API completer in [`ErrorCompleterRegistry::standard`].
pub const JSON_API_ASPECT: &str = "json_api";

/// Registry of error completers keyed by request type aspect.
///
/// Completers are tried in registration order; the first one whose aspect the
/// request type contains wins. Request types matching nothing are completed by
/// the fallback completer.
#[derive(Clone)]
pub struct ErrorCompleterRegistry {
    entries: Vec<(String, Arc<dyn ErrorCompleter>)>,
    fallback: Arc<dyn ErrorCompleter>,
}

impl ErrorCompleterRegistry {
    /// Creates a registry that completes everything with [`DefaultErrorCompleter`].
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fallback: Arc::new(DefaultErrorCompleter),
        }
    }

    /// Creates a registry with the JSON:API completer registered for `json_api`.
    pub fn standard() -> Self {
        Self::new().with_completer(JSON_API_ASPECT, JsonApiErrorCompleter::new())
    }

    /// Registers a completer for request types containing `aspect`.
    pub fn with_completer(
        mut self,
        aspect: impl Into<String>,
        completer: impl ErrorCompleter + 'static,
    ) -> Self {
        self.entries.push((aspect.into(), Arc::new(completer)));
        self
    }

    /// Replaces the fallback completer.
    pub fn with_fallback(mut self, completer: impl ErrorCompleter + 'static) -> Self {
        self.fallback = Arc::new(completer);
        self
    }

    /// Returns the completer for the given request type.
    pub fn resolve(&self, request_type: &RequestType) -> Arc<dyn ErrorCompleter> {
        self.entries
            .iter()
            .find(|(aspect, _)| request_type.contains(aspect))
            .map(|(_, completer)| Arc::clone(completer))
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl Default for ErrorCompleterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorCompleterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCompleterRegistry")
            .field(
                "aspects",
                &self.entries.iter().map(|(aspect, _)| aspect).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
