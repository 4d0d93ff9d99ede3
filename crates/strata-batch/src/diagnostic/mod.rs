//! Diagnostic error model.
//!
//! - [`ErrorObject`]: an error attached to a batch or an item
//! - [`ErrorCompleter`]: fills missing fields before errors are surfaced
//! - [`ErrorCompleterRegistry`]: resolves a completer by request type
//! - [`deduplicate`]: collapses duplicate errors

mod completer;
mod dedup;
mod error_object;
mod metadata;
mod registry;

pub use completer::{
    BUSINESS_RULE_STATUS_CODE, DefaultErrorCompleter, ErrorCompleter, JsonApiErrorCompleter,
    UNEXPECTED_ERROR_CODE, UNEXPECTED_STATUS_CODE, VALIDATION_STATUS_CODE,
};
pub use dedup::{deduplicate, deduplicate_in_place, fingerprint};
pub use error_object::{ErrorCause, ErrorObject, ErrorSource};
pub use metadata::{EntityMetadata, MetadataRegistry, MetadataResolver};
pub use registry::{ErrorCompleterRegistry, JSON_API_ASPECT};
