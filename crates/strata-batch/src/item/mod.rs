//! Batch items.
//!
//! A [`BatchItem`] is created for every decoded record during INITIALIZE,
//! transformed in isolation during TRANSFORM and read by SAVE.

mod batch_item;
mod entity;
mod status;

pub use batch_item::{BatchItem, ItemContext, TargetContext};
pub use entity::{Entity, IncludedEntities, IncludedEntity};
pub use status::ItemStatus;

/// A decoded input record: one JSON object.
pub type Record = serde_json::Map<String, serde_json::Value>;
