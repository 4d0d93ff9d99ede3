use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

/// Outcome of one item, recorded by the SAVE stage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    IntoStaticStr
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// The item was saved without errors.
    NoErrors,
    /// The item carries errors and was not saved.
    HasErrors,
}

impl ItemStatus {
    /// Returns whether the item belongs to the success portion of the batch.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::NoErrors)
    }
}
