use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// What the chain should do after a processor returns.
///
/// Skipping is distinct from failing: it lets a processor end a stage early,
/// e.g. after setting a retry reason, without fabricating an error.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessorOutcome {
    /// Run the next processor.
    #[default]
    Continue,
    /// Skip the remaining processors of the same group.
    SkipGroup,
    /// Skip every remaining processor of the stage.
    SkipStage,
}
