use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::processor::Stage;

/// States of the stage sequencer, in the order they can be visited.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineState {
    Initializing,
    TransformingItems,
    SavingData,
    Finalizing,
    ReportingErrors,
    Done,
}

impl PipelineState {
    /// Stage run while in this state.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Initializing => Some(Stage::Initialize),
            Self::TransformingItems => Some(Stage::Transform),
            Self::SavingData => Some(Stage::Save),
            Self::Finalizing => Some(Stage::Finalize),
            Self::ReportingErrors => Some(Stage::ReportErrors),
            Self::Done => None,
        }
    }

    /// State in which the stage runs.
    pub fn from_stage(stage: Stage) -> Self {
        match stage {
            Stage::Initialize => Self::Initializing,
            Stage::Transform => Self::TransformingItems,
            Stage::Save => Self::SavingData,
            Stage::Finalize => Self::Finalizing,
            Stage::ReportErrors => Self::ReportingErrors,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}
