//! Pipeline stages.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// A named phase of the pipeline, backed by an ordered processor chain.
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
    IntoStaticStr,
    EnumIter,
    EnumString
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Reads the chunk and creates the batch items.
    Initialize,
    /// Processes every item in its own isolated context.
    Transform,
    /// Stages the results of error-free items for persistence.
    Save,
    /// Commits the batch.
    Finalize,
    /// Completes, deduplicates and collects errors. Always runs.
    ReportErrors,
}

impl Stage {
    /// Returns whether a failing processor lets the rest of the chain run.
    ///
    /// Error reporting must always complete, so its chain keeps going.
    #[inline]
    pub fn tolerates_failures(&self) -> bool {
        matches!(self, Self::ReportErrors)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_stages_iterate_in_pipeline_order() {
        let names: Vec<_> = Stage::iter().map(|stage| stage.to_string()).collect();
        assert_eq!(
            names,
            ["initialize", "transform", "save", "finalize", "report_errors"]
        );
    }

    #[test]
    fn test_only_reporting_tolerates_failures() {
        assert!(Stage::ReportErrors.tolerates_failures());
        assert!(!Stage::Transform.tolerates_failures());
        assert!(!Stage::Initialize.tolerates_failures());
    }
}
