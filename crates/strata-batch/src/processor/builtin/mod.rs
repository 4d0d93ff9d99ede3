//! Standard processors for every stage.
//!
//! [`StageProcessors::standard`] wires them into a complete pipeline:
//!
//! | stage         | processors                                            |
//! |---------------|-------------------------------------------------------|
//! | INITIALIZE    | [`LoadChunkData`], [`CreateBatchItems`]               |
//! | TRANSFORM     | [`CheckEntityClass`], [`BuildTargetEntity`]           |
//! | SAVE          | [`StageRelatedEntities`], [`SaveItems`]               |
//! | FINALIZE      | [`FlushPersistence`]                                  |
//! | REPORT-ERRORS | [`DiscardPendingEntities`], [`CompleteErrors`], [`DeduplicateErrors`], [`CollectErrors`] |

use std::sync::Arc;

mod finalize;
mod initialize;
mod report;
mod save;
mod transform;

pub use finalize::{DiscardPendingEntities, FlushPersistence};
pub use initialize::{CreateBatchItems, LoadChunkData};
pub use report::{CollectErrors, CompleteErrors, DeduplicateErrors};
pub use save::{SaveItems, StageRelatedEntities};
pub use transform::{
    ADDITIONAL_FIELD, ATTRIBUTES_FIELD, BuildTargetEntity, CheckEntityClass, ID_FIELD,
    INCLUDED_FIELD, TYPE_FIELD,
};

use super::{BatchChain, ItemChain, StageProcessors};
use crate::diagnostic::{ErrorCompleterRegistry, MetadataResolver};
use crate::pipeline::PipelineConfig;
use crate::provider::Persistence;

/// Tracing target for the standard processors.
const TRACING_TARGET: &str = "strata_batch::processor::builtin";

impl StageProcessors {
    /// Chains of the standard processors.
    pub fn standard(
        persistence: Arc<dyn Persistence>,
        metadata: Arc<dyn MetadataResolver>,
        completers: ErrorCompleterRegistry,
        config: &PipelineConfig,
    ) -> Self {
        Self::new()
            .with_initialize(
                BatchChain::new()
                    .with_grouped("chunk", LoadChunkData::new(config.max_batch_items))
                    .with_grouped("chunk", CreateBatchItems),
            )
            .with_transform(
                ItemChain::new()
                    .with_grouped("entity", CheckEntityClass)
                    .with_grouped("entity", BuildTargetEntity::new(Arc::clone(&persistence))),
            )
            .with_save(
                BatchChain::new()
                    .with_grouped("persistence", StageRelatedEntities::new(Arc::clone(&persistence)))
                    .with_grouped("persistence", SaveItems::new(Arc::clone(&persistence))),
            )
            .with_finalize(
                BatchChain::new()
                    .with_grouped("persistence", FlushPersistence::new(Arc::clone(&persistence))),
            )
            .with_report_errors(
                BatchChain::new()
                    .with_grouped("persistence", DiscardPendingEntities::new(persistence))
                    .with_grouped("diagnostics", CompleteErrors::new(completers, metadata))
                    .with_grouped("diagnostics", DeduplicateErrors)
                    .with_grouped("diagnostics", CollectErrors),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::MetadataRegistry;
    use crate::mock::RecordingPersistence;
    use crate::processor::Stage;

    #[test]
    fn test_standard_chains_are_ordered() {
        let processors = StageProcessors::standard(
            Arc::new(RecordingPersistence::new()),
            Arc::new(MetadataRegistry::new()),
            ErrorCompleterRegistry::standard(),
            &PipelineConfig::default(),
        );

        let initialize = processors.batch_chain(Stage::Initialize).unwrap();
        assert_eq!(initialize.names(), vec!["LoadChunkData", "CreateBatchItems"]);
        assert_eq!(
            processors.item_chain().names(),
            vec!["CheckEntityClass", "BuildTargetEntity"]
        );
        let report = processors.batch_chain(Stage::ReportErrors).unwrap();
        assert_eq!(
            report.names(),
            vec![
                "DiscardPendingEntities",
                "CompleteErrors",
                "DeduplicateErrors",
                "CollectErrors"
            ]
        );
        assert_eq!(
            processors.batch_chain(Stage::Finalize).unwrap().names(),
            vec!["FlushPersistence"]
        );
    }
}
