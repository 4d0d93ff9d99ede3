//! Stage sequencing.

mod config;
mod sequencer;
mod state;

pub use config::{
    DEFAULT_MAX_BATCH_ITEMS, DEFAULT_MAX_CONCURRENT_BATCHES, DEFAULT_TRANSFORM_CONCURRENCY,
    PipelineConfig, PipelineConfigBuilder, PipelineConfigBuilderError,
};
pub use sequencer::{CANCELLED_RETRY_REASON, StageSequencer};
pub use state::PipelineState;

/// Tracing target for stage sequencing.
pub(crate) const TRACING_TARGET: &str = "strata_batch::pipeline";
