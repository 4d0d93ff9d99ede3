//! Mock processors and collaborators for testing.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! strata-batch = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_batch::mock::{FnBatchProcessor, StageRecorder};
//! use strata_batch::processor::{BatchChain, ProcessorOutcome, Stage, StageProcessors};
//!
//! let recorder = StageRecorder::new();
//! let processors = StageProcessors::new()
//!     .with_initialize(BatchChain::new().with(FnBatchProcessor::new("retry", |ctx| {
//!         ctx.set_retry_reason("locked");
//!         Ok(ProcessorOutcome::SkipStage)
//!     })))
//!     .with_report_errors(BatchChain::new().with(recorder.batch(Stage::ReportErrors)));
//! ```

mod persistence;
mod processor;

pub use persistence::{RecordingPersistence, Registration};
pub use processor::{
    FnBatchProcessor, FnItemProcessor, RecordingItemProcessor, RecordingProcessor, StageRecorder,
};
