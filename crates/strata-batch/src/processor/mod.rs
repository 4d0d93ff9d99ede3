//! Stage processors and the chains running them.
//!
//! Every stage is backed by an explicit, ordered chain of processors injected
//! at construction. Batch-level stages run [`BatchProcessor`]s against the
//! whole [`BatchContext`]; TRANSFORM runs [`ItemProcessor`]s once per item.
//!
//! [`BatchContext`]: crate::context::BatchContext

pub mod builtin;
mod chain;
mod outcome;
mod stage;
mod stages;
mod traits;

pub use chain::{
    BatchChain, ChainReport, DEFAULT_GROUP, ItemChain, ProcessorChain, ProcessorFailure,
};
pub use outcome::ProcessorOutcome;
pub use stage::Stage;
pub use stages::StageProcessors;
pub use traits::{BatchProcessor, ItemProcessor};

/// Tracing target for processor execution.
pub(crate) const TRACING_TARGET: &str = "strata_batch::processor";
