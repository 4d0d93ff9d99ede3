//! Batch update handler and its response.

mod response;
mod timing;
mod update;

pub use response::BatchResponse;
pub use timing::Timing;
pub use update::{BatchUpdateHandler, SHUTDOWN_RETRY_REASON};

/// Tracing target for batch handling.
pub(crate) const TRACING_TARGET: &str = "strata_batch::handler";
