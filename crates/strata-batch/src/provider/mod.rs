//! Collaborators the pipeline reads chunks from and stages entities with.

mod chunk_store;
mod persistence;
mod unit_of_work;

pub use chunk_store::{ChunkStore, FsChunkStore, MemoryChunkStore};
pub use persistence::Persistence;
pub use unit_of_work::InMemoryUnitOfWork;

/// Tracing target for provider operations.
pub(crate) const TRACING_TARGET: &str = "strata_batch::provider";
