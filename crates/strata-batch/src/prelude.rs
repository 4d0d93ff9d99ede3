//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use strata_batch::prelude::*;
//! ```

pub use crate::context::{
    BatchContext, BatchRequest, ChunkDescriptor, ChunkFormat, ItemScope, OperationId, RequestType,
};
pub use crate::diagnostic::{
    EntityMetadata, ErrorCompleter, ErrorCompleterRegistry, ErrorObject, MetadataRegistry,
    MetadataResolver,
};
pub use crate::handler::{BatchResponse, BatchUpdateHandler};
pub use crate::item::{BatchItem, Entity, ItemStatus, Record};
pub use crate::pipeline::{PipelineConfig, StageSequencer};
pub use crate::processor::{
    BatchChain, BatchProcessor, ItemChain, ItemProcessor, ProcessorOutcome, Stage, StageProcessors,
};
pub use crate::provider::{
    ChunkStore, FsChunkStore, InMemoryUnitOfWork, MemoryChunkStore, Persistence,
};
pub use crate::{BatchError, BatchSummary, Result};
