//! Batch operation context and inbound request types.

mod batch_context;
mod request;
mod shared_data;

pub use batch_context::{BatchContext, ItemScope};
pub use request::{
    BatchRequest, BatchRequestBuilder, BatchRequestBuilderError, ChunkDescriptor, ChunkFormat,
    OperationId, RequestType,
};
pub use shared_data::{SharedData, SharedKey};
