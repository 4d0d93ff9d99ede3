//! Persistence layer contract.

use crate::Result;
use crate::context::OperationId;
use crate::item::Entity;

/// Unit of work the pipeline stages entities with.
///
/// Registrations are scoped to the operation that made them: nothing becomes
/// durable before [`flush`](Persistence::flush) for that operation, and
/// [`discard`](Persistence::discard) drops them without side effects. A flush
/// or discard never touches the registrations of another operation. The
/// pipeline never calls this trait for an item that carries errors.
#[async_trait::async_trait]
pub trait Persistence: Send + Sync {
    /// Stages the entity for the operation, as a new entity when `as_new` is set.
    async fn register(&self, operation_id: OperationId, entity: &Entity, as_new: bool)
    -> Result<()>;

    /// Returns whether the entity is not known to the persistence layer yet.
    async fn is_new(&self, entity: &Entity) -> Result<bool>;

    /// Commits every entity staged by the operation, returning how many were written.
    async fn flush(&self, operation_id: OperationId) -> Result<usize>;

    /// Drops every entity staged by the operation, returning how many were dropped.
    async fn discard(&self, operation_id: OperationId) -> Result<usize>;
}
