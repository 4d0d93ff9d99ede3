//! FINALIZE processors and the rollback of batches that never reach FINALIZE.

use std::sync::Arc;

use super::TRACING_TARGET;
use crate::Result;
use crate::context::BatchContext;
use crate::processor::{BatchProcessor, ProcessorOutcome};
use crate::provider::Persistence;

/// Commits everything the batch staged during SAVE.
#[derive(Clone)]
pub struct FlushPersistence {
    persistence: Arc<dyn Persistence>,
}

impl FlushPersistence {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait::async_trait]
impl BatchProcessor for FlushPersistence {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let flushed = self.persistence.flush(context.operation_id()).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            operation_id = %context.operation_id(),
            flushed,
            "Flushed persistence"
        );

        Ok(ProcessorOutcome::Continue)
    }
}

/// Drops whatever the batch left staged in the persistence layer.
///
/// Runs during REPORT-ERRORS. After a successful flush nothing is pending and
/// the discard is a no-op; when an error or a retry skipped FINALIZE, or the
/// flush itself failed, the batch's registrations are dropped so no later
/// flush can commit them.
#[derive(Clone)]
pub struct DiscardPendingEntities {
    persistence: Arc<dyn Persistence>,
}

impl DiscardPendingEntities {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait::async_trait]
impl BatchProcessor for DiscardPendingEntities {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let discarded = self.persistence.discard(context.operation_id()).await?;

        if discarded > 0 {
            tracing::info!(
                target: TRACING_TARGET,
                operation_id = %context.operation_id(),
                discarded,
                retry = context.is_retry_again(),
                errors = context.errors().len(),
                "Discarded staged entities of an unfinished batch"
            );
        }

        Ok(ProcessorOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BatchRequest, ChunkDescriptor, ChunkFormat};
    use crate::item::Entity;
    use crate::mock::RecordingPersistence;
    use crate::provider::{InMemoryUnitOfWork, MemoryChunkStore};

    fn context() -> BatchContext {
        let request = BatchRequest::builder()
            .with_chunk(ChunkDescriptor::new("chunk", ChunkFormat::Json))
            .with_chunk_store(MemoryChunkStore::new())
            .build()
            .unwrap();
        BatchContext::new(request)
    }

    #[tokio::test]
    async fn test_flush_commits_registrations() {
        let persistence = RecordingPersistence::new();
        let mut ctx = context();
        let entity = Entity::new("user");
        persistence
            .register(ctx.operation_id(), &entity, true)
            .await
            .unwrap();

        let processor = FlushPersistence::new(Arc::new(persistence.clone()));
        let outcome = processor.process(&mut ctx).await.unwrap();

        assert_eq!(outcome, ProcessorOutcome::Continue);
        assert_eq!(persistence.flush_count(), 1);
        assert!(!persistence.is_new(&entity).await.unwrap());
    }

    #[tokio::test]
    async fn test_flush_failure_is_returned() {
        let persistence = RecordingPersistence::new().with_failing_flush();

        let processor = FlushPersistence::new(Arc::new(persistence.clone()));
        let error = processor.process(&mut context()).await.unwrap_err();

        assert_eq!(error.kind_str(), "persistence");
        assert_eq!(persistence.flush_count(), 0);
    }

    #[tokio::test]
    async fn test_discard_drops_only_this_batch() {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let mut failed = context();
        let other = context();
        uow.register(failed.operation_id(), &Entity::new("user"), true)
            .await
            .unwrap();
        let kept = Entity::new("user");
        uow.register(other.operation_id(), &kept, true).await.unwrap();

        DiscardPendingEntities::new(uow.clone())
            .process(&mut failed)
            .await
            .unwrap();
        assert_eq!(uow.pending_count().await, 1);

        uow.flush(other.operation_id()).await.unwrap();
        assert_eq!(uow.persisted().await, vec![kept]);
    }
}
