//! REPORT-ERRORS processors.

use std::sync::Arc;

use super::TRACING_TARGET;
use crate::Result;
use crate::context::BatchContext;
use crate::diagnostic::{ErrorCompleterRegistry, MetadataResolver};
use crate::processor::{BatchProcessor, ProcessorOutcome};

/// Completes batch and item errors with the completer of the request type.
///
/// Item errors additionally get the metadata of the item's entity class, when
/// it resolves.
#[derive(Clone)]
pub struct CompleteErrors {
    completers: Arc<ErrorCompleterRegistry>,
    metadata: Arc<dyn MetadataResolver>,
}

impl CompleteErrors {
    pub fn new(
        completers: impl Into<Arc<ErrorCompleterRegistry>>,
        metadata: Arc<dyn MetadataResolver>,
    ) -> Self {
        Self {
            completers: completers.into(),
            metadata,
        }
    }
}

#[async_trait::async_trait]
impl BatchProcessor for CompleteErrors {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let request_type = context.request_type().clone();
        let completer = self.completers.resolve(&request_type);

        for error in context.errors_mut().iter_mut() {
            completer.complete(error, &request_type, None);
        }

        let Some(items) = context.items_mut() else {
            return Ok(ProcessorOutcome::Continue);
        };

        for item in items.iter_mut().filter(|item| item.has_errors()) {
            let metadata = item
                .context()
                .target()
                .entity_class()
                .and_then(|class| self.metadata.resolve(class));

            for error in item.context_mut().errors_mut() {
                completer.complete(error, &request_type, metadata.as_ref());
            }
        }

        Ok(ProcessorOutcome::Continue)
    }
}

/// Collapses duplicate errors on every item and on the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeduplicateErrors;

#[async_trait::async_trait]
impl BatchProcessor for DeduplicateErrors {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let mut removed = crate::diagnostic::deduplicate_in_place(context.errors_mut());

        if let Some(items) = context.items_mut() {
            for item in items.iter_mut() {
                removed += item.context_mut().deduplicate_errors();
            }
        }

        if removed > 0 {
            tracing::debug!(
                target: TRACING_TARGET,
                operation_id = %context.operation_id(),
                removed,
                "Removed duplicate errors"
            );
        }

        Ok(ProcessorOutcome::Continue)
    }
}

/// Counts surfaced errors and flags unexpected ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectErrors;

#[async_trait::async_trait]
impl BatchProcessor for CollectErrors {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let item_errors = context
            .items()
            .unwrap_or_default()
            .iter()
            .flat_map(|item| item.context().errors());
        let all_errors: Vec<_> = context.errors().iter().chain(item_errors).collect();

        let count = all_errors.len() as u64;
        let unexpected = all_errors.iter().any(|error| error.is_unexpected());

        if unexpected {
            context.set_has_unexpected_errors(true);
        }
        context.summary_mut().increment_error_count(count);

        if count > 0 {
            tracing::info!(
                target: TRACING_TARGET,
                operation_id = %context.operation_id(),
                errors = count,
                unexpected,
                "Collected batch errors"
            );
        }

        Ok(ProcessorOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BatchRequest, ChunkDescriptor, ChunkFormat, RequestType};
    use crate::diagnostic::{EntityMetadata, ErrorObject, MetadataRegistry};
    use crate::item::{BatchItem, Record};
    use crate::provider::MemoryChunkStore;

    fn context(request_type: RequestType, items: Vec<BatchItem>) -> BatchContext {
        let request = BatchRequest::builder()
            .with_request_type(request_type)
            .with_chunk(ChunkDescriptor::new("chunk", ChunkFormat::Json))
            .with_chunk_store(MemoryChunkStore::new())
            .build()
            .unwrap();
        let mut ctx = BatchContext::new(request);
        ctx.set_items(items);
        ctx
    }

    fn user_item(index: usize, errors: Vec<ErrorObject>) -> BatchItem {
        let mut item = BatchItem::new(index, Record::new());
        item.context_mut().target_mut().set_entity_class("user");
        for error in errors {
            item.add_error(error);
        }
        item
    }

    #[tokio::test]
    async fn test_completes_item_errors_with_metadata() {
        let metadata = MetadataRegistry::new()
            .with_metadata(EntityMetadata::new("user").with_field("email"));
        let processor = CompleteErrors::new(ErrorCompleterRegistry::standard(), Arc::new(metadata));
        let error = ErrorObject::validation("NotBlank").with_property_path("email");
        let mut ctx = context(
            RequestType::new(["rest", "json_api"]),
            vec![user_item(0, vec![error])],
        );
        ctx.add_error(ErrorObject::exception("lock wait timeout"));

        processor.process(&mut ctx).await.unwrap();

        let item_error = &ctx.items().unwrap()[0].context().errors()[0];
        assert!(item_error.is_complete());
        assert_eq!(
            item_error.source().unwrap().pointer(),
            Some("/data/attributes/email")
        );
        assert_eq!(ctx.errors()[0].status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_unknown_metadata_still_completes() {
        let processor = CompleteErrors::new(
            ErrorCompleterRegistry::standard(),
            Arc::new(MetadataRegistry::new()),
        );
        let error = ErrorObject::validation("NotBlank").with_property_path("email");
        let mut ctx = context(
            RequestType::new(["json_api"]),
            vec![user_item(0, vec![error])],
        );

        processor.process(&mut ctx).await.unwrap();

        let item_error = &ctx.items().unwrap()[0].context().errors()[0];
        assert!(item_error.is_complete());
        assert_eq!(item_error.source().unwrap().pointer(), None);
    }

    #[tokio::test]
    async fn test_collect_counts_surfaced_errors_after_dedup() {
        let duplicate = ErrorObject::validation("NotBlank").with_property_path("email");
        let mut ctx = context(
            RequestType::default(),
            vec![
                user_item(0, vec![duplicate.clone(), duplicate]),
                user_item(1, vec![]),
            ],
        );

        DeduplicateErrors.process(&mut ctx).await.unwrap();
        CollectErrors.process(&mut ctx).await.unwrap();

        assert_eq!(ctx.summary().error_count(), 1);
        assert!(!ctx.has_unexpected_errors());
    }

    #[tokio::test]
    async fn test_deduplicates_batch_and_item_errors() {
        let timeout = ErrorObject::exception("lock wait timeout");
        let blank = ErrorObject::validation("NotBlank");
        let mut ctx = context(
            RequestType::default(),
            vec![user_item(0, vec![blank.clone(), blank.clone()])],
        );
        ctx.add_error(timeout.clone());
        ctx.add_error(timeout);

        DeduplicateErrors.process(&mut ctx).await.unwrap();

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.items().unwrap()[0].context().errors(), &[blank]);
    }

    #[tokio::test]
    async fn test_collect_flags_exceptions_as_unexpected() {
        let mut ctx = context(
            RequestType::default(),
            vec![user_item(0, vec![ErrorObject::exception("connection reset")])],
        );

        CollectErrors.process(&mut ctx).await.unwrap();

        assert!(ctx.has_unexpected_errors());
        assert_eq!(ctx.summary().error_count(), 1);
    }
}
