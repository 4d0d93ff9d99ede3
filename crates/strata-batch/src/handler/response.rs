//! Batch responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Timing;
use crate::BatchSummary;
use crate::context::{BatchContext, OperationId};
use crate::diagnostic::ErrorObject;
use crate::item::{ItemStatus, Record};

/// Snapshot of a batch context after the sequencer is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub operation_id: OperationId,
    /// At least one surfaced error was not an anticipated validation or
    /// business outcome, or the batch itself failed.
    pub has_unexpected_errors: bool,
    /// The batch must be resubmitted unchanged; true iff a retry reason is set.
    pub is_retry_again: bool,
    pub retry_reason: Option<String>,
    /// Records decoded during INITIALIZE.
    pub data: Vec<Record>,
    /// Item outcomes, absent until SAVE and whenever batch-level errors remain.
    pub processed_item_statuses: Option<BTreeMap<usize, ItemStatus>>,
    pub summary: BatchSummary,
    /// Completed batch-level errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
    /// Completed item errors keyed by item index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub item_errors: BTreeMap<usize, Vec<ErrorObject>>,
    pub timing: Timing,
}

impl BatchResponse {
    /// Builds the response from a context that reached the done state.
    pub fn from_context(mut context: BatchContext, timing: Timing) -> Self {
        let has_batch_errors = context.has_errors();

        let item_errors = context
            .items()
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.has_errors())
                    .map(|item| (item.index(), item.context().errors().to_vec()))
                    .collect()
            })
            .unwrap_or_default();

        let processed_item_statuses = if has_batch_errors {
            None
        } else {
            context.processed_item_statuses().cloned()
        };

        Self {
            operation_id: context.operation_id(),
            has_unexpected_errors: context.has_unexpected_errors() || has_batch_errors,
            is_retry_again: context.is_retry_again(),
            retry_reason: context.retry_reason().map(str::to_owned),
            data: context.take_data(),
            processed_item_statuses,
            summary: *context.summary(),
            errors: std::mem::take(context.errors_mut()),
            item_errors,
            timing,
        }
    }

    /// Whether the batch completed, possibly with item errors.
    pub fn is_completed(&self) -> bool {
        !self.is_retry_again && !self.has_unexpected_errors
    }

    /// Status of one item, if recorded.
    pub fn item_status(&self, index: usize) -> Option<ItemStatus> {
        self.processed_item_statuses
            .as_ref()
            .and_then(|statuses| statuses.get(&index).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BatchRequest, ChunkDescriptor, ChunkFormat};
    use crate::item::BatchItem;
    use crate::provider::MemoryChunkStore;

    fn context() -> BatchContext {
        let request = BatchRequest::builder()
            .with_chunk(ChunkDescriptor::new("chunk", ChunkFormat::Json))
            .with_chunk_store(MemoryChunkStore::new())
            .build()
            .unwrap();
        BatchContext::new(request)
    }

    #[test]
    fn test_batch_errors_hide_item_statuses() {
        let mut ctx = context();
        ctx.set_processed_item_status(0, ItemStatus::NoErrors);
        ctx.add_error(ErrorObject::validation("NotBlank"));

        let response = BatchResponse::from_context(ctx, Timing::since(jiff::Timestamp::now()));

        assert!(response.processed_item_statuses.is_none());
        assert!(response.has_unexpected_errors);
        assert_eq!(response.errors.len(), 1);
        assert!(!response.is_completed());
    }

    #[test]
    fn test_item_errors_are_keyed_by_index() {
        let mut ctx = context();
        let mut failed = BatchItem::new(1, Record::new());
        failed.add_error(ErrorObject::validation("NotBlank"));
        ctx.set_items(vec![BatchItem::new(0, Record::new()), failed]);
        ctx.set_processed_item_status(0, ItemStatus::NoErrors);
        ctx.set_processed_item_status(1, ItemStatus::HasErrors);

        let response = BatchResponse::from_context(ctx, Timing::since(jiff::Timestamp::now()));

        assert_eq!(response.item_errors.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(response.item_status(0), Some(ItemStatus::NoErrors));
        assert_eq!(response.item_status(1), Some(ItemStatus::HasErrors));
        assert!(response.is_completed());
    }

    #[test]
    fn test_retry_reason_is_reported() {
        let mut ctx = context();
        ctx.set_retry_reason("lock timeout");

        let response = BatchResponse::from_context(ctx, Timing::since(jiff::Timestamp::now()));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["is_retry_again"], true);
        assert_eq!(json["retry_reason"], "lock timeout");
        assert!(json.get("errors").is_none());
    }
}
