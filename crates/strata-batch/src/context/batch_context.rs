//! Mutable state of one batch invocation.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::request::RequestParts;
use super::{BatchRequest, ChunkDescriptor, OperationId, RequestType, SharedData};
use crate::BatchSummary;
use crate::diagnostic::ErrorObject;
use crate::item::{BatchItem, ItemStatus, Record};
use crate::provider::ChunkStore;

/// State threaded through every stage of one batch.
///
/// A context is created per invocation from a [`BatchRequest`] and owned by
/// that invocation alone. Batch-level errors live here; item-level errors live
/// in each item's own context.
pub struct BatchContext {
    version: String,
    request_type: RequestType,
    operation_id: OperationId,
    supported_entity_classes: Vec<String>,
    chunk: ChunkDescriptor,
    chunk_store: Arc<dyn ChunkStore>,

    data: Vec<Record>,
    items: Option<Vec<BatchItem>>,
    processed_item_statuses: Option<BTreeMap<usize, ItemStatus>>,

    errors: Vec<ErrorObject>,
    has_unexpected_errors: bool,
    retry_reason: Option<String>,

    summary: BatchSummary,
    shared_data: SharedData,
}

impl BatchContext {
    /// Creates the context for a request.
    pub fn new(request: BatchRequest) -> Self {
        let RequestParts {
            version,
            request_type,
            operation_id,
            supported_entity_classes,
            chunk,
            chunk_store,
        } = request.into_parts();

        Self {
            version,
            request_type,
            operation_id,
            supported_entity_classes,
            chunk,
            chunk_store,
            data: Vec::new(),
            items: None,
            processed_item_statuses: None,
            errors: Vec::new(),
            has_unexpected_errors: false,
            retry_reason: None,
            summary: BatchSummary::default(),
            shared_data: SharedData::default(),
        }
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline]
    pub fn request_type(&self) -> &RequestType {
        &self.request_type
    }

    #[inline]
    pub fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    #[inline]
    pub fn supported_entity_classes(&self) -> &[String] {
        &self.supported_entity_classes
    }

    /// Returns whether the batch may touch the entity class.
    pub fn is_supported_entity_class(&self, entity_class: &str) -> bool {
        is_supported(&self.supported_entity_classes, entity_class)
    }

    #[inline]
    pub fn chunk(&self) -> &ChunkDescriptor {
        &self.chunk
    }

    #[inline]
    pub fn chunk_store(&self) -> &Arc<dyn ChunkStore> {
        &self.chunk_store
    }

    /// Records decoded from the chunk, reported back as response data.
    #[inline]
    pub fn data(&self) -> &[Record] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<Record>) {
        self.data = data;
    }

    pub(crate) fn take_data(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.data)
    }

    #[inline]
    pub fn items(&self) -> Option<&[BatchItem]> {
        self.items.as_deref()
    }

    pub fn items_mut(&mut self) -> Option<&mut [BatchItem]> {
        self.items.as_deref_mut()
    }

    pub fn set_items(&mut self, items: Vec<BatchItem>) {
        self.items = Some(items);
    }

    /// Takes the items out of the context, leaving none behind.
    pub fn take_items(&mut self) -> Option<Vec<BatchItem>> {
        self.items.take()
    }

    #[inline]
    pub fn processed_item_statuses(&self) -> Option<&BTreeMap<usize, ItemStatus>> {
        self.processed_item_statuses.as_ref()
    }

    pub fn set_processed_item_status(&mut self, index: usize, status: ItemStatus) {
        self.processed_item_statuses
            .get_or_insert_with(BTreeMap::new)
            .insert(index, status);
    }

    pub fn clear_processed_item_statuses(&mut self) {
        self.processed_item_statuses = None;
    }

    /// Batch-level errors.
    #[inline]
    pub fn errors(&self) -> &[ErrorObject] {
        &self.errors
    }

    /// Mutable access to batch-level errors.
    ///
    /// Rewriting the batch error list is reserved to REPORT-ERRORS processors.
    #[inline]
    pub fn errors_mut(&mut self) -> &mut Vec<ErrorObject> {
        &mut self.errors
    }

    pub fn add_error(&mut self, error: ErrorObject) {
        self.errors.push(error);
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[inline]
    pub fn has_unexpected_errors(&self) -> bool {
        self.has_unexpected_errors
    }

    pub fn set_has_unexpected_errors(&mut self, value: bool) {
        self.has_unexpected_errors = value;
    }

    #[inline]
    pub fn retry_reason(&self) -> Option<&str> {
        self.retry_reason.as_deref()
    }

    /// Asks the caller to resubmit the batch later.
    pub fn set_retry_reason(&mut self, reason: impl Into<String>) {
        self.retry_reason = Some(reason.into());
    }

    pub fn clear_retry_reason(&mut self) {
        self.retry_reason = None;
    }

    #[inline]
    pub fn is_retry_again(&self) -> bool {
        self.retry_reason.is_some()
    }

    /// Returns whether the remaining stages must be skipped.
    #[inline]
    pub fn should_short_circuit(&self) -> bool {
        self.has_errors() || self.is_retry_again()
    }

    #[inline]
    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    #[inline]
    pub fn summary_mut(&mut self) -> &mut BatchSummary {
        &mut self.summary
    }

    #[inline]
    pub fn shared_data(&self) -> &SharedData {
        &self.shared_data
    }

    #[inline]
    pub fn shared_data_mut(&mut self) -> &mut SharedData {
        &mut self.shared_data
    }

    /// Read-only view handed to item processors.
    pub fn item_scope(&self) -> ItemScope<'_> {
        ItemScope {
            operation_id: self.operation_id,
            request_type: &self.request_type,
            supported_entity_classes: &self.supported_entity_classes,
            shared_data: &self.shared_data,
        }
    }
}

impl std::fmt::Debug for BatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchContext")
            .field("operation_id", &self.operation_id)
            .field("request_type", &self.request_type)
            .field("chunk", &self.chunk)
            .field("items", &self.items.as_ref().map(Vec::len))
            .field("errors", &self.errors.len())
            .field("retry_reason", &self.retry_reason)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// Batch-level information visible to item processors.
///
/// Item processors only get shared references, so items processed
/// concurrently cannot write to batch state.
#[derive(Debug, Clone, Copy)]
pub struct ItemScope<'a> {
    operation_id: OperationId,
    request_type: &'a RequestType,
    supported_entity_classes: &'a [String],
    shared_data: &'a SharedData,
}

impl ItemScope<'_> {
    #[inline]
    pub fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    #[inline]
    pub fn request_type(&self) -> &RequestType {
        self.request_type
    }

    #[inline]
    pub fn supported_entity_classes(&self) -> &[String] {
        self.supported_entity_classes
    }

    /// Returns whether the batch may touch the entity class.
    pub fn is_supported_entity_class(&self, entity_class: &str) -> bool {
        is_supported(self.supported_entity_classes, entity_class)
    }

    #[inline]
    pub fn shared_data(&self) -> &SharedData {
        self.shared_data
    }
}

fn is_supported(supported: &[String], entity_class: &str) -> bool {
    supported.is_empty() || supported.iter().any(|class| class == entity_class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ChunkFormat, SharedKey};
    use crate::provider::MemoryChunkStore;

    fn context(classes: &[&str]) -> BatchContext {
        let request = BatchRequest::builder()
            .with_chunk(ChunkDescriptor::new("chunk", ChunkFormat::Json))
            .with_chunk_store(MemoryChunkStore::new())
            .with_supported_entity_classes(
                classes.iter().map(|c| (*c).to_owned()).collect::<Vec<_>>(),
            )
            .build()
            .unwrap();
        BatchContext::new(request)
    }

    #[test]
    fn test_fresh_context_is_empty() {
        let ctx = context(&[]);

        assert!(ctx.items().is_none());
        assert!(ctx.processed_item_statuses().is_none());
        assert!(!ctx.has_errors());
        assert!(!ctx.is_retry_again());
        assert!(!ctx.should_short_circuit());
        assert_eq!(ctx.summary(), &BatchSummary::default());
    }

    #[test]
    fn test_retry_reason_short_circuits_without_errors() {
        let mut ctx = context(&[]);
        ctx.set_retry_reason("lock timeout");

        assert!(ctx.should_short_circuit());
        assert!(!ctx.has_errors());
        assert_eq!(ctx.retry_reason(), Some("lock timeout"));

        ctx.clear_retry_reason();
        assert!(!ctx.is_retry_again());
    }

    #[test]
    fn test_empty_class_list_means_unrestricted() {
        assert!(context(&[]).is_supported_entity_class("anything"));

        let ctx = context(&["user"]);
        assert!(ctx.is_supported_entity_class("user"));
        assert!(!ctx.item_scope().is_supported_entity_class("order"));
    }

    #[test]
    fn test_statuses_are_created_on_first_write() {
        let mut ctx = context(&[]);
        ctx.set_processed_item_status(1, ItemStatus::HasErrors);
        ctx.set_processed_item_status(0, ItemStatus::NoErrors);

        let statuses: Vec<_> = ctx.processed_item_statuses().unwrap().iter().collect();
        assert_eq!(
            statuses,
            vec![(&0, &ItemStatus::NoErrors), (&1, &ItemStatus::HasErrors)]
        );

        ctx.clear_processed_item_statuses();
        assert!(ctx.processed_item_statuses().is_none());
    }

    #[test]
    fn test_shared_data_is_visible_to_item_scope() {
        const SEEN: SharedKey<usize> = SharedKey::new("seen");

        let mut ctx = context(&[]);
        ctx.shared_data_mut().insert(&SEEN, 2);
        if let Some(seen) = ctx.shared_data_mut().get_mut(&SEEN) {
            *seen += 1;
        }

        assert_eq!(ctx.item_scope().shared_data().get(&SEEN), Some(&3));
    }
}
