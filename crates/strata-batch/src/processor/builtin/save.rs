//! SAVE processors.
//!
//! Only items without errors reach the persistence layer. Counters follow one
//! convention: every registered target entity counts as a write, and as a
//! create or an update depending on whether the persistence layer knew it
//! before registration. Related entities are not counted.

use std::sync::Arc;

use super::TRACING_TARGET;
use crate::Result;
use crate::context::BatchContext;
use crate::item::ItemStatus;
use crate::processor::{BatchProcessor, ProcessorOutcome};
use crate::provider::Persistence;

/// Registers the new related entities of every error-free item.
///
/// Additional entities are registered unless already persisted; included
/// entities only when they were flagged as new.
#[derive(Clone)]
pub struct StageRelatedEntities {
    persistence: Arc<dyn Persistence>,
}

impl StageRelatedEntities {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait::async_trait]
impl BatchProcessor for StageRelatedEntities {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let operation_id = context.operation_id();
        let Some(items) = context.items() else {
            return Ok(ProcessorOutcome::Continue);
        };

        let mut registered = 0usize;
        for item in items.iter().filter(|item| !item.has_errors()) {
            let target = item.context().target();

            for entity in target.additional_entities() {
                if self.persistence.is_new(entity).await? {
                    self.persistence.register(operation_id, entity, true).await?;
                    registered += 1;
                }
            }

            if let Some(included) = target.included() {
                for entity in included.new_entities() {
                    self.persistence.register(operation_id, entity, true).await?;
                    registered += 1;
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET,
            operation_id = %context.operation_id(),
            registered,
            "Staged related entities"
        );

        Ok(ProcessorOutcome::Continue)
    }
}

/// Registers the target entity of every error-free item and records item statuses.
#[derive(Clone)]
pub struct SaveItems {
    persistence: Arc<dyn Persistence>,
}

impl SaveItems {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait::async_trait]
impl BatchProcessor for SaveItems {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let operation_id = context.operation_id();
        let Some(items) = context.items() else {
            return Ok(ProcessorOutcome::Continue);
        };

        let mut statuses = Vec::with_capacity(items.len());
        let (mut created, mut updated) = (0u64, 0u64);

        for item in items {
            if item.has_errors() {
                statuses.push((item.index(), ItemStatus::HasErrors));
                continue;
            }

            if let Some(entity) = item.context().target().entity() {
                let is_new = self.persistence.is_new(entity).await?;
                self.persistence.register(operation_id, entity, is_new).await?;
                if is_new {
                    created += 1;
                } else {
                    updated += 1;
                }
            }

            statuses.push((item.index(), ItemStatus::NoErrors));
        }

        for (index, status) in statuses {
            context.set_processed_item_status(index, status);
        }

        let summary = context.summary_mut();
        summary.increment_write_count(created + updated);
        summary.increment_create_count(created);
        summary.increment_update_count(updated);

        tracing::debug!(
            target: TRACING_TARGET,
            operation_id = %context.operation_id(),
            created,
            updated,
            "Saved items"
        );

        Ok(ProcessorOutcome::Continue)
    }
}
