use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::context::OperationId;
use crate::item::Entity;
use crate::provider::Persistence;
use crate::{BatchError, Result};

/// One call to [`Persistence::register`].
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub operation_id: OperationId,
    pub entity: Entity,
    pub as_new: bool,
}

#[derive(Debug, Default)]
struct State {
    existing: HashSet<Uuid>,
    registrations: Vec<Registration>,
    flushes: usize,
    discarded: Vec<OperationId>,
}

/// Persistence double recording every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingPersistence {
    state: Arc<Mutex<State>>,
    fail_flush: bool,
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an entity identifier as already persisted.
    pub fn with_existing(self, id: Uuid) -> Self {
        self.lock().existing.insert(id);
        self
    }

    /// Makes every flush fail.
    pub fn with_failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.lock().registrations.clone()
    }

    /// Whether any registration concerned the entity.
    pub fn is_registered(&self, id: Uuid) -> bool {
        self.lock()
            .registrations
            .iter()
            .any(|registration| registration.entity.id() == id)
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    /// Operations whose registrations were discarded, in call order.
    pub fn discarded(&self) -> Vec<OperationId> {
        self.lock().discarded.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Persistence for RecordingPersistence {
    async fn register(
        &self,
        operation_id: OperationId,
        entity: &Entity,
        as_new: bool,
    ) -> Result<()> {
        self.lock().registrations.push(Registration {
            operation_id,
            entity: entity.clone(),
            as_new,
        });
        Ok(())
    }

    async fn is_new(&self, entity: &Entity) -> Result<bool> {
        Ok(!self.lock().existing.contains(&entity.id()))
    }

    async fn flush(&self, operation_id: OperationId) -> Result<usize> {
        if self.fail_flush {
            return Err(BatchError::persistence("flush rejected"));
        }

        let mut guard = self.lock();
        let state = &mut *guard;
        state.flushes += 1;
        let mut count = 0;
        for registration in &state.registrations {
            if registration.operation_id == operation_id {
                state.existing.insert(registration.entity.id());
                count += 1;
            }
        }
        Ok(count)
    }

    async fn discard(&self, operation_id: OperationId) -> Result<usize> {
        let mut state = self.lock();
        state.discarded.push(operation_id);
        Ok(state
            .registrations
            .iter()
            .filter(|registration| registration.operation_id == operation_id)
            .count())
    }
}
