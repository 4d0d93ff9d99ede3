//! In-memory unit of work.

use std::collections::HashMap;

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Persistence, TRACING_TARGET};
use crate::context::OperationId;
use crate::item::Entity;
use crate::{BatchError, Result};

#[derive(Debug)]
struct PendingEntity {
    entity: Entity,
    as_new: bool,
}

#[derive(Debug, Default)]
struct UnitOfWorkState {
    persisted: HashMap<Uuid, Entity>,
    pending: HashMap<OperationId, HashMap<Uuid, PendingEntity>>,
}

/// Persistence layer keeping entities in memory.
///
/// Registered entities stay pending under their operation until flushed or
/// discarded; registering the same entity twice in one operation keeps the
/// latest registration. A flush is all or nothing: it fails without writing
/// anything when an entity registered as new was persisted in the meantime.
#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    state: Mutex<UnitOfWorkState>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with an already persisted entity.
    pub fn with_existing(mut self, entity: Entity) -> Self {
        self.state.get_mut().persisted.insert(entity.id(), entity);
        self
    }

    /// Number of registrations waiting for a flush, across all operations.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.values().map(HashMap::len).sum()
    }

    /// Snapshot of persisted entities.
    pub async fn persisted(&self) -> Vec<Entity> {
        let state = self.state.lock().await;
        let mut entities: Vec<_> = state.persisted.values().cloned().collect();
        entities.sort_by_key(Entity::id);
        entities
    }

    /// Looks up a persisted entity.
    pub async fn get(&self, id: Uuid) -> Option<Entity> {
        self.state.lock().await.persisted.get(&id).cloned()
    }
}

#[async_trait::async_trait]
impl Persistence for InMemoryUnitOfWork {
    async fn register(
        &self,
        operation_id: OperationId,
        entity: &Entity,
        as_new: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.pending.entry(operation_id).or_default().insert(
            entity.id(),
            PendingEntity {
                entity: entity.clone(),
                as_new,
            },
        );
        Ok(())
    }

    async fn is_new(&self, entity: &Entity) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(!state.persisted.contains_key(&entity.id()))
    }

    async fn flush(&self, operation_id: OperationId) -> Result<usize> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(pending) = state.pending.remove(&operation_id) else {
            return Ok(0);
        };

        let conflict = pending
            .values()
            .find(|pending| pending.as_new && state.persisted.contains_key(&pending.entity.id()))
            .map(|pending| pending.entity.id());
        if let Some(id) = conflict {
            state.pending.insert(operation_id, pending);
            return Err(BatchError::persistence(format!(
                "entity {id} was registered as new but already exists"
            )));
        }

        let count = pending.len();
        for (id, pending) in pending {
            state.persisted.insert(id, pending.entity);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            operation_id = %operation_id,
            flushed = count,
            persisted = state.persisted.len(),
            "Flushed unit of work"
        );

        Ok(count)
    }

    async fn discard(&self, operation_id: OperationId) -> Result<usize> {
        let mut state = self.state.lock().await;
        let count = state
            .pending
            .remove(&operation_id)
            .map_or(0, |pending| pending.len());

        if count > 0 {
            tracing::debug!(
                target: TRACING_TARGET,
                operation_id = %operation_id,
                discarded = count,
                "Discarded pending registrations"
            );
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registered_entities_are_new_until_flushed() {
        let uow = InMemoryUnitOfWork::new();
        let operation = OperationId::new();
        let entity = Entity::new("user");

        assert!(uow.is_new(&entity).await.unwrap());
        uow.register(operation, &entity, true).await.unwrap();
        assert!(uow.is_new(&entity).await.unwrap());
        assert_eq!(uow.pending_count().await, 1);

        assert_eq!(uow.flush(operation).await.unwrap(), 1);
        assert!(!uow.is_new(&entity).await.unwrap());
        assert_eq!(uow.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_seeded_entities_are_not_new() {
        let entity = Entity::new("user");
        let uow = InMemoryUnitOfWork::new().with_existing(entity.clone());

        assert!(!uow.is_new(&entity).await.unwrap());
        assert_eq!(uow.get(entity.id()).await, Some(entity));
    }

    #[tokio::test]
    async fn test_double_registration_keeps_one_pending_entry() {
        let uow = InMemoryUnitOfWork::new();
        let operation = OperationId::new();
        let entity = Entity::new("user");

        uow.register(operation, &entity, true).await.unwrap();
        uow.register(operation, &entity, false).await.unwrap();

        assert_eq!(uow.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_flush_only_commits_its_own_operation() {
        let uow = InMemoryUnitOfWork::new();
        let (first, second) = (OperationId::new(), OperationId::new());
        let mine = Entity::new("user");
        let theirs = Entity::new("order");

        uow.register(first, &mine, true).await.unwrap();
        uow.register(second, &theirs, true).await.unwrap();

        assert_eq!(uow.flush(first).await.unwrap(), 1);
        assert_eq!(uow.persisted().await, vec![mine]);
        assert_eq!(uow.pending_count().await, 1);
        assert_eq!(uow.flush(first).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_discard_drops_registrations_without_writing() {
        let uow = InMemoryUnitOfWork::new();
        let (failed, other) = (OperationId::new(), OperationId::new());

        uow.register(failed, &Entity::new("user"), true).await.unwrap();
        uow.register(failed, &Entity::new("user"), true).await.unwrap();
        uow.register(other, &Entity::new("order"), true).await.unwrap();

        assert_eq!(uow.discard(failed).await.unwrap(), 2);
        assert_eq!(uow.discard(failed).await.unwrap(), 0);
        assert_eq!(uow.flush(failed).await.unwrap(), 0);
        assert!(uow.persisted().await.is_empty());
        assert_eq!(uow.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_flush_rejects_new_registration_of_persisted_entity() {
        let existing = Entity::new("user");
        let uow = InMemoryUnitOfWork::new().with_existing(existing.clone());
        let operation = OperationId::new();
        let fresh = Entity::new("user");

        uow.register(operation, &fresh, true).await.unwrap();
        uow.register(operation, &existing, true).await.unwrap();

        let error = uow.flush(operation).await.unwrap_err();
        assert_eq!(error.kind_str(), "persistence");
        assert!(uow.get(fresh.id()).await.is_none());
        assert_eq!(uow.pending_count().await, 2);

        uow.register(operation, &existing, false).await.unwrap();
        assert_eq!(uow.flush(operation).await.unwrap(), 2);
        assert!(uow.get(fresh.id()).await.is_some());
    }
}
