//! Entities produced by transforming records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Record;

/// An entity staged for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: Uuid,
    class: String,
    #[serde(default)]
    attributes: Record,
}

impl Entity {
    /// Creates an entity of the given class with a fresh identifier.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            class: class.into(),
            attributes: Record::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_attributes(mut self, attributes: Record) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn class(&self) -> &str {
        &self.class
    }

    #[inline]
    pub fn attributes(&self) -> &Record {
        &self.attributes
    }
}

/// An entity discovered in the included section of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludedEntity {
    entity: Entity,
    is_existing: bool,
    path: String,
}

impl IncludedEntity {
    #[inline]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Whether the entity existed before this batch.
    #[inline]
    pub fn is_existing(&self) -> bool {
        self.is_existing
    }

    /// Location of the entity inside the request record (e.g. `included.0`).
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Entities included in a record, each flagged as new or pre-existing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncludedEntities {
    entries: Vec<IncludedEntity>,
}

impl IncludedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: Entity, is_existing: bool, path: impl Into<String>) {
        self.entries.push(IncludedEntity {
            entity,
            is_existing,
            path: path.into(),
        });
    }

    pub fn get(&self, id: Uuid) -> Option<&IncludedEntity> {
        self.entries.iter().find(|entry| entry.entity.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IncludedEntity> {
        self.entries.iter()
    }

    /// Entities that did not exist before this batch.
    pub fn new_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_existing)
            .map(|entry| &entry.entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
