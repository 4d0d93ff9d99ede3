//! Entity metadata used to attribute errors to fields.

use std::collections::{BTreeSet, HashMap};

/// Field layout of one entity class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMetadata {
    entity_class: String,
    identifier_fields: BTreeSet<String>,
    fields: BTreeSet<String>,
    associations: BTreeSet<String>,
}

impl EntityMetadata {
    /// Creates metadata for an entity class with no known fields.
    pub fn new(entity_class: impl Into<String>) -> Self {
        Self {
            entity_class: entity_class.into(),
            ..Self::default()
        }
    }

    pub fn with_identifier_field(mut self, name: impl Into<String>) -> Self {
        self.identifier_fields.insert(name.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into());
        self
    }

    pub fn with_association(mut self, name: impl Into<String>) -> Self {
        self.associations.insert(name.into());
        self
    }

    #[inline]
    pub fn entity_class(&self) -> &str {
        &self.entity_class
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifier_fields.contains(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains(name)
    }

    pub fn has_association(&self, name: &str) -> bool {
        self.associations.contains(name)
    }
}

/// Resolves entity metadata by entity class.
///
/// Resolution is tolerant: an unknown class or a failing lookup yields `None`
/// and error completion proceeds without metadata.
pub trait MetadataResolver: Send + Sync {
    fn resolve(&self, entity_class: &str) -> Option<EntityMetadata>;
}

/// Metadata resolver backed by a fixed set of entity classes.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entries: HashMap<String, EntityMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers metadata under its entity class, replacing any previous entry.
    pub fn with_metadata(mut self, metadata: EntityMetadata) -> Self {
        self.entries
            .insert(metadata.entity_class().to_owned(), metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataResolver for MetadataRegistry {
    fn resolve(&self, entity_class: &str) -> Option<EntityMetadata> {
        self.entries.get(entity_class).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolves_known_classes_only() {
        let registry = MetadataRegistry::new().with_metadata(
            EntityMetadata::new("user")
                .with_identifier_field("id")
                .with_field("email")
                .with_association("organization"),
        );

        let metadata = registry.resolve("user").unwrap();
        assert!(metadata.is_identifier("id"));
        assert!(metadata.has_field("email"));
        assert!(metadata.has_association("organization"));
        assert!(!metadata.has_field("organization"));
        assert!(registry.resolve("order").is_none());
    }
}
