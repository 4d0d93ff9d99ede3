//! Batch items and their isolated contexts.

use super::{Entity, IncludedEntities, Record};
use crate::diagnostic::ErrorObject;

/// The target of an item: the entity it changes and everything created with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetContext {
    entity_class: Option<String>,
    entity: Option<Entity>,
    additional_entities: Vec<Entity>,
    included: Option<IncludedEntities>,
}

impl TargetContext {
    #[inline]
    pub fn entity_class(&self) -> Option<&str> {
        self.entity_class.as_deref()
    }

    pub fn set_entity_class(&mut self, entity_class: impl Into<String>) {
        self.entity_class = Some(entity_class.into());
    }

    #[inline]
    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn set_entity(&mut self, entity: Entity) {
        self.entity = Some(entity);
    }

    /// Entities created as a side effect of changing the target.
    #[inline]
    pub fn additional_entities(&self) -> &[Entity] {
        &self.additional_entities
    }

    pub fn add_additional_entity(&mut self, entity: Entity) {
        self.additional_entities.push(entity);
    }

    #[inline]
    pub fn included(&self) -> Option<&IncludedEntities> {
        self.included.as_ref()
    }

    /// Returns the included entities, creating an empty collection on first use.
    pub fn included_mut(&mut self) -> &mut IncludedEntities {
        self.included.get_or_insert_with(IncludedEntities::new)
    }
}

/// Per-item processing state, owned by whichever stage processes the item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemContext {
    errors: Vec<ErrorObject>,
    target: TargetContext,
}

impl ItemContext {
    #[inline]
    pub fn errors(&self) -> &[ErrorObject] {
        &self.errors
    }

    /// Mutable access to existing errors, used to complete them in place.
    #[inline]
    pub fn errors_mut(&mut self) -> &mut [ErrorObject] {
        &mut self.errors
    }

    pub fn add_error(&mut self, error: ErrorObject) {
        self.errors.push(error);
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Removes duplicate errors; the list is only rewritten when something was removed.
    pub fn deduplicate_errors(&mut self) -> usize {
        crate::diagnostic::deduplicate_in_place(&mut self.errors)
    }

    #[inline]
    pub fn target(&self) -> &TargetContext {
        &self.target
    }

    #[inline]
    pub fn target_mut(&mut self) -> &mut TargetContext {
        &mut self.target
    }
}

/// One record-change request of a batch.
///
/// The index and request data never change after creation; everything a
/// processor learns about the item goes into its [`ItemContext`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    index: usize,
    request_data: Record,
    context: ItemContext,
}

impl BatchItem {
    pub fn new(index: usize, request_data: Record) -> Self {
        Self {
            index,
            request_data,
            context: ItemContext::default(),
        }
    }

    /// Position of the item within the batch.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn request_data(&self) -> &Record {
        &self.request_data
    }

    #[inline]
    pub fn context(&self) -> &ItemContext {
        &self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut ItemContext {
        &mut self.context
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        self.context.has_errors()
    }

    /// Shorthand for adding an error to the item context.
    pub fn add_error(&mut self, error: ErrorObject) {
        self.context.add_error(error);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_item_errors_do_not_leak_between_items() {
        let mut first = BatchItem::new(0, record(json!({"key": "val1"})));
        let second = BatchItem::new(1, record(json!({"key": "val2"})));

        first.add_error(ErrorObject::validation("NotBlank"));

        assert!(first.has_errors());
        assert!(!second.has_errors());
        assert_eq!(second.index(), 1);
    }

    #[test]
    fn test_deduplicate_errors_only_rewrites_on_removal() {
        let mut context = ItemContext::default();
        context.add_error(ErrorObject::validation("NotBlank").with_code("a"));
        context.add_error(ErrorObject::validation("NotBlank").with_code("b"));

        assert_eq!(context.deduplicate_errors(), 0);
        assert_eq!(context.errors().len(), 2);

        context.add_error(ErrorObject::validation("NotBlank").with_code("a"));
        assert_eq!(context.deduplicate_errors(), 1);
        assert_eq!(context.errors().len(), 2);
    }

    #[test]
    fn test_included_collection_is_created_lazily() {
        let mut target = TargetContext::default();
        assert!(target.included().is_none());

        target
            .included_mut()
            .add(Entity::new("address"), false, "included.0");
        assert_eq!(target.included().map(IncludedEntities::len), Some(1));
    }
}
