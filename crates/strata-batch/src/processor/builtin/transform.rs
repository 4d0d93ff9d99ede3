//! TRANSFORM processors.
//!
//! Records are JSON objects shaped like a JSON:API resource:
//!
//! ```json
//! {
//!   "type": "user",
//!   "id": "0190b6c4-...",
//!   "attributes": { "email": "a@example.com" },
//!   "additional": [{ "type": "audit_entry", "attributes": {} }],
//!   "included": [{ "type": "address", "id": "...", "attributes": {} }]
//! }
//! ```

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::TRACING_TARGET;
use crate::Result;
use crate::context::ItemScope;
use crate::diagnostic::ErrorObject;
use crate::item::{BatchItem, Entity, Record};
use crate::processor::{ItemProcessor, ProcessorOutcome};
use crate::provider::Persistence;

/// Record field holding the entity class.
pub const TYPE_FIELD: &str = "type";
/// Record field holding the entity identifier.
pub const ID_FIELD: &str = "id";
/// Record field holding the entity attributes.
pub const ATTRIBUTES_FIELD: &str = "attributes";
/// Record field listing entities created alongside the target.
pub const ADDITIONAL_FIELD: &str = "additional";
/// Record field listing related entities that may already exist.
pub const INCLUDED_FIELD: &str = "included";

/// Resolves the entity class of an item and checks the batch may touch it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckEntityClass;

#[async_trait::async_trait]
impl ItemProcessor for CheckEntityClass {
    async fn process(&self, item: &mut BatchItem, scope: &ItemScope<'_>) -> Result<ProcessorOutcome> {
        let class = match item.request_data().get(TYPE_FIELD) {
            Some(Value::String(class)) if !class.is_empty() => class.clone(),
            Some(Value::String(_)) | None => {
                item.add_error(ErrorObject::validation("NotBlank").with_property_path(TYPE_FIELD));
                return Ok(ProcessorOutcome::SkipStage);
            }
            Some(_) => {
                item.add_error(ErrorObject::validation("Type").with_property_path(TYPE_FIELD));
                return Ok(ProcessorOutcome::SkipStage);
            }
        };

        if !scope.is_supported_entity_class(&class) {
            tracing::debug!(
                target: TRACING_TARGET,
                item_index = item.index(),
                entity_class = %class,
                "Entity class not supported by batch"
            );
            item.add_error(
                ErrorObject::business_rule("SupportedEntityClass")
                    .with_detail(format!("entity class '{class}' is not supported by this batch"))
                    .with_property_path(TYPE_FIELD),
            );
            return Ok(ProcessorOutcome::SkipStage);
        }

        item.context_mut().target_mut().set_entity_class(class);
        Ok(ProcessorOutcome::Continue)
    }
}

/// Builds the target, additional and included entities of an item.
///
/// Included entities are flagged as existing when the persistence layer
/// already knows them.
#[derive(Clone)]
pub struct BuildTargetEntity {
    persistence: Arc<dyn Persistence>,
}

impl BuildTargetEntity {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait::async_trait]
impl ItemProcessor for BuildTargetEntity {
    async fn process(&self, item: &mut BatchItem, _scope: &ItemScope<'_>) -> Result<ProcessorOutcome> {
        if item.has_errors() {
            return Ok(ProcessorOutcome::SkipStage);
        }

        let class = item.context().target().entity_class().map(str::to_owned);
        let record = item.request_data().clone();

        let target = match parse_entity(&record, class.as_deref(), "") {
            Ok(entity) => entity,
            Err(error) => {
                item.add_error(error);
                return Ok(ProcessorOutcome::SkipStage);
            }
        };

        let mut additional = Vec::new();
        let mut included = Vec::new();
        let mut errors = Vec::new();

        for (path, value) in nested(&record, ADDITIONAL_FIELD) {
            match as_record(value, &path).and_then(|nested| parse_entity(nested, None, &path)) {
                Ok(entity) => additional.push(entity),
                Err(error) => errors.push(error),
            }
        }

        for (path, value) in nested(&record, INCLUDED_FIELD) {
            match as_record(value, &path).and_then(|nested| parse_entity(nested, None, &path)) {
                Ok(entity) => included.push((entity, path)),
                Err(error) => errors.push(error),
            }
        }

        if !errors.is_empty() {
            for error in errors {
                item.add_error(error);
            }
            return Ok(ProcessorOutcome::SkipStage);
        }

        let target_context = item.context_mut().target_mut();
        target_context.set_entity_class(target.class().to_owned());
        target_context.set_entity(target);
        for entity in additional {
            target_context.add_additional_entity(entity);
        }
        for (entity, path) in included {
            let is_existing = !self.persistence.is_new(&entity).await?;
            target_context.included_mut().add(entity, is_existing, path);
        }

        Ok(ProcessorOutcome::Continue)
    }
}

/// Entries of a nested entity list, with their property paths.
fn nested<'a>(record: &'a Record, field: &str) -> Vec<(String, &'a Value)> {
    match record.get(field) {
        Some(Value::Array(values)) => values
            .iter()
            .enumerate()
            .map(|(index, value)| (format!("{field}.{index}"), value))
            .collect(),
        _ => Vec::new(),
    }
}

fn as_record<'a>(value: &'a Value, path: &str) -> std::result::Result<&'a Record, ErrorObject> {
    value
        .as_object()
        .ok_or_else(|| ErrorObject::validation("Type").with_property_path(path))
}

fn property_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_owned()
    } else {
        format!("{prefix}.{field}")
    }
}

/// Parses one entity from a record, reporting the first invalid field.
fn parse_entity(
    record: &Record,
    class: Option<&str>,
    prefix: &str,
) -> std::result::Result<Entity, ErrorObject> {
    let class = match (class, record.get(TYPE_FIELD)) {
        (Some(class), _) => class.to_owned(),
        (None, Some(Value::String(class))) if !class.is_empty() => class.clone(),
        _ => {
            return Err(
                ErrorObject::validation("NotBlank").with_property_path(property_path(prefix, TYPE_FIELD))
            );
        }
    };

    let mut entity = Entity::new(class);

    match record.get(ID_FIELD) {
        None | Some(Value::Null) => {}
        Some(Value::String(id)) => match Uuid::parse_str(id) {
            Ok(id) => entity = entity.with_id(id),
            Err(_) => {
                return Err(ErrorObject::validation("Uuid")
                    .with_detail(format!("'{id}' is not a valid identifier"))
                    .with_property_path(property_path(prefix, ID_FIELD)));
            }
        },
        Some(_) => {
            return Err(
                ErrorObject::validation("Uuid").with_property_path(property_path(prefix, ID_FIELD))
            );
        }
    }

    match record.get(ATTRIBUTES_FIELD) {
        None | Some(Value::Null) => {}
        Some(Value::Object(attributes)) => entity = entity.with_attributes(attributes.clone()),
        Some(_) => {
            return Err(ErrorObject::validation("Type")
                .with_property_path(property_path(prefix, ATTRIBUTES_FIELD)));
        }
    }

    Ok(entity)
}
