//! Build-phase schema registry
//!
//! Entities and relationships are registered sequentially at startup, then
//! `finalize()` runs every cross-entity check and freezes the result.
//! After a successful finalize the registry rejects further changes.

use std::sync::Arc;

use serde_json::Value;

use crate::auth::{AuthorizationConfig, Operation, Principal};
use crate::observability::Logger;

use super::errors::{SchemaError, SchemaResult};
use super::types::{json_type_name, Entity, Field, FieldSpec, FieldType, Relationship, RelationshipKind};
use super::validated::ValidatedSchema;

/// Mutable schema under construction
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    config: AuthorizationConfig,
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
    finalized: Option<Arc<ValidatedSchema>>,
}

impl SchemaRegistry {
    pub fn new(config: AuthorizationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized.is_some()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    fn ensure_mutable(&self) -> SchemaResult<()> {
        if self.is_finalized() {
            return Err(SchemaError::immutable());
        }
        Ok(())
    }

    /// Adds an entity definition.
    ///
    /// Every owner field named by the entity's owner rules (entity- or
    /// field-level) that the entity does not declare is added here as an
    /// optional `string` field, so ownership is always backed by a declared
    /// field. A declared owner field must be a `string`.
    pub fn register(&mut self, entity: Entity) -> SchemaResult<()> {
        self.ensure_mutable()?;

        if self.entity(&entity.name).is_some() {
            return Err(SchemaError::duplicate_entity(&entity.name));
        }

        check_fields(&entity)?;

        let mut entity = entity;
        inject_owner_fields(&mut entity)?;

        let field_count = entity.fields.len().to_string();
        let rule_count = entity.rules.len().to_string();
        Logger::info(
            "SCHEMA_ENTITY_REGISTERED",
            &[
                ("entity", entity.name.as_str()),
                ("fields", field_count.as_str()),
                ("rules", rule_count.as_str()),
            ],
        );

        self.entities.push(entity);
        Ok(())
    }

    /// Adds a relationship and its relation field on the source entity.
    ///
    /// Both entities and the foreign key must already exist. The reverse half
    /// may be registered later; reciprocity is checked by `finalize()`. Owner
    /// rules on the relationship get their owner field on the source entity,
    /// as in `register`.
    pub fn register_relationship(&mut self, rel: Relationship) -> SchemaResult<()> {
        self.ensure_mutable()?;

        if self.entity(&rel.target).is_none() {
            return Err(SchemaError::unknown_entity(&rel.target));
        }
        check_foreign_key(&self.entities, &rel)?;

        let slot = self
            .entities
            .iter()
            .position(|e| e.name == rel.source)
            .ok_or_else(|| SchemaError::unknown_entity(&rel.source))?;

        if self.entities[slot].field(&rel.field).is_some() {
            return Err(SchemaError::duplicate_field(&rel.source, &rel.field));
        }

        // A rejected relationship leaves the entity untouched.
        let mut source = self.entities[slot].clone();
        let mut spec = FieldSpec::relation(&rel.target);
        spec.rules = rel.rules.clone();
        source.fields.push(Field::new(&rel.field, spec));
        inject_owner_fields(&mut source)?;
        self.entities[slot] = source;

        Logger::info(
            "SCHEMA_RELATIONSHIP_REGISTERED",
            &[
                ("entity", rel.source.as_str()),
                ("field", rel.field.as_str()),
                ("foreign_key", rel.foreign_key.as_str()),
                ("kind", rel.kind.as_str()),
                ("target", rel.target.as_str()),
            ],
        );

        self.relationships.push(rel);
        Ok(())
    }

    /// Validates the whole schema and freezes it.
    ///
    /// Returns the first violated invariant. Once this succeeds, further calls
    /// return the same schema without validating or logging again.
    pub fn finalize(&mut self) -> SchemaResult<Arc<ValidatedSchema>> {
        if let Some(schema) = &self.finalized {
            return Ok(Arc::clone(schema));
        }

        if let Err(err) = self.validate() {
            Logger::error(
                "SCHEMA_FINALIZE_FAILED",
                &[("code", err.code().code()), ("message", err.message())],
            );
            return Err(err);
        }

        let schema = Arc::new(ValidatedSchema::new(
            self.config.clone(),
            self.entities.clone(),
            self.relationships.clone(),
        ));
        self.finalized = Some(Arc::clone(&schema));

        let entity_count = self.entities.len().to_string();
        let relationship_count = self.relationships.len().to_string();
        Logger::info(
            "SCHEMA_FINALIZED",
            &[
                ("default_mode", self.config.default_authorization_mode.as_str()),
                ("entities", entity_count.as_str()),
                ("relationships", relationship_count.as_str()),
            ],
        );

        Ok(schema)
    }

    /// Returns the finalized schema, or `NotFinalized`.
    pub fn validated(&self) -> SchemaResult<Arc<ValidatedSchema>> {
        self.finalized.clone().ok_or_else(SchemaError::not_finalized)
    }

    /// Authorization check against the finalized schema.
    ///
    /// Fails with `NotFinalized` before `finalize()` has succeeded.
    pub fn authorize(
        &self,
        entity: &str,
        op: Operation,
        principal: &Principal,
        record: Option<&Value>,
    ) -> SchemaResult<bool> {
        let schema = self.finalized.as_ref().ok_or_else(SchemaError::not_finalized)?;
        Ok(schema.authorize(entity, op, principal, record))
    }

    fn validate(&self) -> SchemaResult<()> {
        self.config.validate()?;

        for entity in &self.entities {
            if entity.rules.is_empty() {
                return Err(SchemaError::no_auth_rule(&entity.name));
            }
        }

        for rel in &self.relationships {
            check_foreign_key(&self.entities, rel)?;
        }

        for rel in &self.relationships {
            if !self.relationships.iter().any(|other| rel.is_reciprocal_of(other)) {
                return Err(SchemaError::missing_reciprocal(
                    &rel.source,
                    &rel.field,
                    &rel.describe_reciprocal(),
                ));
            }
        }

        Ok(())
    }
}

/// Field names unique, no hand-declared relation fields, defaults typed.
fn check_fields(entity: &Entity) -> SchemaResult<()> {
    for (i, field) in entity.fields.iter().enumerate() {
        if entity.fields[..i].iter().any(|f| f.name == field.name) {
            return Err(SchemaError::duplicate_field(&entity.name, &field.name));
        }

        let field_type = &field.spec.field_type;
        if field_type.is_relation() {
            return Err(SchemaError::type_mismatch(
                &entity.name,
                &field.name,
                "a scalar type (relation fields come from relationships)",
                field_type.type_name(),
            ));
        }

        if let Some(default) = &field.spec.default {
            if !field_type.accepts(default) {
                return Err(SchemaError::type_mismatch(
                    &entity.name,
                    &field.name,
                    &format!("a {} default", field_type.type_name()),
                    json_type_name(default),
                ));
            }
        }
    }
    Ok(())
}

fn inject_owner_fields(entity: &mut Entity) -> SchemaResult<()> {
    let owners: Vec<String> = entity.owner_fields().into_iter().map(String::from).collect();

    for owner in owners {
        match entity.field(&owner) {
            Some(field) if field.spec.field_type == FieldType::String => {}
            Some(field) => {
                return Err(SchemaError::type_mismatch(
                    &entity.name,
                    &owner,
                    FieldType::String.type_name(),
                    field.spec.field_type.type_name(),
                ));
            }
            None => {
                Logger::info(
                    "SCHEMA_OWNER_FIELD_INJECTED",
                    &[("entity", entity.name.as_str()), ("field", owner.as_str())],
                );
                entity.fields.push(Field::new(owner, FieldSpec::string()));
            }
        }
    }
    Ok(())
}

/// The foreign key must exist on its holder with type `id`, and be required
/// unless the relationship is optional. Only `belongsTo` governs requiredness;
/// a `hasMany` inherits it from its reciprocal.
fn check_foreign_key(entities: &[Entity], rel: &Relationship) -> SchemaResult<()> {
    for name in [&rel.source, &rel.target] {
        if !entities.iter().any(|e| &e.name == name) {
            return Err(SchemaError::unknown_entity(name));
        }
    }

    let holder_name = rel.key_holder();
    let holder = entities
        .iter()
        .find(|e| e.name == holder_name)
        .ok_or_else(|| SchemaError::unknown_entity(holder_name))?;

    let fk = holder
        .field(&rel.foreign_key)
        .ok_or_else(|| SchemaError::unknown_field(holder_name, &rel.foreign_key))?;

    if fk.spec.field_type != FieldType::Id {
        return Err(SchemaError::type_mismatch(
            holder_name,
            &rel.foreign_key,
            FieldType::Id.type_name(),
            fk.spec.field_type.type_name(),
        ));
    }

    if rel.kind == RelationshipKind::BelongsTo && !rel.optional && !fk.spec.required {
        return Err(SchemaError::foreign_key_not_required(holder_name, &rel.foreign_key));
    }

    Ok(())
}
