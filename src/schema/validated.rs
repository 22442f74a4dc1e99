//! The finalized, immutable schema handed to the serving layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::auth::rls::{self, ListScope};
use crate::auth::{
    ApiKey, AuthError, AuthMode, AuthResult, AuthorizationConfig, IssuedApiKey, Operation, Principal,
};

use super::types::{Entity, Field, Relationship};

/// A schema that passed every structural check.
///
/// Plain immutable data: share it behind an `Arc` and read it from any number
/// of threads. Authorization checks never fail; anything not explicitly
/// granted is denied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSchema {
    config: AuthorizationConfig,
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    relationships: Vec<Relationship>,
}

impl ValidatedSchema {
    pub(crate) fn new(
        config: AuthorizationConfig,
        entities: Vec<Entity>,
        relationships: Vec<Relationship>,
    ) -> Self {
        let index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self {
            config,
            entities,
            index,
            relationships,
        }
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    pub fn default_mode(&self) -> AuthMode {
        self.config.default_authorization_mode
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.index.get(name).map(|&i| &self.entities[i])
    }

    /// Entities in registration order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn field(&self, entity: &str, field: &str) -> Option<&Field> {
        self.entity(entity)?.field(field)
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Returns true iff an entity rule grants `op` to `principal`.
    ///
    /// `record` is the stored record (or, for create, the prepared payload);
    /// owner rules only match when it is given. Unknown entities are denied.
    pub fn authorize(
        &self,
        entity: &str,
        op: Operation,
        principal: &Principal,
        record: Option<&Value>,
    ) -> bool {
        self.entity(entity)
            .is_some_and(|e| rls::evaluate(&e.rules, op, principal, record))
    }

    /// Field-level check: a field with its own rules is governed by those
    /// alone, any other field by the entity rules.
    pub fn authorize_field(
        &self,
        entity: &str,
        field: &str,
        op: Operation,
        principal: &Principal,
        record: Option<&Value>,
    ) -> bool {
        let Some(e) = self.entity(entity) else {
            return false;
        };
        match e.field(field) {
            Some(f) if !f.spec.rules.is_empty() => rls::evaluate(&f.spec.rules, op, principal, record),
            Some(_) => rls::evaluate(&e.rules, op, principal, record),
            None => false,
        }
    }

    /// Restriction a list query over `entity` must apply for `principal`
    pub fn list_scope(&self, entity: &str, principal: &Principal) -> ListScope {
        match self.entity(entity) {
            Some(e) => rls::list_scope(&e.rules, principal),
            None => ListScope::Denied,
        }
    }

    /// Sets the owner fields of a record about to be created.
    pub fn prepare_insert(&self, entity: &str, record: &mut Value, principal: &Principal) -> AuthResult<()> {
        let e = self
            .entity(entity)
            .ok_or_else(|| AuthError::UnknownEntity(entity.to_string()))?;
        rls::stamp_owner(entity, &e.owner_fields(), record, principal)
    }

    /// Issues an API key with the configured lifetime.
    pub fn issue_api_key(&self, now: DateTime<Utc>) -> IssuedApiKey {
        ApiKey::issue(self.config.api_key_expires_in_days, now)
    }
}
