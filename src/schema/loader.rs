//! Schema loader for reading a schema definition file at startup
//!
//! The definition is a single JSON document:
//!
//! ```json
//! {
//!   "authorization": { "defaultAuthorizationMode": "apiKey", "apiKeyExpiresInDays": 30 },
//!   "entities": [ { "name": "Cart", "authorization": [ { "allow": "owner" } ] } ],
//!   "relationships": []
//! }
//! ```
//!
//! A missing or malformed file, or a definition that fails validation, is
//! FATAL: the caller must refuse to start.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthorizationConfig;
use crate::observability::Logger;

use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use super::types::{Entity, Relationship};
use super::validated::ValidatedSchema;

/// Keys a field object may carry
const FIELD_KEYS: &[&str] = &["name", "type", "target", "required", "default", "authorization"];

/// Keys an authorization rule object may carry
const RULE_KEYS: &[&str] = &["allow", "group", "ownerField", "operations"];

/// Static schema configuration: global auth settings, entities, relationships.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl SchemaDefinition {
    /// Parses a definition document. Unknown keys anywhere in it are rejected.
    pub fn from_json(source: &str, json: &str) -> SchemaResult<Self> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| SchemaError::malformed_definition(source, format!("Invalid JSON: {}", e)))?;
        check_flattened_keys(&raw).map_err(|reason| SchemaError::malformed_definition(source, reason))?;
        serde_json::from_value(raw)
            .map_err(|e| SchemaError::malformed_definition(source, format!("Invalid definition: {}", e)))
    }

    pub fn to_json_pretty(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SchemaError::malformed_definition("<in-memory>", format!("Failed to serialize: {}", e))
        })
    }

    /// Registers entities first, then relationships, in declaration order.
    pub fn into_registry(self) -> SchemaResult<SchemaRegistry> {
        let mut registry = SchemaRegistry::new(self.authorization);
        for entity in self.entities {
            registry.register(entity)?;
        }
        for rel in self.relationships {
            registry.register_relationship(rel)?;
        }
        Ok(registry)
    }

    /// Builds and finalizes the schema.
    pub fn finalize(self) -> SchemaResult<Arc<ValidatedSchema>> {
        self.into_registry()?.finalize()
    }
}

/// Field and rule objects are deserialized through `#[serde(flatten)]`, which
/// cannot deny unknown keys itself; check them here.
fn check_flattened_keys(raw: &Value) -> Result<(), String> {
    for entity in array(raw, "entities") {
        check_rule_keys(array(entity, "authorization"))?;
        for field in array(entity, "fields") {
            check_keys(field, FIELD_KEYS, "field")?;
            check_rule_keys(array(field, "authorization"))?;
        }
    }
    for rel in array(raw, "relationships") {
        check_rule_keys(array(rel, "authorization"))?;
    }
    Ok(())
}

fn array<'v>(value: &'v Value, key: &str) -> &'v [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn check_rule_keys(rules: &[Value]) -> Result<(), String> {
    rules.iter().try_for_each(|rule| check_keys(rule, RULE_KEYS, "authorization rule"))
}

fn check_keys(object: &Value, allowed: &[&str], what: &str) -> Result<(), String> {
    let Some(map) = object.as_object() else {
        return Ok(());
    };
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(format!("Unknown key '{}' in {}", key, what)),
        None => Ok(()),
    }
}

/// Reads a schema definition file.
pub struct SchemaLoader {
    path: PathBuf,
}

impl SchemaLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the definition without validating it.
    pub fn read_definition(&self) -> SchemaResult<SchemaDefinition> {
        let source = self.path.display().to_string();
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SchemaError::malformed_definition(&source, format!("Failed to read file: {}", e)))?;
        SchemaDefinition::from_json(&source, &content)
    }

    /// Reads, registers and finalizes the definition.
    pub fn load(&self) -> SchemaResult<Arc<ValidatedSchema>> {
        let schema = self.read_definition()?.finalize()?;

        let source = self.path.display().to_string();
        let entity_count = schema.entities().count().to_string();
        Logger::info(
            "SCHEMA_LOADED",
            &[("entities", entity_count.as_str()), ("path", source.as_str())],
        );

        Ok(schema)
    }

    /// Writes a definition as pretty JSON, refusing to overwrite.
    pub fn save(&self, definition: &SchemaDefinition) -> SchemaResult<()> {
        let source = self.path.display().to_string();
        if self.path.exists() {
            return Err(SchemaError::malformed_definition(&source, "File already exists"));
        }
        let content = definition.to_json_pretty()?;
        fs::write(&self.path, content)
            .map_err(|e| SchemaError::malformed_definition(&source, format!("Failed to write file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthMode, AuthRule, Operation};
    use crate::schema::{FieldSpec, SchemaErrorCode};
    use tempfile::TempDir;

    fn sample() -> SchemaDefinition {
        SchemaDefinition {
            authorization: AuthorizationConfig::new(AuthMode::ApiKey, 14),
            entities: vec![Entity::new("Product")
                .with_field("title", FieldSpec::string().required())
                .with_rule(AuthRule::public_api_key().to(&[Operation::Read]))],
            relationships: Vec::new(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path().join("schema.json"));

        loader.save(&sample()).unwrap();
        assert_eq!(loader.read_definition().unwrap(), sample());

        let schema = loader.load().unwrap();
        assert_eq!(schema.config().api_key_expires_in_days, 14);
        assert!(schema.entity("Product").is_some());
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path().join("schema.json"));

        loader.save(&sample()).unwrap();
        let err = loader.save(&sample()).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedDefinition);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = SchemaLoader::new(temp_dir.path().join("absent.json"));

        let err = loader.load().unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedDefinition);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_json() {
        let err = SchemaDefinition::from_json("inline", "{ \"entities\": [").unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedDefinition);
        assert!(err.message().contains("inline"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let cases = [
            r#"{ "entitys": [] }"#,
            r#"{ "entities": [ { "name": "Cart", "rules": [] } ] }"#,
            r#"{ "entities": [ { "name": "Cart", "fields": [ { "name": "note", "type": "string", "requried": true } ] } ] }"#,
            r#"{ "entities": [ { "name": "Cart", "authorization": [ { "allow": "owner", "ownerFeild": "by" } ] } ] }"#,
            r#"{ "relationships": [ { "kind": "hasMany", "source": "A", "field": "b", "target": "B", "foreignKey": "aId", "optinal": true } ] }"#,
        ];

        for json in cases {
            let err = SchemaDefinition::from_json("inline", json).unwrap_err();
            assert_eq!(err.code(), SchemaErrorCode::MalformedDefinition, "{}", json);
        }
    }

    #[test]
    fn test_validation_errors_surface_from_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schema.json");
        fs::write(
            &path,
            r#"{ "authorization": { "apiKeyExpiresInDays": -1 },
                 "entities": [ { "name": "Cart", "authorization": [ { "allow": "owner" } ] } ] }"#,
        )
        .unwrap();

        let err = SchemaLoader::new(path).load().unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::InvalidExpiry);
    }
}
