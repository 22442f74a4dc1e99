//! Record validation against entity field metadata
//!
//! Used by the serving layer before a record is handed to the store:
//! - Required fields present (or covered by a default)
//! - No undeclared fields, and no values for relation fields
//! - Field types match exactly; `null` only for optional fields
//! - The implicit `id` must be a non-empty string when present

use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::types::{json_type_name, Entity, FieldType};
use super::validated::ValidatedSchema;

/// Primary key every record carries; assigned by the store
pub const ID_FIELD: &str = "id";

/// Validates record payloads. Does not mutate unless asked to apply defaults.
pub struct RecordValidator<'a> {
    schema: &'a ValidatedSchema,
}

impl<'a> RecordValidator<'a> {
    pub fn new(schema: &'a ValidatedSchema) -> Self {
        Self { schema }
    }

    fn entity(&self, name: &str) -> SchemaResult<&'a Entity> {
        self.schema
            .entity(name)
            .ok_or_else(|| SchemaError::unknown_entity(name))
    }

    /// Validates a full record for `entity`.
    ///
    /// Returns the first violation in field declaration order.
    pub fn validate_record(&self, entity: &str, record: &Value) -> SchemaResult<()> {
        let def = self.entity(entity)?;
        let obj = as_object(entity, record)?;

        check_undeclared(def, obj)?;

        for field in def.fields.iter().filter(|f| !f.spec.field_type.is_relation()) {
            match obj.get(&field.name) {
                Some(Value::Null) if field.spec.required => {
                    return Err(SchemaError::validation_failed(
                        entity,
                        ValidationDetails::null_value(&field.name),
                    ));
                }
                Some(Value::Null) => {}
                Some(value) => check_value(entity, &field.name, &field.spec.field_type, value)?,
                None if field.spec.required && field.spec.default.is_none() => {
                    return Err(SchemaError::validation_failed(
                        entity,
                        ValidationDetails::missing_field(&field.name),
                    ));
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Fills omitted fields that declare a default.
    pub fn apply_defaults(&self, entity: &str, record: &mut Value) -> SchemaResult<()> {
        let def = self.entity(entity)?;
        let actual = json_type_name(record);
        let obj = record.as_object_mut().ok_or_else(|| {
            SchemaError::validation_failed(entity, ValidationDetails::new("$root", "object", actual))
        })?;

        for field in &def.fields {
            if let Some(default) = &field.spec.default {
                if !obj.contains_key(&field.name) {
                    obj.insert(field.name.clone(), default.clone());
                }
            }
        }

        Ok(())
    }
}

fn as_object<'v>(entity: &str, record: &'v Value) -> SchemaResult<&'v Map<String, Value>> {
    record.as_object().ok_or_else(|| {
        SchemaError::validation_failed(
            entity,
            ValidationDetails::new("$root", "object", json_type_name(record)),
        )
    })
}

fn check_undeclared(def: &Entity, obj: &Map<String, Value>) -> SchemaResult<()> {
    for (key, value) in obj {
        if key == ID_FIELD && def.field(ID_FIELD).is_none() {
            check_value(&def.name, key, &FieldType::Id, value)?;
            continue;
        }
        match def.field(key) {
            Some(field) if !field.spec.field_type.is_relation() => {}
            _ => {
                return Err(SchemaError::validation_failed(
                    &def.name,
                    ValidationDetails::extra_field(key),
                ));
            }
        }
    }
    Ok(())
}

fn check_value(entity: &str, field: &str, field_type: &FieldType, value: &Value) -> SchemaResult<()> {
    if field_type.accepts(value) {
        return Ok(());
    }
    Err(SchemaError::validation_failed(
        entity,
        ValidationDetails::new(field, field_type.type_name(), json_type_name(value)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthRule, AuthorizationConfig};
    use crate::schema::{FieldSpec, SchemaErrorCode, SchemaRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> Arc<ValidatedSchema> {
        let mut reg = SchemaRegistry::new(AuthorizationConfig::default());
        reg.register(
            Entity::new("Item")
                .with_field("name", FieldSpec::string().required())
                .with_field("count", FieldSpec::integer().required().with_default(1))
                .with_field("link", FieldSpec::url())
                .with_rule(AuthRule::public_api_key()),
        )
        .unwrap();
        reg.finalize().unwrap()
    }

    fn failed_field(result: SchemaResult<()>) -> String {
        let err = result.unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::ValidationFailed);
        err.field().unwrap().to_string()
    }

    #[test]
    fn test_valid_record() {
        let schema = schema();
        let v = RecordValidator::new(&schema);

        v.validate_record("Item", &json!({ "id": "i-1", "name": "hat" })).unwrap();
        v.validate_record("Item", &json!({ "name": "hat", "link": null, "count": 3 }))
            .unwrap();
    }

    #[test]
    fn test_invalid_records() {
        let schema = schema();
        let v = RecordValidator::new(&schema);

        assert_eq!(failed_field(v.validate_record("Item", &json!({}))), "name");
        assert_eq!(failed_field(v.validate_record("Item", &json!({ "name": 4 }))), "name");
        assert_eq!(failed_field(v.validate_record("Item", &json!({ "name": null }))), "name");
        assert_eq!(
            failed_field(v.validate_record("Item", &json!({ "name": "a", "color": "red" }))),
            "color"
        );
        assert_eq!(
            failed_field(v.validate_record("Item", &json!({ "name": "a", "link": "nope" }))),
            "link"
        );
        assert_eq!(failed_field(v.validate_record("Item", &json!({ "name": "a", "id": "" }))), "id");
        assert_eq!(failed_field(v.validate_record("Item", &json!("text"))), "$root");
    }

    #[test]
    fn test_unknown_entity() {
        let schema = schema();
        let err = RecordValidator::new(&schema)
            .validate_record("Ghost", &json!({}))
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnknownEntity);
    }

    #[test]
    fn test_apply_defaults() {
        let schema = schema();
        let v = RecordValidator::new(&schema);

        let mut record = json!({ "name": "hat" });
        v.apply_defaults("Item", &mut record).unwrap();
        assert_eq!(record, json!({ "name": "hat", "count": 1 }));

        let mut record = json!({ "name": "hat", "count": 5 });
        v.apply_defaults("Item", &mut record).unwrap();
        assert_eq!(record["count"], 5);
    }

    #[test]
    fn test_non_object_reports_json_type() {
        let schema = schema();
        let v = RecordValidator::new(&schema);

        let mut record = json!([1, 2]);
        let err = v.apply_defaults("Item", &mut record).unwrap_err();
        assert_eq!(err.details().unwrap().actual, "array");

        let err = v.validate_record("Item", &json!("text")).unwrap_err();
        assert_eq!(err.details().unwrap().actual, "string");
    }
}
