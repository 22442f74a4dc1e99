//! Schema type definitions
//!
//! Supported field types:
//! - string: UTF-8 string
//! - url: absolute URL string
//! - float: 64-bit floating point
//! - integer: 64-bit signed integer
//! - id: non-empty record identifier
//! - relation: reference to another entity, added by relationships

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthRule;

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Url,
    Float,
    Integer,
    Id,
    /// Relation-reference to the named entity
    Relation { target: String },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Url => "url",
            FieldType::Float => "float",
            FieldType::Integer => "integer",
            FieldType::Id => "id",
            FieldType::Relation { .. } => "relation",
        }
    }

    /// Returns true if `value` is a valid stored value for this type.
    ///
    /// Relation fields are virtual and never hold a stored value.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Url => value.as_str().is_some_and(|s| url::Url::parse(s).is_ok()),
            FieldType::Float => value.is_number(),
            FieldType::Integer => value.is_i64(),
            FieldType::Id => value.as_str().is_some_and(|s| !s.is_empty()),
            FieldType::Relation { .. } => false,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, FieldType::Relation { .. })
    }
}

/// Returns the JSON type name of a value for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Type, presence and access metadata of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the field must be present on every record
    #[serde(default)]
    pub required: bool,
    /// Value used when a record omits the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Field-level rules; when present they replace the entity rules for this field
    #[serde(default, rename = "authorization", skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<AuthRule>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            rules: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn url() -> Self {
        Self::new(FieldType::Url)
    }

    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn id() -> Self {
        Self::new(FieldType::Id)
    }

    pub fn relation(target: impl Into<String>) -> Self {
        Self::new(FieldType::Relation {
            target: target.into(),
        })
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: AuthRule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// A named field of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub spec: FieldSpec,
}

impl Field {
    pub fn new(name: impl Into<String>, spec: FieldSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }
}

/// A named record type with ordered fields and entity-level rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, rename = "authorization")]
    pub rules: Vec<AuthRule>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push(Field::new(name, spec));
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: AuthRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Owner fields named by entity- and field-level owner rules, deduplicated
    /// in first-seen order.
    pub fn owner_fields(&self) -> Vec<&str> {
        let field_rules = self.fields.iter().flat_map(|f| f.spec.rules.iter());
        let mut owners: Vec<&str> = Vec::new();
        for owner in self.rules.iter().chain(field_rules).filter_map(AuthRule::owner_field) {
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        owners
    }
}

/// Direction and cardinality of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationshipKind {
    /// One-to-many; the foreign key lives on the target entity
    HasMany,
    /// Many-to-one; the foreign key lives on the source entity
    BelongsTo,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::HasMany => "hasMany",
            RelationshipKind::BelongsTo => "belongsTo",
        }
    }

    pub fn reverse(&self) -> RelationshipKind {
        match self {
            RelationshipKind::HasMany => RelationshipKind::BelongsTo,
            RelationshipKind::BelongsTo => RelationshipKind::HasMany,
        }
    }
}

/// A directional link from `source.field` to `target` through `foreign_key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// Entity declaring the relation field
    pub source: String,
    /// Relation field added to the source entity
    pub field: String,
    pub target: String,
    pub foreign_key: String,
    /// Optional relationships do not require their foreign key
    #[serde(default)]
    pub optional: bool,
    #[serde(default, rename = "authorization", skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<AuthRule>,
}

impl Relationship {
    fn new(
        kind: RelationshipKind,
        source: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            field: field.into(),
            target: target.into(),
            foreign_key: foreign_key.into(),
            optional: false,
            rules: Vec::new(),
        }
    }

    /// `source.field` lists the `target` records whose `foreign_key` points at it
    pub fn has_many(
        source: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationshipKind::HasMany, source, field, target, foreign_key)
    }

    /// `source.field` resolves the `target` record named by `source.foreign_key`
    pub fn belongs_to(
        source: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(RelationshipKind::BelongsTo, source, field, target, foreign_key)
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: AuthRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Entity that holds the foreign key field
    pub fn key_holder(&self) -> &str {
        match self.kind {
            RelationshipKind::HasMany => &self.target,
            RelationshipKind::BelongsTo => &self.source,
        }
    }

    pub fn is_reciprocal_of(&self, other: &Relationship) -> bool {
        other.kind == self.kind.reverse()
            && other.source == self.target
            && other.target == self.source
            && other.foreign_key == self.foreign_key
    }

    /// Human-readable description of the reverse half
    pub fn describe_reciprocal(&self) -> String {
        format!(
            "{}({} -> {}, {})",
            self.kind.reverse().as_str(),
            self.target,
            self.source,
            self.foreign_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Operation;
    use serde_json::json;

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::String.accepts(&json!("hat")));
        assert!(!FieldType::String.accepts(&json!(3)));
        assert!(FieldType::Url.accepts(&json!("https://example.com/hat.png")));
        assert!(!FieldType::Url.accepts(&json!("hat.png")));
        assert!(FieldType::Float.accepts(&json!(9.5)));
        assert!(FieldType::Float.accepts(&json!(9)));
        assert!(FieldType::Integer.accepts(&json!(-2)));
        assert!(!FieldType::Integer.accepts(&json!(2.5)));
        assert!(FieldType::Id.accepts(&json!("p-1")));
        assert!(!FieldType::Id.accepts(&json!("")));
        assert!(!FieldType::Relation { target: "Cart".into() }.accepts(&json!("c-1")));
    }

    #[test]
    fn test_field_deserialization() {
        let field: Field = serde_json::from_value(json!({
            "name": "quantity",
            "type": "integer",
            "default": 1
        }))
        .unwrap();

        assert_eq!(field, Field::new("quantity", FieldSpec::integer().with_default(1)));
    }

    #[test]
    fn test_relation_field_deserialization() {
        let field: Field = serde_json::from_value(json!({
            "name": "product",
            "type": "relation",
            "target": "Product"
        }))
        .unwrap();

        assert_eq!(field.spec.field_type, FieldType::Relation { target: "Product".into() });
        assert!(!field.spec.required);
    }

    #[test]
    fn test_owner_fields_deduplicated() {
        let entity = Entity::new("Note")
            .with_field("body", FieldSpec::string().with_rule(AuthRule::owner_defined_in("editor")))
            .with_rule(AuthRule::owner())
            .with_rule(AuthRule::owner().to(&[Operation::Read]))
            .with_rule(AuthRule::group("ADMINS"));

        assert_eq!(entity.owner_fields(), vec!["owner", "editor"]);
    }

    #[test]
    fn test_reciprocal_matching() {
        let many = Relationship::has_many("Cart", "cartItems", "CartItem", "cartId");
        let one = Relationship::belongs_to("CartItem", "cart", "Cart", "cartId");
        let other = Relationship::belongs_to("CartItem", "product", "Product", "productId");

        assert!(many.is_reciprocal_of(&one));
        assert!(one.is_reciprocal_of(&many));
        assert!(!many.is_reciprocal_of(&other));
        assert_eq!(many.key_holder(), "CartItem");
        assert_eq!(one.key_holder(), "CartItem");
        assert_eq!(many.describe_reciprocal(), "belongsTo(CartItem -> Cart, cartId)");
    }
}
