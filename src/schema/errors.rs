//! Schema error types
//!
//! Every configuration error is FATAL: the serving layer must refuse to start.
//! Record validation failures are REJECT: the single request is refused.

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Schema is unusable, startup must abort
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Schema error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Entity name registered twice
    DuplicateEntity,
    /// Field name declared twice within one entity
    DuplicateField,
    /// Reference to an entity that was never registered
    UnknownEntity,
    /// Reference to a field the entity does not declare
    UnknownField,
    /// Field type (or default value) does not match what is required
    TypeMismatch,
    /// Foreign key of a non-optional relationship is not required
    ForeignKeyNotRequired,
    /// Relationship declared without its reverse half
    MissingReciprocal,
    /// Entity without any authorization rule
    NoAuthRule,
    /// API key expiry outside the accepted range
    InvalidExpiry,
    /// Schema used before `finalize()` succeeded
    NotFinalized,
    /// Registry modified after `finalize()` succeeded
    Immutable,
    /// Schema definition file unreadable or not valid JSON
    MalformedDefinition,
    /// Record payload violates its entity's fields
    ValidationFailed,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::DuplicateEntity => "SCHEMA_DUPLICATE_ENTITY",
            SchemaErrorCode::DuplicateField => "SCHEMA_DUPLICATE_FIELD",
            SchemaErrorCode::UnknownEntity => "SCHEMA_UNKNOWN_ENTITY",
            SchemaErrorCode::UnknownField => "SCHEMA_UNKNOWN_FIELD",
            SchemaErrorCode::TypeMismatch => "SCHEMA_TYPE_MISMATCH",
            SchemaErrorCode::ForeignKeyNotRequired => "SCHEMA_FOREIGN_KEY_NOT_REQUIRED",
            SchemaErrorCode::MissingReciprocal => "SCHEMA_MISSING_RECIPROCAL",
            SchemaErrorCode::NoAuthRule => "SCHEMA_NO_AUTH_RULE",
            SchemaErrorCode::InvalidExpiry => "SCHEMA_INVALID_EXPIRY",
            SchemaErrorCode::NotFinalized => "SCHEMA_NOT_FINALIZED",
            SchemaErrorCode::Immutable => "SCHEMA_IMMUTABLE",
            SchemaErrorCode::MalformedDefinition => "SCHEMA_MALFORMED_DEFINITION",
            SchemaErrorCode::ValidationFailed => "SCHEMA_VALIDATION_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::ValidationFailed | SchemaErrorCode::NotFinalized => Severity::Reject,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Record validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field name, or `$root` for the record itself
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared or relation fields", "field present")
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// Schema error type with full context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    entity: Option<String>,
    field: Option<String>,
    details: Option<ValidationDetails>,
}

impl SchemaError {
    fn new(code: SchemaErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            entity: None,
            field: None,
            details: None,
        }
    }

    fn on_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn duplicate_entity(entity: &str) -> Self {
        Self::new(
            SchemaErrorCode::DuplicateEntity,
            format!("Entity '{}' is already registered", entity),
        )
        .on_entity(entity)
    }

    pub fn duplicate_field(entity: &str, field: &str) -> Self {
        Self::new(
            SchemaErrorCode::DuplicateField,
            format!("Entity '{}' declares field '{}' more than once", entity, field),
        )
        .on_entity(entity)
        .on_field(field)
    }

    pub fn unknown_entity(entity: &str) -> Self {
        Self::new(
            SchemaErrorCode::UnknownEntity,
            format!("Entity '{}' is not registered", entity),
        )
        .on_entity(entity)
    }

    pub fn unknown_field(entity: &str, field: &str) -> Self {
        Self::new(
            SchemaErrorCode::UnknownField,
            format!("Entity '{}' has no field '{}'", entity, field),
        )
        .on_entity(entity)
        .on_field(field)
    }

    pub fn type_mismatch(entity: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::new(
            SchemaErrorCode::TypeMismatch,
            format!("Field '{}.{}' must be {}, found {}", entity, field, expected, actual),
        )
        .on_entity(entity)
        .on_field(field)
    }

    pub fn foreign_key_not_required(entity: &str, field: &str) -> Self {
        Self::new(
            SchemaErrorCode::ForeignKeyNotRequired,
            format!(
                "Foreign key '{}.{}' backs a non-optional relationship and must be required",
                entity, field
            ),
        )
        .on_entity(entity)
        .on_field(field)
    }

    /// `expected` describes the reverse relationship that was not found.
    pub fn missing_reciprocal(entity: &str, field: &str, expected: &str) -> Self {
        Self::new(
            SchemaErrorCode::MissingReciprocal,
            format!("Relationship '{}.{}' has no reciprocal {}", entity, field, expected),
        )
        .on_entity(entity)
        .on_field(field)
    }

    pub fn no_auth_rule(entity: &str) -> Self {
        Self::new(
            SchemaErrorCode::NoAuthRule,
            format!("Entity '{}' has no authorization rule and is unreachable", entity),
        )
        .on_entity(entity)
    }

    pub fn invalid_expiry(days: i64) -> Self {
        Self::new(
            SchemaErrorCode::InvalidExpiry,
            format!("API key expiry must be a positive number of days, got {}", days),
        )
    }

    pub fn not_finalized() -> Self {
        Self::new(
            SchemaErrorCode::NotFinalized,
            "Schema must be finalized before it is used for authorization".into(),
        )
    }

    pub fn immutable() -> Self {
        Self::new(
            SchemaErrorCode::Immutable,
            "Schema is finalized and can no longer be modified".into(),
        )
    }

    pub fn malformed_definition(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            SchemaErrorCode::MalformedDefinition,
            format!("Malformed schema definition '{}': {}", source.into(), reason.into()),
        )
    }

    pub fn validation_failed(entity: &str, details: ValidationDetails) -> Self {
        let field = details.field.clone();
        let mut err = Self::new(
            SchemaErrorCode::ValidationFailed,
            format!("Record for '{}' failed validation: {}", entity, details),
        )
        .on_entity(entity)
        .on_field(field);
        err.details = Some(details);
        err
    }

    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Entity the error refers to, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
