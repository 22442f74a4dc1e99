//! Schema registry subsystem
//!
//! Entities, fields, relationships and authorization rules are registered
//! once at startup and validated by `finalize()`. The result is immutable.
//!
//! # Design Principles
//!
//! - Every structural error is reported at finalize time, never at first use
//! - Relationships are declared in reciprocal pairs
//! - Every entity is reachable by at least one rule
//! - Authorization is default-deny and never errors

mod errors;
mod loader;
mod registry;
mod types;
mod validated;
mod validator;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity, ValidationDetails};
pub use loader::{SchemaDefinition, SchemaLoader};
pub use registry::SchemaRegistry;
pub use types::{Entity, Field, FieldSpec, FieldType, Relationship, RelationshipKind};
pub use validated::ValidatedSchema;
pub use validator::{RecordValidator, ID_FIELD};
