//! storefront-schema - A strict, validated schema and authorization registry
//!
//! Entities, fields, relationships and access rules are declared once at
//! startup, checked by `SchemaRegistry::finalize`, and served read-only from a
//! shared `ValidatedSchema`.

pub mod auth;
pub mod observability;
pub mod schema;
pub mod storefront;
