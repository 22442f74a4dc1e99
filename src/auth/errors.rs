//! # Auth Errors
//!
//! Errors raised while preparing records on behalf of a principal.
//! Authorization checks themselves never error; they deny.

use thiserror::Error;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Owner-scoped operation attempted without an identity
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Entity not present in the schema
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Record payload is not a JSON object
    #[error("Record for '{0}' must be a JSON object")]
    InvalidRecord(String),
}
