//! # Authorization
//!
//! Rules, principals and API keys for the schema's access policy.
//! Authentication itself happens upstream; this module only decides whether an
//! already-authenticated principal may perform an operation.

pub mod api_key;
pub mod config;
pub mod errors;
pub mod principal;
pub mod rls;
pub mod rules;

pub use api_key::{ApiKey, IssuedApiKey};
pub use config::{AuthMode, AuthorizationConfig};
pub use errors::{AuthError, AuthResult};
pub use principal::Principal;
pub use rls::ListScope;
pub use rules::{AuthRule, Operation, OperationSet, PrincipalSelector, DEFAULT_OWNER_FIELD};
