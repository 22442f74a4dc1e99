//! The caller context presented at authorization time.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::api_key::ApiKey;
use super::errors::{AuthError, AuthResult};

/// Caller identity and credentials, evaluated at `now`.
///
/// Authentication happens upstream; a principal only carries its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Authenticated identity (None if anonymous)
    pub identity: Option<String>,
    /// Group memberships of the identity
    pub groups: BTreeSet<String>,
    /// API key presented with the request
    pub api_key: Option<ApiKey>,
    /// Instant the request is evaluated at
    pub now: DateTime<Utc>,
}

impl Principal {
    pub fn anonymous(now: DateTime<Utc>) -> Self {
        Self {
            identity: None,
            groups: BTreeSet::new(),
            api_key: None,
            now,
        }
    }

    /// Caller authenticated only by an API key
    pub fn with_api_key(api_key: ApiKey, now: DateTime<Utc>) -> Self {
        Self {
            api_key: Some(api_key),
            ..Self::anonymous(now)
        }
    }

    /// Caller authenticated as `identity`
    pub fn user(identity: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            identity: Some(identity.into()),
            ..Self::anonymous(now)
        }
    }

    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn require_identity(&self) -> AuthResult<&str> {
        self.identity().ok_or(AuthError::AuthenticationRequired)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    pub fn has_valid_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|key| key.is_valid_at(self.now))
    }
}
