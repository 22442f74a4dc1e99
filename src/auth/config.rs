//! Global authorization configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{SchemaError, SchemaResult};

/// Authorization mode clients use when a request does not pick one.
///
/// Group and owner rules are evaluated against user-pool identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMode {
    #[default]
    ApiKey,
    UserPool,
    Iam,
    Oidc,
    Lambda,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::ApiKey => "apiKey",
            AuthMode::UserPool => "userPool",
            AuthMode::Iam => "iam",
            AuthMode::Oidc => "oidc",
            AuthMode::Lambda => "lambda",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization modes block of a schema definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthorizationConfig {
    #[serde(default)]
    pub default_authorization_mode: AuthMode,

    /// Lifetime of issued API keys (optional, default 7)
    #[serde(default = "default_api_key_expires_in_days")]
    pub api_key_expires_in_days: i64,
}

fn default_api_key_expires_in_days() -> i64 {
    7
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            default_authorization_mode: AuthMode::default(),
            api_key_expires_in_days: default_api_key_expires_in_days(),
        }
    }
}

impl AuthorizationConfig {
    pub fn new(default_authorization_mode: AuthMode, api_key_expires_in_days: i64) -> Self {
        Self {
            default_authorization_mode,
            api_key_expires_in_days,
        }
    }

    pub fn validate(&self) -> SchemaResult<()> {
        if self.api_key_expires_in_days < 1 {
            return Err(SchemaError::invalid_expiry(self.api_key_expires_in_days));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;

    #[test]
    fn test_defaults() {
        let config: AuthorizationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AuthorizationConfig::default());
        assert_eq!(config.default_authorization_mode, AuthMode::ApiKey);
        assert_eq!(config.api_key_expires_in_days, 7);
    }

    #[test]
    fn test_camel_case_keys() {
        let config: AuthorizationConfig = serde_json::from_str(
            r#"{ "defaultAuthorizationMode": "userPool", "apiKeyExpiresInDays": 30 }"#,
        )
        .unwrap();
        assert_eq!(config, AuthorizationConfig::new(AuthMode::UserPool, 30));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let parsed = serde_json::from_str::<AuthorizationConfig>(r#"{ "apiKeyExpiresInDay": 30 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_expiry_must_be_positive() {
        for days in [1, 30, 365, 400, 10_000] {
            assert!(AuthorizationConfig::new(AuthMode::ApiKey, days).validate().is_ok());
        }

        for days in [-1, 0, i64::MIN] {
            let err = AuthorizationConfig::new(AuthMode::ApiKey, days)
                .validate()
                .unwrap_err();
            assert_eq!(err.code(), SchemaErrorCode::InvalidExpiry);
        }
    }
}
