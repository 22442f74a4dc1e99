//! # API Keys
//!
//! Keys are issued with a fixed lifetime. The raw secret is handed out once;
//! only its SHA-256 hash is kept, and verification compares in constant time.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// An issued API key, without its secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    /// URL-safe base64 SHA-256 of the secret
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued key together with its one-time secret
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub key: ApiKey,
    pub secret: String,
}

impl ApiKey {
    /// Issues a key valid for `expires_in_days` from `now`.
    ///
    /// A non-positive lifetime yields a key that is already expired.
    pub fn issue(expires_in_days: i64, now: DateTime<Utc>) -> IssuedApiKey {
        let secret = generate_secret();
        let expires_at = Duration::try_days(expires_in_days)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        IssuedApiKey {
            key: ApiKey {
                id: Uuid::new_v4(),
                secret_hash: hash_secret(&secret),
                created_at: now,
                expires_at,
            },
            secret,
        }
    }

    /// A key is valid strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn verify(&self, secret: &str) -> bool {
        let presented = hash_secret(secret);
        presented.as_bytes().ct_eq(self.secret_hash.as_bytes()).into()
    }
}

/// 256 random bits, URL-safe base64
fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}
