//! JWT-based identity for controlview.
//!
//! Identity only decides which of a space's recipes serves a request: members
//! get the private recipe, everyone else the public one. Requests without a
//! usable token are served as [`GUEST`].

use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// User name for unauthenticated requests.
pub const GUEST: &str = "GUEST";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user name)
    pub sub: String,
    /// Expiry (Unix timestamp)
    pub exp: u64,
    /// Audience (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Errors while verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    Expired,
}

/// Holds the key used for JWT verification.
#[derive(Clone)]
pub struct KeyStore {
    key: Option<DecodingKey>,
    /// Expected audience (optional)
    expected_aud: Option<String>,
    /// Clock skew leeway in seconds (default: 60)
    leeway_secs: u64,
}

impl KeyStore {
    pub fn new() -> Self {
        Self {
            key: None,
            expected_aud: None,
            leeway_secs: 60,
        }
    }

    pub fn set_secret(&mut self, secret: impl AsRef<[u8]>) {
        self.key = Some(DecodingKey::from_secret(secret.as_ref()));
    }

    /// Set expected audience for validation.
    pub fn set_expected_aud(&mut self, aud: impl Into<String>) {
        self.expected_aud = Some(aud.into());
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Decode and validate a JWT token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        // Fail closed if no key configured
        let Some(key) = &self.key else {
            return Err(AuthError::InvalidToken("no key configured".into()));
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        if let Some(ref aud) = self.expected_aud {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }

        decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AuthError::InvalidToken("audience mismatch".into())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for authentication.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Secret for user tokens (env: CONTROLVIEW_AUTH_SECRET)
    pub secret: Option<String>,
    /// Expected audience (optional)
    pub expected_aud: Option<String>,
}

impl AuthConfig {
    pub fn build_keystore(&self) -> KeyStore {
        let mut store = KeyStore::new();
        if let Some(ref secret) = self.secret {
            store.set_secret(secret.as_bytes());
        }
        if let Some(ref aud) = self.expected_aud {
            store.set_expected_aud(aud);
        }
        store
    }
}

/// Shared verifier handed to request resolution.
#[derive(Clone, Default)]
pub struct AuthState {
    pub keystore: Arc<KeyStore>,
}

impl AuthState {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            keystore: Arc::new(config.build_keystore()),
        }
    }

    /// User making the request, or [`GUEST`].
    pub fn user_for(&self, headers: &HeaderMap) -> String {
        let Some(token) = extract_bearer_token(headers) else {
            return GUEST.to_string();
        };
        match self.keystore.verify(token) {
            Ok(claims) => claims.sub,
            Err(e) => {
                warn!("auth failed, serving as guest: {}", e);
                GUEST.to_string()
            }
        }
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Helper to create a user token for testing/CLI
pub fn create_user_token(secret: &[u8], sub: &str, expires_in_secs: u64) -> Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let exp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs()
        + expires_in_secs;

    let claims = Claims {
        sub: sub.to_string(),
        exp,
        aud: None,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| anyhow!("failed to encode token: {}", e))
}
