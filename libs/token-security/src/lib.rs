//! Token signing and verification for the filebox credential engine.
//!
//! All bearer credentials issued by filebox are HS256-signed claim tokens
//! sharing a single symmetric secret. Three token classes exist:
//!
//! - **access** — short-lived session credential
//! - **refresh** — long-lived credential used only to mint new access tokens
//! - **api_key** — long-lived programmatic credential; its cryptographic
//!   expiry is intentionally far out (one year) because the real expiration
//!   is governed by the database-backed sliding window, which can revoke or
//!   expire a key early without re-minting anything
//!
//! Signing and verification are pure CPU-bound computation over the signer
//! value; there is no shared mutable state and no I/O.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod hash;
pub mod secret_strength;

pub use hash::{display_prefix, sha256_hex};
pub use secret_strength::{validate_secret_strength, SecretStrength};

/// Cryptographic expiry of API-key tokens. Early expiration is enforced by
/// the credential store, never by the token itself.
const API_KEY_TOKEN_EXPIRY_DAYS: i64 = 365;

/// Audience and scope stamped into every API-key token.
const API_KEY_AUDIENCE: &str = "filebox";
const API_KEY_SCOPE: &str = "filebox";

/// Signing algorithm for all filebox token classes.
const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Token class discriminator carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "ACCESS")]
    Access,
    #[serde(rename = "REFRESH")]
    Refresh,
    #[serde(rename = "API_KEY")]
    ApiKey,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "ACCESS",
            TokenType::Refresh => "REFRESH",
            TokenType::ApiKey => "API_KEY",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by filebox tokens.
///
/// Session tokens populate `sub`, `iat`, `exp`, `token_type` and (for access
/// tokens) `roles`. API-key tokens additionally carry issuer, audience,
/// scope and the key metadata supplied at generation time. The metadata is
/// embedded for offline introspection only; authorization decisions are
/// always made against the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID for sessions, owner account ID for API keys)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Token class discriminator
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Role labels at issuance time (access tokens only, informational)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Access + refresh token pair issued on successful authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Verification failures, one variant per distinct failure mode.
///
/// Callers branch on these kinds (an expired session token and a tampered
/// one get different treatment upstream), so they are never folded into a
/// single opaque error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is empty")]
    Empty,

    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token algorithm is not supported")]
    UnsupportedAlgorithm,

    #[error("token signature verification failed")]
    BadSignature,

    #[error("token type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: TokenType,
        actual: TokenType,
    },

    #[error("failed to sign token: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, TokenError>;

/// Stateless signer/verifier for all filebox token classes.
///
/// Holds the HS256 key material derived from the shared secret plus the
/// configured expirations. Constructed once at startup and passed by
/// reference; safe to share across tasks without locking.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl TokenSigner {
    /// Build a signer from the shared secret.
    ///
    /// ## Arguments
    ///
    /// * `secret` - symmetric signing key material (`JWT_SECRET`)
    /// * `issuer` - `iss` claim stamped into API-key tokens
    /// * `access_token_expiration_ms` - access token lifetime in milliseconds
    /// * `refresh_token_expiration_days` - refresh token lifetime in days
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        access_token_expiration_ms: i64,
        refresh_token_expiration_days: i64,
    ) -> Self {
        if validate_secret_strength(secret) == SecretStrength::Weak {
            warn!("signing secret is weak (short or low entropy); rotate it before production use");
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
            access_token_ttl: Duration::milliseconds(access_token_expiration_ms),
            refresh_token_ttl: Duration::days(refresh_token_expiration_days),
        }
    }

    /// Access token lifetime in whole seconds.
    pub fn access_token_ttl_seconds(&self) -> i64 {
        self.access_token_ttl.num_seconds()
    }

    /// Issue a short-lived session access token.
    ///
    /// The role labels are embedded for offline introspection; they are
    /// re-read from the store wherever they matter.
    pub fn issue_access_token(&self, subject: &str, roles: &[String]) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_token_ttl).timestamp(),
            token_type: TokenType::Access,
            iss: None,
            aud: None,
            scope: None,
            roles: Some(roles.to_vec()),
            tenant_id: None,
            user_id: None,
            permissions: None,
            api_key_name: None,
            environment: None,
        };

        self.sign(&claims)
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_token_ttl).timestamp(),
            token_type: TokenType::Refresh,
            iss: None,
            aud: None,
            scope: None,
            roles: None,
            tenant_id: None,
            user_id: None,
            permissions: None,
            api_key_name: None,
            environment: None,
        };

        self.sign(&claims)
    }

    /// Issue an access + refresh pair in one call.
    pub fn issue_session_pair(&self, subject: &str, roles: &[String]) -> Result<TokenPair> {
        let access_token = self.issue_access_token(subject, roles)?;
        let refresh_token = self.issue_refresh_token(subject)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl.num_seconds(),
        })
    }

    /// Issue a raw API-key token with a fixed one-year cryptographic expiry.
    ///
    /// The supplied metadata is embedded in the claims for offline
    /// introspection. It is never trusted for authorization: the credential
    /// store record, not the token, decides whether a key is live.
    pub fn issue_api_key_token(
        &self,
        tenant_id: &str,
        user_id: &str,
        permissions: &[String],
        name: &str,
        environment: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(API_KEY_TOKEN_EXPIRY_DAYS)).timestamp(),
            token_type: TokenType::ApiKey,
            iss: Some(self.issuer.clone()),
            aud: Some(API_KEY_AUDIENCE.to_string()),
            scope: Some(API_KEY_SCOPE.to_string()),
            roles: None,
            tenant_id: Some(tenant_id.to_string()),
            user_id: Some(user_id.to_string()),
            permissions: Some(permissions.to_vec()),
            api_key_name: Some(name.to_string()),
            environment: Some(environment.to_string()),
        };

        self.sign(&claims)
    }

    /// Verify signature, expiry and token class; fails closed.
    ///
    /// A decodable token whose `token_type` differs from `expected` is
    /// rejected as [`TokenError::TypeMismatch`] so that, for example, an
    /// access token can never be replayed through the refresh path.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims> {
        if token.trim().is_empty() {
            return Err(TokenError::Empty);
        }

        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.validate_exp = true;
        // API-key tokens carry aud=filebox for introspection; the store is
        // authoritative, so the verifier does not match audiences.
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| Self::map_decode_error(e.kind()))?;

        if data.claims.token_type != expected {
            return Err(TokenError::TypeMismatch {
                expected,
                actual: data.claims.token_type,
            });
        }

        Ok(data.claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(TOKEN_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn map_decode_error(kind: &ErrorKind) -> TokenError {
        match kind {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            _ => TokenError::Malformed,
        }
    }
}
