use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability label attached to an account.
///
/// Roles are a plain value-type set resolved fresh from the store whenever
/// they matter; nothing in the engine caches or lazily traverses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Verification channel an account can complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationChannel {
    Email,
    Phone,
}

/// Account credential record - core identity entity.
///
/// Carries three alternate login identifiers (at least one set), the
/// password digest and the verification flags. Accounts are created at
/// registration, mutated on verification and password change, and never
/// hard-deleted by this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCredential {
    pub id: Uuid,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_verified: bool,
    pub is_email_verified: bool,
    pub is_phone_verified: bool,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountCredential {
    /// Role labels as plain strings, for embedding in token claims
    pub fn role_labels(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.0.clone()).collect()
    }

    /// Whether the account has at least one login identifier
    pub fn has_identifier(&self) -> bool {
        self.username.is_some() || self.email.is_some() || self.phone.is_some()
    }
}

/// Registration input for a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub roles: Vec<Role>,
}
