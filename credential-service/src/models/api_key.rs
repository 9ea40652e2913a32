use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deployment environment a key is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyEnvironment {
    Production,
    Testing,
}

impl ApiKeyEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyEnvironment::Production => "PRODUCTION",
            ApiKeyEnvironment::Testing => "TESTING",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "PRODUCTION" => Some(ApiKeyEnvironment::Production),
            "TESTING" => Some(ApiKeyEnvironment::Testing),
            _ => None,
        }
    }
}

/// Lifecycle validity of a key. Once revoked, a record never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyValidity {
    Valid,
    Revoked,
}

impl ApiKeyValidity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyValidity::Valid => "VALID",
            ApiKeyValidity::Revoked => "REVOKED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "VALID" => Some(ApiKeyValidity::Valid),
            "REVOKED" => Some(ApiKeyValidity::Revoked),
            _ => None,
        }
    }
}

/// Enumerated capability tags grantable to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyPermission {
    Read,
    Write,
    Delete,
    Share,
    Admin,
}

impl ApiKeyPermission {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiKeyPermission::Read => "READ",
            ApiKeyPermission::Write => "WRITE",
            ApiKeyPermission::Delete => "DELETE",
            ApiKeyPermission::Share => "SHARE",
            ApiKeyPermission::Admin => "ADMIN",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "READ" => Some(ApiKeyPermission::Read),
            "WRITE" => Some(ApiKeyPermission::Write),
            "DELETE" => Some(ApiKeyPermission::Delete),
            "SHARE" => Some(ApiKeyPermission::Share),
            "ADMIN" => Some(ApiKeyPermission::Admin),
            _ => None,
        }
    }
}

/// Persisted API-key credential.
///
/// The raw key string is never stored; `key_hash` is its SHA-256 digest and
/// `key_prefix` the masked display form computed once at issuance.
///
/// Invariants: `effective_expires_at <= max_allowed_expiration` at all
/// times; `usage_count` is monotonically non-decreasing; a revoked record
/// is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyCredential {
    pub id: Uuid,
    /// Owning tenant; the current design sets this to the owner account id
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<ApiKeyPermission>,
    pub environment: ApiKeyEnvironment,
    /// Hex SHA-256 of the raw key; the lookup key for validation
    pub key_hash: String,
    /// Masked display form (first four + mask + last four)
    pub key_prefix: String,
    pub active: bool,
    pub validity: ApiKeyValidity,
    /// Current expiration; slides forward on active use
    pub effective_expires_at: DateTime<Utc>,
    /// Hard cap the sliding window can never exceed
    pub max_allowed_expiration: DateTime<Utc>,
    pub last_extended_at: Option<DateTime<Utc>>,
    pub extension_count: i64,
    pub usage_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKeyCredential {
    /// Whether the record is live: active and not revoked
    pub fn is_live(&self) -> bool {
        self.active && self.validity == ApiKeyValidity::Valid
    }

    /// Whether the sliding window has lapsed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.effective_expires_at
    }

    /// Whether the hard cap still leaves room to extend at `now`
    pub fn can_extend_at(&self, now: DateTime<Utc>) -> bool {
        now < self.max_allowed_expiration
    }

    pub fn permission_labels(&self) -> Vec<String> {
        self.permissions.iter().map(|p| p.as_str().to_string()).collect()
    }
}

/// Result of key generation: the only moment the raw key exists outside
/// the caller's hands.
#[derive(Debug)]
pub struct GeneratedApiKey {
    /// Raw key string, returned exactly once and unrecoverable afterwards
    pub raw_key: String,
    pub record: ApiKeyCredential,
}
