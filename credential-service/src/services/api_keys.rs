//! API-key lifecycle: generation, validation with sliding-window renewal,
//! and revocation.
//!
//! An API key is a signed token whose cryptographic expiry is a year out;
//! its *real* expiration is the database record's sliding window. Active
//! use pushes `effective_expires_at` forward, never past the hard cap set
//! at creation, and revocation kills the record immediately without
//! touching the token.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use token_security::{display_prefix, sha256_hex, TokenSigner};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ApiKeySettings;
use crate::error::{CredentialError, Result};
use crate::models::{
    AccountCredential, ApiKeyCredential, ApiKeyEnvironment, ApiKeyPermission, ApiKeyValidity,
    GeneratedApiKey,
};
use crate::store::CredentialStore;

/// Initial validity window granted at generation.
const DEFAULT_VALIDITY_DAYS: i64 = 15;

/// Hard cap on total lifetime, measured from creation.
const MAX_VALIDITY_DAYS: i64 = 90;

/// A key must have been used within this many days to qualify for renewal.
const ACTIVE_USE_WINDOW_DAYS: i64 = 5;

/// Renewal knobs taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RenewalPolicy {
    pub sliding_window_days: i64,
    pub renewal_threshold_days: i64,
}

impl From<&ApiKeySettings> for RenewalPolicy {
    fn from(settings: &ApiKeySettings) -> Self {
        Self {
            sliding_window_days: settings.sliding_window_days,
            renewal_threshold_days: settings.renewal_threshold_days,
        }
    }
}

pub struct ApiKeyLifecycleManager {
    store: Arc<dyn CredentialStore>,
    signer: Arc<TokenSigner>,
    policy: RenewalPolicy,
}

impl ApiKeyLifecycleManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        signer: Arc<TokenSigner>,
        settings: &ApiKeySettings,
    ) -> Self {
        Self {
            store,
            signer,
            policy: RenewalPolicy::from(settings),
        }
    }

    /// Generate a new key for the owner account.
    ///
    /// The raw key string is returned exactly once; only its hash and the
    /// masked display prefix are persisted, so it is unrecoverable
    /// afterwards.
    pub async fn generate(
        &self,
        owner: &AccountCredential,
        name: &str,
        permissions: Vec<ApiKeyPermission>,
        environment: ApiKeyEnvironment,
        description: Option<String>,
    ) -> Result<GeneratedApiKey> {
        let owner_id = owner.id.to_string();
        let permission_labels: Vec<String> = permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        // Tenant and user are the same account in the current design
        let raw_key = self.signer.issue_api_key_token(
            &owner_id,
            &owner_id,
            &permission_labels,
            name,
            environment.as_str(),
        )?;

        let now = Utc::now();
        let record = ApiKeyCredential {
            id: Uuid::new_v4(),
            tenant_id: owner.id,
            user_id: owner.id,
            name: name.to_string(),
            description,
            permissions,
            environment,
            key_hash: sha256_hex(raw_key.as_bytes()),
            key_prefix: display_prefix(&raw_key),
            active: true,
            validity: ApiKeyValidity::Valid,
            effective_expires_at: now + Duration::days(DEFAULT_VALIDITY_DAYS),
            max_allowed_expiration: now + Duration::days(MAX_VALIDITY_DAYS),
            last_extended_at: None,
            extension_count: 0,
            usage_count: 0,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };

        let record = self.store.insert_api_key(record).await?;

        info!(
            api_key_id = %record.id,
            owner_id = %owner.id,
            name = %record.name,
            environment = %record.environment.as_str(),
            "API key generated"
        );

        Ok(GeneratedApiKey { raw_key, record })
    }

    /// Validate a raw key and record the use, extending the sliding window
    /// when the renewal conditions hold.
    pub async fn validate_and_consume(&self, raw_key: &str) -> Result<ApiKeyCredential> {
        let key_hash = sha256_hex(raw_key.as_bytes());
        let key = self
            .store
            .find_api_key_by_hash(&key_hash)
            .await?
            .ok_or(CredentialError::CredentialNotFound)?;

        let now = Utc::now();
        if key.is_expired_at(now) {
            warn!(api_key_id = %key.id, "expired API key presented");
            return Err(CredentialError::ApiKeyInactiveOrExpired);
        }

        // Project the usage update the way the atomic write will apply it,
        // then evaluate renewal against the projected record: the use being
        // recorded right now counts as recent activity for this key.
        let mut projected = key.clone();
        projected.usage_count += 1;
        projected.last_used_at = Some(now);
        let extend_to = evaluate_renewal(&projected, now, &self.policy);

        // Usage bump and extension land in one atomic row update; a revoke
        // that raced us wins and the usage is not recorded.
        let updated = self
            .store
            .record_api_key_usage(key.id, now, extend_to)
            .await?
            .ok_or(CredentialError::ApiKeyInactiveOrExpired)?;

        if let Some(new_expiry) = extend_to {
            info!(
                api_key_id = %updated.id,
                new_expiry = %new_expiry,
                extension_count = updated.extension_count,
                "API key expiration extended"
            );
        }

        Ok(updated)
    }

    /// Read-only liveness check: never records usage, never extends.
    pub async fn is_active(&self, raw_key: &str) -> Result<bool> {
        let key_hash = sha256_hex(raw_key.as_bytes());
        match self.store.find_api_key_by_hash(&key_hash).await? {
            Some(key) => Ok(!key.is_expired_at(Utc::now())),
            None => Ok(false),
        }
    }

    /// Revoke a key scoped to its owner.
    ///
    /// Idempotent: revoking an already-revoked key succeeds and leaves the
    /// terminal state untouched. An unknown key id for this owner is
    /// `CredentialNotFound`.
    pub async fn revoke(&self, owner_id: Uuid, key_id: Uuid) -> Result<ApiKeyCredential> {
        let revoked = self
            .store
            .revoke_api_key(owner_id, key_id)
            .await?
            .ok_or(CredentialError::CredentialNotFound)?;

        info!(api_key_id = %key_id, owner_id = %owner_id, "API key revoked");
        Ok(revoked)
    }
}

/// Decide whether a validated key earns a window extension, and to when.
///
/// All three conditions must hold: the key is within the renewal threshold
/// of expiring, the hard cap has not passed, and the key has been used in
/// the last five days. The candidate expiry is clamped to the cap so the
/// window can never escape it.
fn evaluate_renewal(
    key: &ApiKeyCredential,
    now: DateTime<Utc>,
    policy: &RenewalPolicy,
) -> Option<DateTime<Utc>> {
    let threshold = key.effective_expires_at - Duration::days(policy.renewal_threshold_days);
    if now <= threshold {
        return None;
    }

    if !key.can_extend_at(now) {
        return None;
    }

    let actively_used = key
        .last_used_at
        .map(|used| now - used <= Duration::days(ACTIVE_USE_WINDOW_DAYS))
        .unwrap_or(false);
    if !actively_used {
        return None;
    }

    let candidate = now + Duration::days(policy.sliding_window_days);
    Some(candidate.min(key.max_allowed_expiration))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RenewalPolicy {
        RenewalPolicy {
            sliding_window_days: 7,
            renewal_threshold_days: 3,
        }
    }

    fn key_created_at(created: DateTime<Utc>) -> ApiKeyCredential {
        ApiKeyCredential {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "test-key".to_string(),
            description: None,
            permissions: vec![ApiKeyPermission::Read],
            environment: ApiKeyEnvironment::Testing,
            key_hash: "hash".to_string(),
            key_prefix: "eyJh****************abcd".to_string(),
            active: true,
            validity: ApiKeyValidity::Valid,
            effective_expires_at: created + Duration::days(DEFAULT_VALIDITY_DAYS),
            max_allowed_expiration: created + Duration::days(MAX_VALIDITY_DAYS),
            last_extended_at: None,
            extension_count: 0,
            usage_count: 0,
            last_used_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_renewal_at_day_thirteen_extends_to_day_twenty() {
        let created = Utc::now() - Duration::days(13);
        let mut key = key_created_at(created);
        let now = Utc::now();
        key.last_used_at = Some(now);

        // Day 13 of a 15-day window with a 3-day threshold: eligible
        let extend_to = evaluate_renewal(&key, now, &policy()).expect("should extend");
        assert_eq!(extend_to, now + Duration::days(7));
        assert!(extend_to < key.max_allowed_expiration);
    }

    #[test]
    fn test_no_renewal_outside_threshold() {
        let created = Utc::now() - Duration::days(5);
        let mut key = key_created_at(created);
        let now = Utc::now();
        key.last_used_at = Some(now);

        // Ten days of window left, threshold is three: not eligible yet
        assert!(evaluate_renewal(&key, now, &policy()).is_none());
    }

    #[test]
    fn test_extension_clamped_to_hard_cap() {
        let created = Utc::now() - Duration::days(88);
        let mut key = key_created_at(created);
        let now = Utc::now();
        key.last_used_at = Some(now);
        // Window kept alive until day 89
        key.effective_expires_at = created + Duration::days(89);

        let extend_to = evaluate_renewal(&key, now, &policy()).expect("should extend");
        // now + 7 would land on day 95; the cap wins
        assert_eq!(extend_to, key.max_allowed_expiration);
    }

    #[test]
    fn test_no_renewal_past_hard_cap() {
        let created = Utc::now() - Duration::days(91);
        let mut key = key_created_at(created);
        let now = Utc::now();
        key.last_used_at = Some(now);
        key.effective_expires_at = key.max_allowed_expiration;

        assert!(evaluate_renewal(&key, now, &policy()).is_none());
    }

    #[test]
    fn test_no_renewal_without_recent_use() {
        let created = Utc::now() - Duration::days(13);
        let mut key = key_created_at(created);
        let now = Utc::now();
        // Last use predates the five-day activity window
        key.last_used_at = Some(now - Duration::days(6));

        assert!(evaluate_renewal(&key, now, &policy()).is_none());
    }

    #[test]
    fn test_no_renewal_when_never_used() {
        let created = Utc::now() - Duration::days(13);
        let key = key_created_at(created);

        assert!(evaluate_renewal(&key, Utc::now(), &policy()).is_none());
    }
}
