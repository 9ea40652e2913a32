//! Credential store boundary.
//!
//! The store exclusively owns persisted state: accounts, API-key records
//! and OTP challenges. The lifecycle managers hold no cross-request cached
//! copies; every operation re-reads the authoritative record through this
//! trait.
//!
//! ## Atomicity contract
//!
//! Implementations must apply each mutating call as a single atomic
//! read-modify-write scoped to one record: concurrent usage recording,
//! extension and revocation of the same API key must serialize per row, and
//! an OTP consume racing a regeneration must observe either the old or the
//! new challenge, never a torn mix. No cross-record locking is required.
//! The Postgres backend gets this from single-statement row updates; the
//! in-memory backend serializes all writes behind one async mutex.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AccountCredential, ApiKeyCredential, OtpChallenge, OtpPurpose, VerificationChannel,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    // ========== Accounts ==========

    /// Persist a new account, enforcing uniqueness over username, email and
    /// phone. Returns `CredentialAlreadyExists` when any identifier is
    /// already taken.
    async fn create_account(&self, account: AccountCredential) -> Result<AccountCredential>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<AccountCredential>>;

    async fn find_account_by_username(&self, username: &str)
        -> Result<Option<AccountCredential>>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountCredential>>;

    async fn find_account_by_phone(&self, phone: &str) -> Result<Option<AccountCredential>>;

    /// Mark the account verified through the given channel; sets the
    /// account-level `is_verified` flag together with the channel flag.
    async fn mark_account_verified(
        &self,
        id: Uuid,
        channel: VerificationChannel,
    ) -> Result<AccountCredential>;

    async fn update_account_password(&self, id: Uuid, password_hash: &str) -> Result<()>;

    // ========== API keys ==========

    async fn insert_api_key(&self, key: ApiKeyCredential) -> Result<ApiKeyCredential>;

    /// Look up a live key (active, not revoked) by the hex SHA-256 of its
    /// raw value. Revoked or deactivated rows are never returned.
    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyCredential>>;

    /// Owner-scoped lookup by key id.
    async fn find_api_key(
        &self,
        owner_id: Uuid,
        key_id: Uuid,
    ) -> Result<Option<ApiKeyCredential>>;

    /// Atomically record a use of the key: bump `usage_count`, set
    /// `last_used_at`, and, when `extend_to` is given, advance the sliding
    /// window (`effective_expires_at`, `last_extended_at`,
    /// `extension_count`) in the same write. The update is guarded on the
    /// row still being live, so a revoke that lands first wins; `None` is
    /// returned in that case.
    async fn record_api_key_usage(
        &self,
        key_id: Uuid,
        used_at: DateTime<Utc>,
        extend_to: Option<DateTime<Utc>>,
    ) -> Result<Option<ApiKeyCredential>>;

    /// Revoke a key scoped to its owner: `active = false`, `validity =
    /// REVOKED`. Idempotent; revoking an already-revoked key leaves the
    /// terminal state untouched. `None` when no such key exists for the
    /// owner.
    async fn revoke_api_key(
        &self,
        owner_id: Uuid,
        key_id: Uuid,
    ) -> Result<Option<ApiKeyCredential>>;

    // ========== OTP challenges ==========

    /// Overwrite the challenge slot for `(account, purpose)`; a fresh
    /// generation replaces any previous challenge rather than coexisting
    /// with it.
    async fn upsert_otp_challenge(&self, challenge: OtpChallenge) -> Result<()>;

    async fn find_otp_challenge(
        &self,
        account_id: Uuid,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>>;

    /// Consume a challenge by rewinding its `sent_at` to `consumed_sent_at`
    /// (far in the past), conditional on the stored code still matching
    /// `code`. Returns whether the conditional update applied; a `false`
    /// means a regeneration replaced the challenge in the meantime.
    async fn consume_otp_challenge(
        &self,
        account_id: Uuid,
        purpose: OtpPurpose,
        code: &str,
        consumed_sent_at: DateTime<Utc>,
    ) -> Result<bool>;
}
