//! In-memory credential store backend.
//!
//! All state lives behind a single async mutex, so every trait call is one
//! critical section and per-record read-modify-writes serialize trivially.
//! Used for development and for exercising the lifecycle managers in tests
//! without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{CredentialError, Result};
use crate::models::{
    AccountCredential, ApiKeyCredential, OtpChallenge, OtpPurpose, VerificationChannel,
};
use crate::store::CredentialStore;

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, AccountCredential>,
    api_keys: HashMap<Uuid, ApiKeyCredential>,
    otp_challenges: HashMap<(Uuid, OtpPurpose), OtpChallenge>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace an API-key record wholesale, bypassing the lifecycle
    /// guards. Fixture support for tests that need to reposition a key
    /// inside its expiration window.
    pub async fn put_api_key(&self, record: ApiKeyCredential) {
        let mut state = self.state.lock().await;
        state.api_keys.insert(record.id, record);
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_account(&self, account: AccountCredential) -> Result<AccountCredential> {
        let mut state = self.state.lock().await;

        let taken = state.accounts.values().any(|existing| {
            identifier_clash(&existing.username, &account.username)
                || identifier_clash(&existing.email, &account.email)
                || identifier_clash(&existing.phone, &account.phone)
        });
        if taken {
            return Err(CredentialError::CredentialAlreadyExists);
        }

        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<AccountCredential>> {
        let state = self.state.lock().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountCredential>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.username.as_deref() == Some(username))
            .cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<AccountCredential>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_account_by_phone(&self, phone: &str) -> Result<Option<AccountCredential>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn mark_account_verified(
        &self,
        id: Uuid,
        channel: VerificationChannel,
    ) -> Result<AccountCredential> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(CredentialError::CredentialNotFound)?;

        account.is_verified = true;
        match channel {
            VerificationChannel::Email => account.is_email_verified = true,
            VerificationChannel::Phone => account.is_phone_verified = true,
        }
        account.updated_at = Utc::now();

        Ok(account.clone())
    }

    async fn update_account_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(CredentialError::CredentialNotFound)?;

        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_api_key(&self, key: ApiKeyCredential) -> Result<ApiKeyCredential> {
        let mut state = self.state.lock().await;
        state.api_keys.insert(key.id, key.clone());
        Ok(key)
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyCredential>> {
        let state = self.state.lock().await;
        Ok(state
            .api_keys
            .values()
            .find(|k| k.key_hash == key_hash && k.is_live())
            .cloned())
    }

    async fn find_api_key(
        &self,
        owner_id: Uuid,
        key_id: Uuid,
    ) -> Result<Option<ApiKeyCredential>> {
        let state = self.state.lock().await;
        Ok(state
            .api_keys
            .get(&key_id)
            .filter(|k| k.user_id == owner_id)
            .cloned())
    }

    async fn record_api_key_usage(
        &self,
        key_id: Uuid,
        used_at: DateTime<Utc>,
        extend_to: Option<DateTime<Utc>>,
    ) -> Result<Option<ApiKeyCredential>> {
        let mut state = self.state.lock().await;
        let Some(key) = state.api_keys.get_mut(&key_id) else {
            return Ok(None);
        };

        // A revoke that landed first wins; usage is not recorded on a dead row.
        if !key.is_live() {
            return Ok(None);
        }

        key.usage_count += 1;
        key.last_used_at = Some(used_at);
        if let Some(new_expiry) = extend_to {
            key.effective_expires_at = new_expiry;
            key.last_extended_at = Some(used_at);
            key.extension_count += 1;
        }
        key.updated_at = used_at;

        Ok(Some(key.clone()))
    }

    async fn revoke_api_key(
        &self,
        owner_id: Uuid,
        key_id: Uuid,
    ) -> Result<Option<ApiKeyCredential>> {
        let mut state = self.state.lock().await;
        let Some(key) = state.api_keys.get_mut(&key_id) else {
            return Ok(None);
        };
        if key.user_id != owner_id {
            return Ok(None);
        }

        if key.is_live() {
            key.active = false;
            key.validity = crate::models::ApiKeyValidity::Revoked;
            key.updated_at = Utc::now();
        }

        Ok(Some(key.clone()))
    }

    async fn upsert_otp_challenge(&self, challenge: OtpChallenge) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .otp_challenges
            .insert((challenge.account_id, challenge.purpose), challenge);
        Ok(())
    }

    async fn find_otp_challenge(
        &self,
        account_id: Uuid,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>> {
        let state = self.state.lock().await;
        Ok(state.otp_challenges.get(&(account_id, purpose)).cloned())
    }

    async fn consume_otp_challenge(
        &self,
        account_id: Uuid,
        purpose: OtpPurpose,
        code: &str,
        consumed_sent_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let Some(challenge) = state.otp_challenges.get_mut(&(account_id, purpose)) else {
            return Ok(false);
        };

        // Conditional on the stored code: a regeneration that replaced the
        // challenge in the meantime must not be consumed by the old code.
        if challenge.code != code {
            return Ok(false);
        }

        challenge.sent_at = consumed_sent_at;
        challenge.updated_at = Utc::now();
        Ok(true)
    }
}

fn identifier_clash(existing: &Option<String>, candidate: &Option<String>) -> bool {
    matches!((existing, candidate), (Some(a), Some(b)) if a == b)
}
