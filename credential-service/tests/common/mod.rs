#![allow(dead_code)]

//! Shared fixtures for the integration suites: in-memory store, signer,
//! and a recording notification dispatcher.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use credential_service::config::ApiKeySettings;
use credential_service::error::{CredentialError, Result};
use credential_service::models::{NewAccount, OtpPurpose, Role};
use credential_service::notify::{Destination, NotificationDispatcher};
use credential_service::services::{
    AccountAuthenticator, ApiKeyLifecycleManager, OtpChallengeManager,
};
use credential_service::store::MemoryStore;
use token_security::TokenSigner;

/// Strong enough to clear the entropy gate in registration.
pub const GOOD_PASSWORD: &str = "vElvet!Quasar7-Lantern";

pub const TEST_SECRET: &str = "J8Kq2mPvRx4TnZs9YwLcGf7DhBe3Xa6Wq5Lj1BtNu0Zp";

pub fn test_signer() -> Arc<TokenSigner> {
    Arc::new(TokenSigner::new(TEST_SECRET, "filebox", 3_600_000, 30))
}

pub fn api_key_settings() -> ApiKeySettings {
    ApiKeySettings {
        sliding_window_days: 7,
        renewal_threshold_days: 3,
    }
}

/// A dispatched code captured by the recording dispatcher.
#[derive(Debug, Clone)]
pub struct SentCode {
    pub destination: Destination,
    pub code: String,
    pub purpose: OtpPurpose,
}

/// Test dispatcher: records every send, optionally failing on demand.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<SentCode>>,
    pub fail_next: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last_code(&self, purpose: OtpPurpose) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.purpose == purpose)
            .map(|s| s.code.clone())
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_next.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(
        &self,
        destination: &Destination,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<()> {
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(CredentialError::NotificationDeliveryFailed(
                "injected transport failure".to_string(),
            ));
        }

        self.sent.lock().unwrap().push(SentCode {
            destination: destination.clone(),
            code: code.to_string(),
            purpose,
        });
        Ok(())
    }
}

/// Everything the suites need, wired against one in-memory store.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub signer: Arc<TokenSigner>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub authenticator: AccountAuthenticator,
    pub api_keys: ApiKeyLifecycleManager,
    pub otp: OtpChallengeManager,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_otp_expiry(10)
    }

    pub fn with_otp_expiry(expire_minutes: i64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let signer = test_signer();
        let dispatcher = RecordingDispatcher::new();

        let authenticator = AccountAuthenticator::new(store.clone(), signer.clone());
        let api_keys =
            ApiKeyLifecycleManager::new(store.clone(), signer.clone(), &api_key_settings());
        let otp = OtpChallengeManager::new(
            store.clone(),
            signer.clone(),
            dispatcher.clone(),
            expire_minutes,
        );

        Self {
            store,
            signer,
            dispatcher,
            authenticator,
            api_keys,
            otp,
        }
    }

    /// Register an account with a username and email.
    pub async fn register_account(
        &self,
        username: &str,
    ) -> credential_service::models::AccountCredential {
        self.authenticator
            .register(NewAccount {
                username: Some(username.to_string()),
                email: Some(format!("{username}@example.com")),
                phone: None,
                password: GOOD_PASSWORD.to_string(),
                roles: vec![Role::new("user")],
            })
            .await
            .expect("registration should succeed")
    }
}
