//! Account authentication: registration, login with free-form identifiers,
//! and access-token refresh.

use chrono::Utc;
use std::sync::Arc;
use token_security::{TokenPair, TokenSigner, TokenType};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CredentialError, Result};
use crate::models::{AccountCredential, NewAccount};
use crate::security::{hash_password, verify_password};
use crate::store::CredentialStore;
use crate::validators::{
    classify_identifier, is_valid_e164, validate_email, validate_username, IdentifierKind,
};

pub struct AccountAuthenticator {
    store: Arc<dyn CredentialStore>,
    signer: Arc<TokenSigner>,
}

/// Result of refreshing a session: a new access token only. Refresh tokens
/// are never rotated or reissued by this path.
#[derive(Debug)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AccountAuthenticator {
    pub fn new(store: Arc<dyn CredentialStore>, signer: Arc<TokenSigner>) -> Self {
        Self { store, signer }
    }

    /// Register a new account. It starts unverified; completing an
    /// email-verification challenge flips the flags.
    pub async fn register(&self, new_account: NewAccount) -> Result<AccountCredential> {
        let NewAccount {
            username,
            email,
            phone,
            password,
            roles,
        } = new_account;

        if username.is_none() && email.is_none() && phone.is_none() {
            return Err(CredentialError::Validation(
                "at least one of username, email or phone is required".to_string(),
            ));
        }
        if let Some(u) = &username {
            if !validate_username(u) {
                return Err(CredentialError::Validation(
                    "username must be 3-32 characters, alphanumeric with - and _".to_string(),
                ));
            }
        }
        if let Some(e) = &email {
            if !validate_email(e) {
                return Err(CredentialError::Validation(
                    "invalid email address format".to_string(),
                ));
            }
        }
        if let Some(p) = &phone {
            if !is_valid_e164(p) {
                return Err(CredentialError::Validation(
                    "phone number must be in E.164 format (e.g., +14155551234)".to_string(),
                ));
            }
        }

        let password_hash = hash_password(&password)?;
        let now = Utc::now();

        let account = self
            .store
            .create_account(AccountCredential {
                id: Uuid::new_v4(),
                username,
                email,
                phone,
                password_hash,
                is_verified: false,
                is_email_verified: false,
                is_phone_verified: false,
                roles,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(account_id = %account.id, "account registered");
        Ok(account)
    }

    /// Authenticate a free-form identifier and password, returning a fresh
    /// session pair.
    ///
    /// The identifier is classified once (phone, email or username) and
    /// exactly one lookup path is attempted; there is no fallback chaining.
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<TokenPair> {
        let account = match classify_identifier(identifier) {
            IdentifierKind::Phone => self.store.find_account_by_phone(identifier).await?,
            IdentifierKind::Email => self.store.find_account_by_email(identifier).await?,
            IdentifierKind::Username => self.store.find_account_by_username(identifier).await?,
        }
        .ok_or(CredentialError::CredentialNotFound)?;

        if !verify_password(password, &account.password_hash)? {
            warn!(account_id = %account.id, "login with wrong password");
            return Err(CredentialError::VerificationFailed);
        }

        // Correct credentials on an unverified account is its own signal,
        // distinct from bad credentials
        if !account.is_verified {
            return Err(CredentialError::VerificationRequired);
        }

        let tokens = self
            .signer
            .issue_session_pair(&account.id.to_string(), &account.role_labels())?;

        info!(account_id = %account.id, "login succeeded");
        Ok(tokens)
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The token must verify as type REFRESH; the role set is re-read from
    /// the store rather than trusted from the token's claims, so role
    /// changes since issuance take effect immediately.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess> {
        let claims = self.signer.verify(refresh_token, TokenType::Refresh)?;

        let subject = Uuid::parse_str(&claims.sub).map_err(|_| {
            CredentialError::Validation("refresh token subject is not a valid account id".to_string())
        })?;

        let account = self
            .store
            .find_account_by_id(subject)
            .await?
            .ok_or(CredentialError::CredentialNotFound)?;

        let access_token = self
            .signer
            .issue_access_token(&account.id.to_string(), &account.role_labels())?;

        Ok(RefreshedAccess {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.signer.access_token_ttl_seconds(),
        })
    }

    /// Explicit password mutation, gated by the caller on a prior
    /// successful password-reset verification.
    pub async fn reset_password(&self, account_id: Uuid, new_password: &str) -> Result<()> {
        let password_hash = hash_password(new_password)?;
        self.store
            .update_account_password(account_id, &password_hash)
            .await?;

        info!(account_id = %account_id, "password reset");
        Ok(())
    }
}
