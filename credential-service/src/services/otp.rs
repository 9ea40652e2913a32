//! One-time-code challenges for email verification and password reset.
//!
//! A challenge is bound to one account and one purpose. Generating a new
//! code overwrites the previous challenge for that slot, and a consumed
//! challenge is invalidated by rewinding its `sent_at` outside the validity
//! window rather than deleting the row.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use token_security::{TokenPair, TokenSigner};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CredentialError, Result};
use crate::models::{AccountCredential, OtpChallenge, OtpPurpose, VerificationChannel};
use crate::notify::{Destination, NotificationDispatcher};
use crate::store::CredentialStore;

/// Inclusive code range: always six digits, no leading zero.
const OTP_CODE_MIN: u32 = 100_000;
const OTP_CODE_MAX: u32 = 999_999;

/// How far `sent_at` is rewound when a challenge is consumed.
const CONSUMED_REWIND_DAYS: i64 = 3650;

pub struct OtpChallengeManager {
    store: Arc<dyn CredentialStore>,
    signer: Arc<TokenSigner>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    expire_minutes: i64,
}

/// Purpose-specific result of a successful verification.
#[derive(Debug)]
pub enum OtpOutcome {
    /// Email ownership proven: the account is now verified and a session
    /// is opened for it.
    EmailVerified {
        account: AccountCredential,
        tokens: TokenPair,
    },
    /// Reset approved; the password change itself is a separate explicit
    /// step taking the new password.
    PasswordResetApproved { account_id: Uuid },
}

impl OtpChallengeManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        signer: Arc<TokenSigner>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        expire_minutes: i64,
    ) -> Self {
        Self {
            store,
            signer,
            dispatcher,
            expire_minutes,
        }
    }

    /// Generate a fresh code for `(account, purpose)` and dispatch it.
    ///
    /// The challenge is committed before delivery is attempted, so a
    /// delivery failure (`NotificationDeliveryFailed`) leaves a valid
    /// challenge behind: callers retry delivery, they do not regenerate.
    pub async fn generate(&self, account: &AccountCredential, purpose: OtpPurpose) -> Result<()> {
        let destination = delivery_destination(account)?;

        let code = generate_code();
        let now = Utc::now();
        self.store
            .upsert_otp_challenge(OtpChallenge {
                account_id: account.id,
                purpose,
                code: code.clone(),
                sent_at: now,
                updated_at: now,
            })
            .await?;

        // No store lock is held here; dispatch is an external blocking call
        self.dispatcher.send(&destination, &code, purpose).await?;

        info!(
            account_id = %account.id,
            purpose = %purpose,
            destination = %destination.masked(),
            "one-time code generated and dispatched"
        );
        Ok(())
    }

    /// Verify a submitted code against the live challenge.
    ///
    /// Whether no challenge exists or the code is wrong, the caller sees
    /// the same generic `VerificationFailed`; only expiry is reported
    /// separately. A matching code consumes the challenge before the
    /// purpose-specific outcome is produced.
    pub async fn verify(
        &self,
        account: &AccountCredential,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<OtpOutcome> {
        let challenge = self
            .store
            .find_otp_challenge(account.id, purpose)
            .await?
            .ok_or(CredentialError::VerificationFailed)?;

        let now = Utc::now();
        if is_challenge_expired(challenge.sent_at, self.expire_minutes, now) {
            return Err(CredentialError::OtpExpired);
        }

        if challenge.code != code {
            warn!(
                account_id = %account.id,
                purpose = %purpose,
                "one-time code mismatch"
            );
            return Err(CredentialError::VerificationFailed);
        }

        // Rewind sent_at so the code can never replay; conditional on the
        // stored code, so a regeneration that raced us stays live.
        let consumed_sent_at = now - Duration::days(CONSUMED_REWIND_DAYS);
        self.store
            .consume_otp_challenge(account.id, purpose, code, consumed_sent_at)
            .await?;

        match purpose {
            OtpPurpose::EmailVerify => {
                let account = self
                    .store
                    .mark_account_verified(account.id, VerificationChannel::Email)
                    .await?;
                let tokens = self
                    .signer
                    .issue_session_pair(&account.id.to_string(), &account.role_labels())?;

                info!(account_id = %account.id, "email verified; session opened");
                Ok(OtpOutcome::EmailVerified { account, tokens })
            }
            OtpPurpose::PasswordReset => {
                info!(account_id = %account.id, "password reset code accepted");
                Ok(OtpOutcome::PasswordResetApproved {
                    account_id: account.id,
                })
            }
        }
    }
}

/// Pick where the code goes. Email is the only wired-up channel; an
/// account reachable only by phone gets an explicit `NotImplemented` from
/// the dispatcher rather than a silent no-op.
fn delivery_destination(account: &AccountCredential) -> Result<Destination> {
    if let Some(email) = &account.email {
        return Ok(Destination::Email(email.clone()));
    }
    if let Some(phone) = &account.phone {
        return Ok(Destination::Phone(phone.clone()));
    }
    Err(CredentialError::Validation(
        "account has no deliverable destination for a one-time code".to_string(),
    ))
}

/// Uniform six-digit code in [100000, 999999].
fn generate_code() -> String {
    rand::thread_rng()
        .gen_range(OTP_CODE_MIN..=OTP_CODE_MAX)
        .to_string()
}

/// Expiry boundary is exclusive: a challenge is dead at exactly
/// `sent_at + expire_minutes`.
fn is_challenge_expired(
    sent_at: DateTime<Utc>,
    expire_minutes: i64,
    now: DateTime<Utc>,
) -> bool {
    now >= sent_at + Duration::minutes(expire_minutes)
}
