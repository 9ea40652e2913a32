use thiserror::Error;
use token_security::TokenError;

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Error taxonomy for the credential engine.
///
/// Every failure is returned to the caller as a typed value; no condition
/// here is fatal to the process. Lookup misses and OTP mismatches collapse
/// to the generic `CredentialNotFound` / `VerificationFailed` variants so
/// callers cannot distinguish which sub-check failed (identifier and code
/// enumeration resistance).
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Token verification failure; the inner kind stays distinct
    /// (malformed, expired, bad signature, type mismatch, ...)
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("credential not found")]
    CredentialNotFound,

    #[error("credential already exists")]
    CredentialAlreadyExists,

    #[error("verification failed")]
    VerificationFailed,

    /// Credentials are correct but the account has not completed
    /// verification; distinct from bad credentials
    #[error("account verification required")]
    VerificationRequired,

    #[error("verification code expired")]
    OtpExpired,

    #[error("API key is inactive or expired")]
    ApiKeyInactiveOrExpired,

    /// The challenge was persisted but could not be delivered; the caller
    /// may retry delivery without regenerating the code
    #[error("notification delivery failed: {0}")]
    NotificationDeliveryFailed(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("password too weak: {0}")]
    WeakPassword(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for CredentialError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("store error: {}", err);
        CredentialError::Store(err.to_string())
    }
}
