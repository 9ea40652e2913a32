pub mod api_keys;
pub mod auth;
pub mod otp;

pub use api_keys::{ApiKeyLifecycleManager, RenewalPolicy};
pub use auth::{AccountAuthenticator, RefreshedAccess};
pub use otp::{OtpChallengeManager, OtpOutcome};
