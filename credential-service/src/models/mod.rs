pub mod account;
pub mod api_key;
pub mod otp;

pub use account::{AccountCredential, NewAccount, Role, VerificationChannel};
pub use api_key::{
    ApiKeyCredential, ApiKeyEnvironment, ApiKeyPermission, ApiKeyValidity, GeneratedApiKey,
};
pub use otp::{OtpChallenge, OtpPurpose};
