//! Credential Service Library
//!
//! Credential and token lifecycle engine for filebox: issues, verifies and
//! revokes session tokens, refresh tokens and sliding-window API keys, and
//! runs the one-time-code challenges used for email verification and
//! password reset.
//!
//! ## Modules
//!
//! - `config`: Service configuration
//! - `error`: Error types
//! - `models`: Data models (accounts, API keys, OTP challenges)
//! - `notify`: Notification dispatch (OTP delivery)
//! - `security`: Password hashing
//! - `services`: Business logic (authentication, API keys, OTP)
//! - `store`: Credential store boundary (memory and Postgres backends)
//! - `validators`: Input validation and identifier classification

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod security;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod validators;

// Re-export commonly used types
pub use error::{CredentialError, Result};
pub use services::{AccountAuthenticator, ApiKeyLifecycleManager, OtpChallengeManager};
pub use store::CredentialStore;
