//! Configuration management for the credential service.
//!
//! Loads settings from environment variables, with a `.env` file picked up
//! in development builds. Every knob has a default except the signing
//! secret and (when the Postgres backend is used) the database URL.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub jwt: JwtSettings,
    pub otp: OtpSettings,
    pub api_keys: ApiKeySettings,
    pub smtp: SmtpSettings,
    pub database: DatabaseSettings,
}

impl Settings {
    /// Load settings from environment variables (and `.env` in development)
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        Ok(Settings {
            jwt: JwtSettings::from_env()?,
            otp: OtpSettings::from_env()?,
            api_keys: ApiKeySettings::from_env()?,
            smtp: SmtpSettings::from_env()?,
            database: DatabaseSettings::from_env(),
        })
    }
}

/// Token signing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    /// Shared symmetric signing secret for all token classes
    pub secret: String,
    pub issuer: String,
    pub access_token_expiration_ms: i64,
    pub refresh_token_expiration_days: i64,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "filebox".to_string()),
            access_token_expiration_ms: env::var("ACCESS_TOKEN_EXPIRATION_MS")
                .unwrap_or_else(|_| "3600000".to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_EXPIRATION_MS")?,
            refresh_token_expiration_days: env::var("REFRESH_TOKEN_EXPIRATION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid REFRESH_TOKEN_EXPIRATION_DAYS")?,
        })
    }
}

/// One-time-code challenge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpSettings {
    pub expire_minutes: i64,
}

impl OtpSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            expire_minutes: env::var("OTP_EXPIRE_MINUTES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid OTP_EXPIRE_MINUTES")?,
        })
    }
}

/// Sliding-window policy for API keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeySettings {
    /// Days added to the effective expiration on renewal
    pub sliding_window_days: i64,
    /// Renewal is considered once the key is this close to expiring
    pub renewal_threshold_days: i64,
}

impl ApiKeySettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            sliding_window_days: env::var("API_KEY_SLIDING_WINDOW_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("Invalid API_KEY_SLIDING_WINDOW_DAYS")?,
            renewal_threshold_days: env::var("API_KEY_RENEWAL_THRESHOLD_DAYS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid API_KEY_RENEWAL_THRESHOLD_DAYS")?,
        })
    }
}

/// SMTP transport settings for OTP delivery
///
/// An empty host switches the dispatcher into no-op mode (logs only),
/// useful for development without email infrastructure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl SmtpSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SMTP_HOST").unwrap_or_default(),
            port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            username: env::var("SMTP_USERNAME").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
            from: env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@filebox.dev".to_string()),
        })
    }
}

/// Database settings for the Postgres store backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Absent when running against the in-memory store
    pub url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn from_env() -> Self {
        Self {
            url: env::var("DATABASE_URL").ok(),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }
}
