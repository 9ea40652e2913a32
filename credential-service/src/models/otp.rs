use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Purpose class of a one-time-code challenge.
///
/// Each purpose is an independent challenge slot: an account holds at most
/// one live challenge per purpose, and generating a new code overwrites the
/// previous record for that purpose only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    EmailVerify,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::EmailVerify => "email_verify",
            OtpPurpose::PasswordReset => "password_reset",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "email_verify" => Some(OtpPurpose::EmailVerify),
            "password_reset" => Some(OtpPurpose::PasswordReset),
            _ => None,
        }
    }
}

impl std::fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-time-code challenge bound to a single account and purpose.
///
/// Consumed challenges are not deleted; their `sent_at` is rewound far into
/// the past so they can never verify again while the row remains as an
/// audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub account_id: Uuid,
    pub purpose: OtpPurpose,
    /// Six ASCII digits
    pub code: String,
    pub sent_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
