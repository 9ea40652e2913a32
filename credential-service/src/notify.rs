//! Notification dispatch for one-time codes.
//!
//! Dispatch is an external blocking call and is always made after the
//! challenge has been committed; no credential-row lock is held while a
//! message is in flight.

use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SmtpSettings;
use crate::error::{CredentialError, Result};
use crate::models::OtpPurpose;
use crate::validators::{mask_email, mask_phone};

/// Delivery destination for a one-time code.
#[derive(Debug, Clone)]
pub enum Destination {
    Email(String),
    /// Declared for completeness; no SMS transport is wired up, and
    /// dispatching to a phone returns `NotImplemented` rather than
    /// silently doing nothing.
    Phone(String),
}

impl Destination {
    /// Masked form for logging
    pub fn masked(&self) -> String {
        match self {
            Destination::Email(addr) => mask_email(addr),
            Destination::Phone(number) => mask_phone(number),
        }
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver a one-time code. A failure here is reported as
    /// `NotificationDeliveryFailed` and never rolls back the persisted
    /// challenge.
    async fn send(
        &self,
        destination: &Destination,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<()>;
}

/// SMTP dispatcher (or no-op when unconfigured).
///
/// With an empty SMTP host the dispatcher logs and succeeds without
/// sending, which keeps development setups working without mail
/// infrastructure.
#[derive(Clone)]
pub struct SmtpDispatcher {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl SmtpDispatcher {
    pub fn new(config: &SmtpSettings) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| CredentialError::Internal(format!("invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.host.trim().is_empty() {
            warn!("SMTP host not configured; notification dispatch will operate in no-op mode");
            None
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| {
                    CredentialError::Internal(format!("failed to configure SMTP transport: {}", e))
                })?
                .port(config.port);

            let builder = if let (Some(username), Some(password)) =
                (&config.username, &config.password)
            {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            } else {
                builder
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self { transport, from })
    }

    fn subject(purpose: OtpPurpose) -> &'static str {
        match purpose {
            OtpPurpose::EmailVerify => "Your filebox verification code",
            OtpPurpose::PasswordReset => "Your filebox password reset code",
        }
    }

    fn body(code: &str, purpose: OtpPurpose) -> String {
        match purpose {
            OtpPurpose::EmailVerify => format!(
                "Your filebox email verification code is: {}\n\n\
                 Enter it to confirm this address. If you did not request \
                 this, please ignore this email.",
                code
            ),
            OtpPurpose::PasswordReset => format!(
                "Your filebox password reset code is: {}\n\n\
                 Enter it to continue resetting your password. If you did \
                 not request this, please ignore this email.",
                code
            ),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for SmtpDispatcher {
    async fn send(
        &self,
        destination: &Destination,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<()> {
        let recipient = match destination {
            Destination::Email(addr) => addr,
            Destination::Phone(_) => {
                return Err(CredentialError::NotImplemented("sms code delivery"));
            }
        };

        let Some(transport) = &self.transport else {
            info!(
                purpose = %purpose,
                recipient = %destination.masked(),
                "notification dispatch in no-op mode; skipping actual send"
            );
            return Ok(());
        };

        let to = recipient.parse::<Mailbox>().map_err(|e| {
            CredentialError::NotificationDeliveryFailed(format!(
                "invalid recipient address: {}",
                e
            ))
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(Self::subject(purpose))
            .header(header::ContentType::TEXT_PLAIN)
            .body(Self::body(code, purpose))
            .map_err(|e| {
                CredentialError::NotificationDeliveryFailed(format!(
                    "failed to build message: {}",
                    e
                ))
            })?;

        transport.send(email).await.map_err(|e| {
            CredentialError::NotificationDeliveryFailed(format!("smtp send failed: {}", e))
        })?;

        info!(
            purpose = %purpose,
            recipient = %destination.masked(),
            "one-time code dispatched"
        );
        Ok(())
    }
}
