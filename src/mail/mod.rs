//! Outbound mail delivery.

mod sendgrid;

use async_trait::async_trait;
use thiserror::Error;

pub use sendgrid::SendGridMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    /// Plain text; providers convert it to their wire format.
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail sender not configured: {0}")]
    NotConfigured(String),

    #[error("SendGrid error ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("mail transport error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Accepts one rendered message for one recipient.
///
/// Implementations must not retry; the caller decides whether to try again.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}
