//! Runtime settings, read from flags or the environment (`.env` is loaded first).

use std::time::Duration;

use clap::Args;
use outreach_core::models::SourceFilter;

use crate::sequencer::{BatchCriteria, SequencerConfig};
use crate::templates::SenderProfile;

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// SendGrid API key used for outbound mail
    #[arg(long, env = "SENDGRID_API_KEY", hide_env_values = true)]
    pub sendgrid_api_key: Option<String>,

    /// Base URL of the mail provider API
    #[arg(long, env = "SENDGRID_BASE_URL", default_value = "https://api.sendgrid.com")]
    pub sendgrid_base_url: String,

    /// From address on outbound mail
    #[arg(long, env = "SENDER_EMAIL", default_value = "founder@example.com")]
    pub sender_email: String,

    /// Display name on outbound mail and in the signature
    #[arg(long, env = "SENDER_NAME", default_value = "The Founder")]
    pub sender_name: String,

    /// Phone number printed in the signature
    #[arg(long, env = "SENDER_PHONE", default_value = "555-010-0000")]
    pub sender_phone: String,

    /// Link used for "book a demo" calls to action
    #[arg(long, env = "BOOKING_URL", default_value = "https://example.com/demo")]
    pub booking_url: String,

    /// Unsubscribe page; the recipient address is appended as `?email=`
    #[arg(long, env = "UNSUBSCRIBE_URL", default_value = "https://example.com/unsubscribe")]
    pub unsubscribe_url: String,

    /// Bearer secret required to trigger campaign batches
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    pub cron_secret: Option<String>,

    /// Default number of prospects per batch
    #[arg(long, env = "BATCH_SIZE", default_value_t = 50)]
    pub batch_size: usize,

    /// Minimum hours between two emails to the same prospect
    #[arg(long, env = "HOURS_BETWEEN_EMAILS", default_value_t = 48)]
    pub hours_between_emails: i64,

    /// Pause between sends inside a batch, in milliseconds
    #[arg(long, env = "SEND_DELAY_MS", default_value_t = 200)]
    pub send_delay_ms: u64,

    /// Only prospects with this source tag are picked by scheduled batches
    #[arg(long, env = "CAMPAIGN_SOURCE")]
    pub campaign_source: Option<String>,

    /// Signing secret for payment webhooks
    #[arg(long, env = "STRIPE_WEBHOOK_SECRET", hide_env_values = true)]
    pub stripe_webhook_secret: Option<String>,

    /// Signing key for scheduling webhooks; unsigned deliveries are accepted when unset
    #[arg(long, env = "CALENDLY_SIGNING_KEY", hide_env_values = true)]
    pub calendly_signing_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sendgrid_api_key: None,
            sendgrid_base_url: "https://api.sendgrid.com".into(),
            sender_email: "founder@example.com".into(),
            sender_name: "The Founder".into(),
            sender_phone: "555-010-0000".into(),
            booking_url: "https://example.com/demo".into(),
            unsubscribe_url: "https://example.com/unsubscribe".into(),
            cron_secret: None,
            batch_size: 50,
            hours_between_emails: 48,
            send_delay_ms: 200,
            campaign_source: None,
            stripe_webhook_secret: None,
            calendly_signing_key: None,
        }
    }
}

impl Settings {
    pub fn sender_profile(&self) -> SenderProfile {
        SenderProfile {
            email: self.sender_email.clone(),
            name: self.sender_name.clone(),
            phone: self.sender_phone.clone(),
            booking_url: self.booking_url.clone(),
        }
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            sender: self.sender_profile(),
            throttle: Duration::from_millis(self.send_delay_ms),
        }
    }

    /// Batch selection for scheduled runs.
    pub fn batch_criteria(&self) -> outreach_core::Result<BatchCriteria> {
        Ok(BatchCriteria {
            source: self
                .campaign_source
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| SourceFilter::Exact(s.to_string())),
            min_gap: gap_hours(self.hours_between_emails)?,
            limit: self.batch_size,
        })
    }
}

/// Hours between sends as a duration. Negative values mean no gap.
pub fn gap_hours(hours: i64) -> outreach_core::Result<chrono::Duration> {
    chrono::Duration::try_hours(hours.max(0)).ok_or_else(|| {
        outreach_core::Error::Validation(format!("hours_between_emails out of range: {hours}"))
    })
}
