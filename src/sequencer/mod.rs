//! Prospect outreach state machine.
//!
//! The [`Sequencer`] decides which templated email a prospect gets next,
//! sends it through a [`MailSender`], and records the outcome in a
//! [`ProspectStore`]. It also applies scheduling-tool events and manual
//! funnel-flag toggles.

mod batch;
mod status;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use outreach_core::models::{normalize_email, Prospect, MAX_SEQUENCE_STEP};
use outreach_core::ProspectStore;
use serde::Serialize;
use thiserror::Error;

use crate::mail::{MailError, MailSender, OutboundEmail};
use crate::templates::{self, SenderProfile};

pub use batch::{BatchCriteria, BatchReport};
pub use status::{StatusEvent, StatusEventKind, StatusOutcome, StatusUpdate, SCHEDULING_SOURCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoActionReason {
    SequenceExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum NextAction {
    SendTemplate { template_id: u8 },
    NoAction { reason: NoActionReason },
}

/// What to do next for `prospect`. Pure.
pub fn determine_next_step(prospect: &Prospect) -> NextAction {
    if prospect.sequence_step >= MAX_SEQUENCE_STEP {
        NextAction::NoAction {
            reason: NoActionReason::SequenceExhausted,
        }
    } else {
        NextAction::SendTemplate {
            template_id: prospect.sequence_step + 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Prospect {0} not found")]
    NotFound(String),

    #[error("Prospect {0} has already received all {max} emails", max = MAX_SEQUENCE_STEP)]
    SequenceExhausted(String),

    #[error("{0}")]
    Transport(#[from] MailError),

    #[error("Prospect {0} is being advanced by another sender")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] outreach_core::Error),
}

impl SequencerError {
    /// Conditions a batch caller treats as "nothing to do" rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::SequenceExhausted(_) | Self::Conflict(_)
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub email: String,
    pub email_number: u8,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SequencerConfig {
    pub sender: SenderProfile,
    /// Pause between consecutive sends in a batch.
    pub throttle: Duration,
}

#[derive(Clone)]
pub struct Sequencer {
    store: Arc<dyn ProspectStore>,
    mailer: Arc<dyn MailSender>,
    config: SequencerConfig,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Marks an email as being sent to; released on drop.
struct InFlight {
    set: Arc<Mutex<HashSet<String>>>,
    email: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.email);
        }
    }
}

impl Sequencer {
    pub fn new(
        store: Arc<dyn ProspectStore>,
        mailer: Arc<dyn MailSender>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    fn claim(&self, email: &str) -> Result<InFlight, SequencerError> {
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| SequencerError::Store(outreach_core::Error::LockPoisoned))?;
        if !set.insert(email.to_string()) {
            return Err(SequencerError::Conflict(email.to_string()));
        }
        Ok(InFlight {
            set: Arc::clone(&self.in_flight),
            email: email.to_string(),
        })
    }

    /// Send the next email in the sequence to one prospect.
    ///
    /// State changes only after the mail sender confirms delivery. A mail
    /// failure leaves the prospect untouched and is returned as-is.
    pub async fn send_next(&self, email: &str) -> Result<SendOutcome, SequencerError> {
        let email = normalize_email(email);
        let _guard = self.claim(&email)?;

        let prospect = self
            .store
            .find_prospect(&email)?
            .ok_or_else(|| SequencerError::NotFound(email.clone()))?;

        let template_id = match determine_next_step(&prospect) {
            NextAction::SendTemplate { template_id } => template_id,
            NextAction::NoAction { .. } => {
                return Err(SequencerError::SequenceExhausted(email));
            }
        };
        let template = templates::template(template_id)
            .ok_or_else(|| SequencerError::SequenceExhausted(email.clone()))?;
        let rendered = templates::render(template, &prospect, &self.config.sender);

        self.mailer
            .send(&OutboundEmail {
                to: prospect.email.clone(),
                subject: rendered.subject.clone(),
                body: rendered.body,
            })
            .await?;

        let sent_at = Utc::now();
        if !self
            .store
            .record_send(&email, prospect.sequence_step, sent_at)?
        {
            tracing::warn!(%email, step = template_id, "Email sent but sequence was advanced concurrently");
            return Err(SequencerError::Conflict(email));
        }

        tracing::info!(%email, step = template_id, "Sent sequence email");
        Ok(SendOutcome {
            email,
            email_number: template_id,
            subject: rendered.subject,
            sent_at,
        })
    }
}
