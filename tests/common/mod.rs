#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use outreach::config::Settings;
use outreach::mail::{MailError, MailSender, OutboundEmail};
use outreach::sequencer::{Sequencer, SequencerConfig};
use outreach_core::models::{NewProspect, Prospect};
use outreach_core::Database;

/// Mail sender that keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Rejected {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Mail sender that parks inside `send` until released, so a second caller
/// can race the first while it is mid-delivery.
#[derive(Default)]
pub struct GatedMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for GatedMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub fn database() -> Database {
    let db = Database::open_memory().unwrap();
    db.migrate().unwrap();
    db
}

pub fn sequencer(db: &Database, mailer: Arc<dyn MailSender>) -> Sequencer {
    let config = SequencerConfig {
        throttle: Duration::ZERO,
        ..Settings::default().sequencer_config()
    };
    Sequencer::new(Arc::new(db.clone()), mailer, config)
}

pub fn add_prospect(db: &Database, email: &str) -> Prospect {
    db.upsert_prospect(&NewProspect::new(email)).unwrap().0
}

/// Walk a prospect up to `step`, stamping every send at `last_sent`.
pub fn advance_to(db: &Database, email: &str, step: u8, last_sent: DateTime<Utc>) -> Prospect {
    for current in 0..step {
        assert!(db.record_send(email, current, last_sent).unwrap());
    }
    db.find_prospect(email).unwrap().unwrap()
}
