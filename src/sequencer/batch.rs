use chrono::{DateTime, Duration, Utc};
use outreach_core::models::{Prospect, SourceFilter};
use serde::Serialize;

use super::{Sequencer, SequencerError};

#[derive(Debug, Clone)]
pub struct BatchCriteria {
    pub source: Option<SourceFilter>,
    /// Minimum time since the previous email before a prospect is due again.
    pub min_gap: Duration,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub message: String,
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_processed: usize,
    pub next_batch_in_hours: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Sequencer {
    /// Prospects due for their next email, in send order.
    pub fn select_batch(
        &self,
        criteria: &BatchCriteria,
        now: DateTime<Utc>,
    ) -> Result<Vec<Prospect>, SequencerError> {
        let cutoff = now
            .checked_sub_signed(criteria.min_gap)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Ok(self
            .store
            .select_due(criteria.source.as_ref(), cutoff, criteria.limit)?)
    }

    /// Send to one selected cohort, one prospect at a time.
    ///
    /// A failure on one prospect is recorded and the run moves on; only a
    /// failed selection aborts.
    pub async fn run_batch(&self, criteria: &BatchCriteria) -> Result<BatchReport, SequencerError> {
        let prospects = self.select_batch(criteria, Utc::now())?;
        let mut report = BatchReport {
            next_batch_in_hours: criteria.min_gap.num_hours(),
            ..Default::default()
        };

        if prospects.is_empty() {
            report.message = "No prospects ready for email".into();
            return Ok(report);
        }

        tracing::info!("Processing {} prospects", prospects.len());

        for (i, prospect) in prospects.iter().enumerate() {
            if i > 0 && !self.config.throttle.is_zero() {
                tokio::time::sleep(self.config.throttle).await;
            }

            match self.send_next(&prospect.email).await {
                Ok(outcome) => {
                    report.sent += 1;
                    tracing::debug!(email = %outcome.email, step = outcome.email_number, "Batch send ok");
                }
                Err(e) if e.is_skip() => {
                    report.skipped += 1;
                    tracing::info!(email = %prospect.email, "Skipped: {}", e);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(email = %prospect.email, "Failed to send: {}", e);
                    report.errors.push(format!("{}: {}", prospect.email, e));
                }
            }
        }

        report.total_processed = prospects.len();
        report.message = "Campaign batch completed".into();
        Ok(report)
    }
}
