use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::Result;
use crate::models::*;

/// Persistence operations the prospect sequencer depends on.
///
/// Each call must be atomic for a single row, and a caller must observe its
/// own writes.
pub trait ProspectStore: Send + Sync {
    fn find_prospect(&self, email: &str) -> Result<Option<Prospect>>;

    fn upsert_prospect(&self, input: &NewProspect) -> Result<(Prospect, UpsertOutcome)>;

    fn patch_prospect(&self, email: &str, patch: &ProspectPatch) -> Result<Option<Prospect>>;

    /// Conditional advance: only succeeds while the stored step equals `expected_step`.
    fn record_send(&self, email: &str, expected_step: u8, sent_at: DateTime<Utc>) -> Result<bool>;

    fn select_due(
        &self,
        source: Option<&SourceFilter>,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Prospect>>;
}

impl ProspectStore for Database {
    fn find_prospect(&self, email: &str) -> Result<Option<Prospect>> {
        Database::find_prospect(self, email)
    }

    fn upsert_prospect(&self, input: &NewProspect) -> Result<(Prospect, UpsertOutcome)> {
        Database::upsert_prospect(self, input)
    }

    fn patch_prospect(&self, email: &str, patch: &ProspectPatch) -> Result<Option<Prospect>> {
        Database::patch_prospect(self, email, patch)
    }

    fn record_send(&self, email: &str, expected_step: u8, sent_at: DateTime<Utc>) -> Result<bool> {
        Database::record_send(self, email, expected_step, sent_at)
    }

    fn select_due(
        &self,
        source: Option<&SourceFilter>,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Prospect>> {
        Database::select_due(self, source, cutoff, limit)
    }
}
