use chrono::Utc;
use outreach_core::models::{
    is_plausible_email, normalize_email, FunnelFlag, NewProspect, Prospect, ProspectPatch,
    UpdateProspectInput, UpsertOutcome,
};
use serde::{Deserialize, Serialize};

use super::{Sequencer, SequencerError};

/// Source tag for prospects first seen through a scheduling-tool booking.
pub const SCHEDULING_SOURCE: &str = "calendly";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEventKind {
    DemoBooked,
    DemoCanceled,
    DemoRescheduled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub kind: StatusEventKind,
    pub display_name: Option<String>,
    /// Meeting start as reported by the scheduling tool.
    pub scheduled_at: Option<String>,
    pub reason: Option<String>,
}

impl StatusEvent {
    pub fn new(kind: StatusEventKind) -> Self {
        Self {
            kind,
            display_name: None,
            scheduled_at: None,
            reason: None,
        }
    }

    fn when(&self) -> &str {
        self.scheduled_at
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("time not provided")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOutcome {
    Created,
    Updated,
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub outcome: StatusOutcome,
    pub prospect: Option<Prospect>,
}

/// "Jane van Doe" -> ("Jane", "van Doe").
fn split_name(name: Option<&str>) -> (Option<String>, Option<String>) {
    let mut parts = name.unwrap_or_default().split_whitespace();
    let first = parts.next().map(str::to_string);
    let rest = parts.collect::<Vec<_>>().join(" ");
    let last = if rest.is_empty() { None } else { Some(rest) };
    (first, last)
}

impl Sequencer {
    /// Apply a scheduling-tool event to a prospect.
    ///
    /// Only a booking creates a record; cancel and reschedule report
    /// `NotFound` for unknown emails.
    pub fn apply_status_event(
        &self,
        email: &str,
        event: &StatusEvent,
    ) -> Result<StatusUpdate, SequencerError> {
        let email = normalize_email(email);
        if !is_plausible_email(&email) {
            return Err(outreach_core::Error::Validation(format!(
                "'{}' is not an email address",
                email
            ))
            .into());
        }
        let now = Utc::now();

        let (patch, create_note) = match event.kind {
            StatusEventKind::DemoBooked => {
                let (first_name, last_name) = split_name(event.display_name.as_deref());
                let patch = ProspectPatch {
                    fields: UpdateProspectInput {
                        first_name,
                        last_name,
                        ..Default::default()
                    },
                    flags: vec![(FunnelFlag::DemoBooked, Some(now))],
                    append_note: Some(format!("Demo booked: {}", event.when())),
                };
                let create_note = format!("Demo booked via scheduling link: {}", event.when());
                (patch, Some(create_note))
            }
            StatusEventKind::DemoCanceled => {
                let reason = event
                    .reason
                    .as_deref()
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or("no reason given");
                let patch = ProspectPatch {
                    flags: vec![(FunnelFlag::DemoBooked, None)],
                    append_note: Some(format!("Demo canceled: {}", reason)),
                    ..Default::default()
                };
                (patch, None)
            }
            StatusEventKind::DemoRescheduled => {
                let patch = ProspectPatch {
                    flags: vec![(FunnelFlag::DemoBooked, Some(now))],
                    append_note: Some(format!("Demo rescheduled: {}", event.when())),
                    ..Default::default()
                };
                (patch, None)
            }
        };

        if let Some(prospect) = self.store.patch_prospect(&email, &patch)? {
            tracing::info!(%email, kind = ?event.kind, "Updated existing prospect");
            return Ok(StatusUpdate {
                outcome: StatusOutcome::Updated,
                prospect: Some(prospect),
            });
        }

        let Some(note) = create_note else {
            tracing::info!(%email, kind = ?event.kind, "No prospect for event");
            return Ok(StatusUpdate {
                outcome: StatusOutcome::NotFound,
                prospect: None,
            });
        };

        let input = NewProspect {
            first_name: patch.fields.first_name.clone(),
            last_name: patch.fields.last_name.clone(),
            source: Some(SCHEDULING_SOURCE.to_string()),
            notes: Some(note),
            ..NewProspect::new(email.clone())
        };
        let (_, upserted) = self.store.upsert_prospect(&input)?;
        let flags_only = ProspectPatch {
            flags: patch.flags,
            ..Default::default()
        };
        let prospect = self
            .store
            .patch_prospect(&email, &flags_only)?
            .ok_or_else(|| SequencerError::NotFound(email.clone()))?;

        let outcome = match upserted {
            UpsertOutcome::Inserted => StatusOutcome::Created,
            UpsertOutcome::Merged => StatusOutcome::Updated,
        };
        tracing::info!(%email, ?outcome, "Recorded demo booking");
        Ok(StatusUpdate {
            outcome,
            prospect: Some(prospect),
        })
    }

    /// Manual admin toggle. Setting stamps the matching timestamp, clearing nulls it.
    pub fn toggle_funnel_flag(
        &self,
        email: &str,
        flag: FunnelFlag,
        value: bool,
    ) -> Result<Prospect, SequencerError> {
        let patch = ProspectPatch {
            flags: vec![(flag, value.then(Utc::now))],
            ..Default::default()
        };
        self.store
            .patch_prospect(email, &patch)?
            .ok_or_else(|| SequencerError::NotFound(normalize_email(email)))
    }
}
