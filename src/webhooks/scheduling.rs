use serde::Deserialize;

use crate::sequencer::{StatusEvent, StatusEventKind};

/// Scheduling-tool delivery (Calendly `invitee.*` shape).
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulingWebhook {
    pub event: String,
    #[serde(default)]
    pub payload: Option<SchedulingPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulingPayload {
    pub email: Option<String>,
    pub name: Option<String>,
    pub scheduled_event: Option<ScheduledEvent>,
    pub cancellation: Option<Cancellation>,
    #[serde(default)]
    pub rescheduled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduledEvent {
    pub start_time: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cancellation {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpreted {
    Event { email: String, event: StatusEvent },
    /// Event kind we do not act on.
    Ignored,
    /// Known kind without an attendee email.
    MissingEmail,
}

impl SchedulingWebhook {
    fn kind(&self) -> Option<StatusEventKind> {
        let rescheduled = self.payload.as_ref().is_some_and(|p| p.rescheduled);
        match self.event.as_str() {
            "invitee.created" => Some(StatusEventKind::DemoBooked),
            "invitee.rescheduled" => Some(StatusEventKind::DemoRescheduled),
            "invitee.canceled" if rescheduled => Some(StatusEventKind::DemoRescheduled),
            "invitee.canceled" => Some(StatusEventKind::DemoCanceled),
            _ => None,
        }
    }

    pub fn interpret(&self) -> Interpreted {
        let Some(kind) = self.kind() else {
            return Interpreted::Ignored;
        };
        let payload = self.payload.clone().unwrap_or_default();
        let Some(email) = payload.email.filter(|e| !e.trim().is_empty()) else {
            return Interpreted::MissingEmail;
        };

        Interpreted::Event {
            email,
            event: StatusEvent {
                kind,
                display_name: payload.name,
                scheduled_at: payload.scheduled_event.and_then(|e| e.start_time),
                reason: payload.cancellation.and_then(|c| c.reason),
            },
        }
    }
}
