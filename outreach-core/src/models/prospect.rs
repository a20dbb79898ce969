use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of templated emails in the outbound sequence.
pub const MAX_SEQUENCE_STEP: u8 = 3;

/// Source tag given to prospects that arrive without one.
pub const DEFAULT_SOURCE: &str = "manual";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub revenue_estimate: Option<String>,
    pub source: String,
    pub notes: Option<String>,
    pub sequence_step: u8,
    pub email_sent: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub replied: bool,
    pub replied_at: Option<DateTime<Utc>>,
    pub demo_booked: bool,
    pub demo_booked_at: Option<DateTime<Utc>>,
    pub became_client: bool,
    pub became_client_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Prospect {
    pub fn flag(&self, flag: FunnelFlag) -> bool {
        match flag {
            FunnelFlag::Replied => self.replied,
            FunnelFlag::DemoBooked => self.demo_booked,
            FunnelFlag::BecameClient => self.became_client,
        }
    }

    pub fn flag_timestamp(&self, flag: FunnelFlag) -> Option<DateTime<Utc>> {
        match flag {
            FunnelFlag::Replied => self.replied_at,
            FunnelFlag::DemoBooked => self.demo_booked_at,
            FunnelFlag::BecameClient => self.became_client_at,
        }
    }

    /// Set or clear a funnel flag, keeping the timestamp in step with the boolean.
    pub fn set_flag(&mut self, flag: FunnelFlag, at: Option<DateTime<Utc>>) {
        let (value, stamp) = match flag {
            FunnelFlag::Replied => (&mut self.replied, &mut self.replied_at),
            FunnelFlag::DemoBooked => (&mut self.demo_booked, &mut self.demo_booked_at),
            FunnelFlag::BecameClient => (&mut self.became_client, &mut self.became_client_at),
        };
        *value = at.is_some();
        *stamp = at;
    }

    pub fn append_note(&mut self, line: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{}\n\n{}", existing, line),
            _ => line.to_string(),
        });
    }

    /// Apply an in-memory patch. Outreach state is never touched here.
    pub fn apply(&mut self, patch: &ProspectPatch) {
        let fields = &patch.fields;
        let assign = |slot: &mut Option<String>, value: &Option<String>| {
            if let Some(v) = value {
                *slot = non_empty(v);
            }
        };
        assign(&mut self.first_name, &fields.first_name);
        assign(&mut self.last_name, &fields.last_name);
        assign(&mut self.company, &fields.company);
        assign(&mut self.title, &fields.title);
        assign(&mut self.industry, &fields.industry);
        assign(&mut self.phone, &fields.phone);
        assign(&mut self.revenue_estimate, &fields.revenue_estimate);
        assign(&mut self.notes, &fields.notes);

        for (flag, at) in &patch.flags {
            self.set_flag(*flag, *at);
        }
        if let Some(line) = &patch.append_note {
            self.append_note(line);
        }
    }

    pub fn is_sequence_exhausted(&self) -> bool {
        self.sequence_step >= MAX_SEQUENCE_STEP
    }
}

/// Lowercase and trim an address so it can serve as the natural key.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_plausible_email(raw: &str) -> bool {
    raw.contains('@')
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FunnelFlag {
    Replied,
    DemoBooked,
    BecameClient,
}

impl FunnelFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replied => "replied",
            Self::DemoBooked => "demo_booked",
            Self::BecameClient => "became_client",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "replied" => Some(Self::Replied),
            "demo_booked" => Some(Self::DemoBooked),
            "became_client" => Some(Self::BecameClient),
            _ => None,
        }
    }
}

/// Named subsets used by listing and export.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProspectFilter {
    #[default]
    All,
    NotContacted,
    Contacted,
    Replied,
    DemoBooked,
    Clients,
}

impl ProspectFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::NotContacted => "not_contacted",
            Self::Contacted => "contacted",
            Self::Replied => "replied",
            Self::DemoBooked => "demo_booked",
            Self::Clients => "clients",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "not_contacted" => Some(Self::NotContacted),
            "contacted" => Some(Self::Contacted),
            "replied" => Some(Self::Replied),
            "demo_booked" | "demo" => Some(Self::DemoBooked),
            "clients" | "client" => Some(Self::Clients),
            _ => None,
        }
    }

    pub(crate) fn where_clause(&self) -> &'static str {
        match self {
            Self::All => "1 = 1",
            Self::NotContacted => "email_sent = 0",
            Self::Contacted => "email_sent = 1",
            Self::Replied => "replied = 1",
            Self::DemoBooked => "demo_booked = 1",
            Self::Clients => "became_client = 1",
        }
    }
}

/// Scopes accepted by bulk delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeleteScope {
    All,
    NotContacted,
    ContactedNoReply,
}

impl DeleteScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::NotContacted => "not_contacted",
            Self::ContactedNoReply => "contacted_no_reply",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "not_contacted" => Some(Self::NotContacted),
            "contacted_no_reply" | "contacted" => Some(Self::ContactedNoReply),
            _ => None,
        }
    }

    pub(crate) fn where_clause(&self) -> &'static str {
        match self {
            Self::All => "1 = 1",
            Self::NotContacted => "email_sent = 0",
            Self::ContactedNoReply => "email_sent = 1 AND replied = 0",
        }
    }
}

/// Restricts batch selection to a campaign's source tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "match", content = "value")]
pub enum SourceFilter {
    Exact(String),
    Prefix(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProspect {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub revenue_estimate: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

impl NewProspect {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    /// Normalize the key and collapse blank optional fields to `None`.
    pub fn normalized(&self) -> Self {
        let opt = |v: &Option<String>| v.as_deref().and_then(non_empty);
        Self {
            email: normalize_email(&self.email),
            first_name: opt(&self.first_name),
            last_name: opt(&self.last_name),
            company: opt(&self.company),
            title: opt(&self.title),
            industry: opt(&self.industry),
            phone: opt(&self.phone),
            revenue_estimate: opt(&self.revenue_estimate),
            source: Some(opt(&self.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string())),
            notes: opt(&self.notes),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Merged,
}

/// Contact-field edits from the admin form. `Some("")` clears a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProspectInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub revenue_estimate: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProspectPatch {
    pub fields: UpdateProspectInput,
    /// `Some(at)` sets the flag stamped at `at`, `None` clears it.
    pub flags: Vec<(FunnelFlag, Option<DateTime<Utc>>)>,
    pub append_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunnelMetrics {
    pub total_prospects: u64,
    pub emails_sent: u64,
    pub replies: u64,
    pub demos_booked: u64,
    pub clients_closed: u64,
    pub email_to_reply_rate: f64,
    pub reply_to_demo_rate: f64,
    pub demo_to_client_rate: f64,
}

impl FunnelMetrics {
    pub fn from_counts(total: u64, sent: u64, replies: u64, demos: u64, clients: u64) -> Self {
        let rate = |num: u64, den: u64| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64 * 100.0
            }
        };
        Self {
            total_prospects: total,
            emails_sent: sent,
            replies,
            demos_booked: demos,
            clients_closed: clients,
            email_to_reply_rate: rate(replies, sent),
            reply_to_demo_rate: rate(demos, replies),
            demo_to_client_rate: rate(clients, demos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prospect() -> Prospect {
        Prospect {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            first_name: None,
            last_name: None,
            company: None,
            title: None,
            industry: None,
            phone: None,
            revenue_estimate: None,
            source: DEFAULT_SOURCE.into(),
            notes: None,
            sequence_step: 0,
            email_sent: false,
            email_sent_at: None,
            replied: false,
            replied_at: None,
            demo_booked: false,
            demo_booked_at: None,
            became_client: false,
            became_client_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn set_flag_keeps_timestamp_consistent() {
        let mut p = prospect();
        let now = Utc::now();
        p.set_flag(FunnelFlag::BecameClient, Some(now));
        assert!(p.became_client);
        assert_eq!(p.became_client_at, Some(now));
        assert!(!p.demo_booked, "funnel flags are independent");

        p.set_flag(FunnelFlag::BecameClient, None);
        assert!(!p.became_client);
        assert_eq!(p.became_client_at, None);
    }

    #[test]
    fn append_note_separates_lines() {
        let mut p = prospect();
        p.append_note("first");
        p.append_note("second");
        assert_eq!(p.notes.as_deref(), Some("first\n\nsecond"));
    }

    #[test]
    fn apply_clears_fields_with_empty_strings() {
        let mut p = prospect();
        p.company = Some("Acme".into());
        p.apply(&ProspectPatch {
            fields: UpdateProspectInput {
                company: Some("  ".into()),
                first_name: Some("Ann".into()),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(p.company, None);
        assert_eq!(p.first_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn normalized_defaults_source_and_lowercases() {
        let input = NewProspect {
            email: "  Foo@X.com ".into(),
            company: Some("".into()),
            ..Default::default()
        };
        let n = input.normalized();
        assert_eq!(n.email, "foo@x.com");
        assert_eq!(n.company, None);
        assert_eq!(n.source.as_deref(), Some(DEFAULT_SOURCE));
    }

    #[test]
    fn metrics_rates_guard_zero_denominators() {
        let m = FunnelMetrics::from_counts(10, 4, 1, 0, 0);
        assert_eq!(m.email_to_reply_rate, 25.0);
        assert_eq!(m.reply_to_demo_rate, 0.0);
        assert_eq!(m.demo_to_client_rate, 0.0);
    }

    #[test]
    fn filters_parse_admin_aliases() {
        assert_eq!(ProspectFilter::from_str("demo"), Some(ProspectFilter::DemoBooked));
        assert_eq!(ProspectFilter::from_str("clients"), Some(ProspectFilter::Clients));
        assert_eq!(DeleteScope::from_str("contacted"), Some(DeleteScope::ContactedNoReply));
        assert_eq!(FunnelFlag::from_str("nope"), None);
    }
}
