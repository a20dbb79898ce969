//! The three-step outbound sequence and its personalization.

use outreach_core::models::{Prospect, MAX_SEQUENCE_STEP};

pub struct EmailTemplate {
    pub id: u8,
    pub subject: &'static str,
    pub body: &'static str,
}

/// Who the sequence is signed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderProfile {
    pub email: String,
    pub name: String,
    pub phone: String,
    pub booking_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub template_id: u8,
    pub subject: String,
    pub body: String,
}

const FALLBACK_FIRST_NAME: &str = "there";
const FALLBACK_COMPANY: &str = "your company";
const FALLBACK_REVENUE: &str = "$2M-10M";
const FALLBACK_INDUSTRY: &str = "business";

static TEMPLATES: [EmailTemplate; MAX_SEQUENCE_STEP as usize] = [
    EmailTemplate {
        id: 1,
        subject: "Your books say cash dropped... but why?",
        body: "Hi {{first_name}},

Your accounting system says cash dropped $28K last month.

But it doesn't tell you:
• WHY it dropped
• WHERE the money went
• WHAT to do about it

That's the gap: your books show you what happened, never why.

We turn {{company}}'s accounting data into answers you can act on:
→ Real-time dashboards that update hourly
→ An assistant that answers \"why did cash drop?\" instantly
→ Alerts when something needs your attention

Most of our clients are {{revenue_estimate}} businesses. They keep their bookkeeper for compliance and use us for intelligence.

Worth a 15-min look?

Book a quick demo: {{booking_url}}

Best,
{{sender_name}}
P: {{phone}}

P.S. We recently helped a {{revenue_estimate}} {{industry}} company find $4K/month in duplicate vendor payments. Their books showed the payments but never flagged the duplicates.",
    },
    EmailTemplate {
        id: 2,
        subject: "Can you answer these 3 questions right now?",
        body: "{{first_name}},

Without opening your books or calling your bookkeeper, can you tell me:

1. How much cash do you have available TODAY?
2. Which customer owes you the most, and how overdue are they?
3. What was revenue this week vs. last week?

If those take more than 30 seconds, you're flying blind.

→ See your numbers in real time (updates hourly)
→ Ask \"what's my runway?\" and get an instant answer
→ Click any number to see the detail
→ Get alerts when cash is low or receivables are aging

Most {{revenue_estimate}} businesses pay for bookkeeping that tells them what happened 2-3 weeks ago. We show what's happening right now.

Want to see it with {{company}}'s actual data?

Book 15 minutes: {{booking_url}}

{{sender_name}}
P: {{phone}}",
    },
    EmailTemplate {
        id: 3,
        subject: "Your books are up to date. Your decisions aren't.",
        body: "{{first_name}},

Your bookkeeper closes September in mid-October.

But you're making hiring, pricing and cash decisions in October... based on September data.

We sync with your accounting system every hour:

✓ Today's cash position, not last week's
✓ Receivables aging in real time
✓ This week's revenue against last week's
✓ Instant answers to \"can I afford to hire someone?\"

Most of our clients are {{revenue_estimate}} {{industry}} companies. They keep their bookkeeper for compliance. They use us to run the business.

Worth a look?

See it live: {{booking_url}}

Best,
{{sender_name}}
P: {{phone}}

P.S. This is my last email. If you've ever wished you could just SEE your numbers in real time, that's exactly what we built.",
    },
];

/// Template for a 1-based sequence position.
pub fn template(id: u8) -> Option<&'static EmailTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

fn or_fallback<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

/// Substitute prospect and sender fields into `text`.
pub fn personalize(text: &str, prospect: &Prospect, sender: &SenderProfile) -> String {
    text.replace(
        "{{first_name}}",
        or_fallback(prospect.first_name.as_deref(), FALLBACK_FIRST_NAME),
    )
    .replace(
        "{{company}}",
        or_fallback(prospect.company.as_deref(), FALLBACK_COMPANY),
    )
    .replace(
        "{{revenue_estimate}}",
        or_fallback(prospect.revenue_estimate.as_deref(), FALLBACK_REVENUE),
    )
    .replace(
        "{{industry}}",
        or_fallback(prospect.industry.as_deref(), FALLBACK_INDUSTRY),
    )
    .replace("{{phone}}", &sender.phone)
    .replace("{{sender_name}}", &sender.name)
    .replace("{{booking_url}}", &sender.booking_url)
}

pub fn render(template: &EmailTemplate, prospect: &Prospect, sender: &SenderProfile) -> RenderedEmail {
    RenderedEmail {
        template_id: template.id,
        subject: personalize(template.subject, prospect, sender),
        body: personalize(template.body, prospect, sender),
    }
}

/// Plain text to the HTML sent over the wire.
pub fn to_html(body: &str) -> String {
    body.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', "<br>")
        .replace('→', "&rarr;")
        .replace('✓', "&#10003;")
        .replace('•', "&bull;")
}
