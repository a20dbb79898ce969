use async_trait::async_trait;
use serde::Serialize;

use super::{MailError, MailSender, OutboundEmail};
use crate::config::Settings;
use crate::templates::to_html;

const FOOTER_TAGLINE: &str = "Real-time financial intelligence for growing businesses";

/// Mail sender backed by the SendGrid v3 `mail/send` API.
#[derive(Clone)]
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    from_email: String,
    from_name: String,
    unsubscribe_url: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    content: Vec<Content>,
    tracking_settings: TrackingSettings,
    mail_settings: MailSettings,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
    subject: &'a str,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

#[derive(Serialize)]
struct TrackingSettings {
    click_tracking: Toggle,
    open_tracking: Toggle,
}

#[derive(Serialize)]
struct Toggle {
    enable: bool,
}

#[derive(Serialize)]
struct MailSettings {
    footer: Footer,
}

#[derive(Serialize)]
struct Footer {
    enable: bool,
    html: String,
}

impl SendGridMailer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: settings.sendgrid_api_key.clone().filter(|k| !k.is_empty()),
            base_url: settings.sendgrid_base_url.trim_end_matches('/').to_string(),
            from_email: settings.sender_email.clone(),
            from_name: settings.sender_name.clone(),
            unsubscribe_url: settings.unsubscribe_url.clone(),
        }
    }

    fn footer_html(&self, to: &str) -> String {
        format!(
            "<br><br><small style=\"color: #666;\">{}<br><a href=\"{}?email={}\">Unsubscribe</a></small>",
            FOOTER_TAGLINE,
            self.unsubscribe_url,
            urlencoding::encode(to)
        )
    }
}

#[async_trait]
impl MailSender for SendGridMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MailError::NotConfigured("SENDGRID_API_KEY not configured".into()))?;

        let request = SendRequest {
            personalizations: vec![Personalization {
                to: vec![Address {
                    email: &email.to,
                    name: None,
                }],
                subject: &email.subject,
            }],
            from: Address {
                email: &self.from_email,
                name: Some(&self.from_name),
            },
            content: vec![Content {
                content_type: "text/html",
                value: to_html(&email.body),
            }],
            tracking_settings: TrackingSettings {
                click_tracking: Toggle { enable: true },
                open_tracking: Toggle { enable: true },
            },
            mail_settings: MailSettings {
                footer: Footer {
                    enable: true,
                    html: self.footer_html(&email.to),
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to = %email.to, "SendGrid accepted message");
        Ok(())
    }
}
