use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use outreach_core::models::{is_plausible_email, SourceFilter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::config::{gap_hours, Settings};
use crate::sequencer::{BatchCriteria, BatchReport};

#[derive(Debug, Deserialize)]
pub struct SendNextRequest {
    pub email: String,
}

pub async fn send_next_status() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "endpoint": "send-next",
        "usage": "POST with { \"email\": \"prospect@example.com\" }"
    }))
}

pub async fn send_next(
    State(state): State<AppState>,
    Json(input): Json<SendNextRequest>,
) -> Result<Json<Value>, ApiError> {
    if !is_plausible_email(&input.email) {
        return Err(ApiError::BadRequest("Valid email is required".into()));
    }
    let outcome = state.sequencer.send_next(&input.email).await?;
    Ok(Json(json!({
        "success": true,
        "email": outcome.email,
        "email_number": outcome.email_number,
        "subject": outcome.subject,
        "sent_at": outcome.sent_at,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignRequest {
    pub specific_email: Option<String>,
    pub batch_size: Option<usize>,
    pub hours_between_emails: Option<i64>,
    pub source: Option<String>,
    pub source_prefix: Option<String>,
}

impl CampaignRequest {
    fn criteria(&self, settings: &Settings) -> Result<BatchCriteria, ApiError> {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let mut criteria = settings
            .batch_criteria()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if let Some(prefix) = non_blank(&self.source_prefix) {
            criteria.source = Some(SourceFilter::Prefix(prefix));
        } else if let Some(source) = non_blank(&self.source) {
            criteria.source = Some(SourceFilter::Exact(source));
        }
        if let Some(hours) = self.hours_between_emails {
            criteria.min_gap = gap_hours(hours)?;
        }
        if let Some(limit) = self.batch_size {
            criteria.limit = limit;
        }
        Ok(criteria)
    }
}

#[derive(Debug, Serialize)]
struct CampaignResponse {
    success: bool,
    #[serde(flatten)]
    report: BatchReport,
}

/// Bearer check against the configured cron secret. An unset secret rejects everything.
fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return Err(ApiError::Unauthorized);
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if provided == Some(secret) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

pub async fn campaign_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "endpoint": "send-campaign",
        "batch_size": state.settings.batch_size,
        "hours_between_emails": state.settings.hours_between_emails,
    }))
}

pub async fn send_campaign(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    authorize(&headers, state.settings.cron_secret.as_deref())?;

    let request: CampaignRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CampaignRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    if let Some(email) = request.specific_email.as_deref() {
        let outcome = state.sequencer.send_next(email).await?;
        return Ok(Json(json!({
            "success": true,
            "sent": 1,
            "email": outcome.email,
            "email_number": outcome.email_number,
            "subject": outcome.subject,
        })));
    }

    let criteria = request.criteria(&state.settings)?;
    let report = state.sequencer.run_batch(&criteria).await?;
    Ok(Json(json!(CampaignResponse {
        success: true,
        report,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_wins_over_exact_source_and_settings() {
        let settings = Settings {
            campaign_source: Some("default-list".into()),
            ..Default::default()
        };
        let request = CampaignRequest {
            source: Some("exact".into()),
            source_prefix: Some("spring-".into()),
            ..Default::default()
        };
        let criteria = request.criteria(&settings).unwrap();
        assert_eq!(criteria.source, Some(SourceFilter::Prefix("spring-".into())));

        let fallback = CampaignRequest::default().criteria(&settings).unwrap();
        assert_eq!(fallback.source, Some(SourceFilter::Exact("default-list".into())));
        assert_eq!(fallback.limit, 50);
        assert_eq!(fallback.min_gap, chrono::Duration::hours(48));
    }

    #[test]
    fn out_of_range_gap_is_a_bad_request() {
        let request = CampaignRequest {
            hours_between_emails: Some(i64::MAX),
            ..Default::default()
        };
        assert!(matches!(
            request.criteria(&Settings::default()),
            Err(ApiError::BadRequest(_))
        ));

        let misconfigured = Settings {
            hours_between_emails: i64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            CampaignRequest::default().criteria(&misconfigured),
            Err(ApiError::Internal(_))
        ));

        let overridden = CampaignRequest {
            hours_between_emails: Some(-5),
            ..Default::default()
        };
        let criteria = overridden.criteria(&Settings::default()).unwrap();
        assert_eq!(criteria.min_gap, chrono::Duration::zero());
    }

    #[test]
    fn authorize_requires_matching_bearer() {
        let mut headers = HeaderMap::new();
        assert!(authorize(&headers, Some("s3cret")).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer wrong".parse().unwrap());
        assert!(authorize(&headers, Some("s3cret")).is_err());

        headers.insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        assert!(authorize(&headers, Some("s3cret")).is_ok());
        assert!(authorize(&headers, None).is_err());
    }
}
