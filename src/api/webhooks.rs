use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::sequencer::StatusOutcome;
use crate::webhooks::{
    signature, CheckoutSession, Interpreted, PaymentEvent, SchedulingWebhook,
    CHECKOUT_COMPLETED, DEFAULT_TOLERANCE_SECS,
};

const SCHEDULING_SIGNATURE_HEADER: &str = "calendly-webhook-signature";
const PAYMENT_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingAction {
    Created,
    Updated,
    NotFound,
    Ignored,
}

impl From<StatusOutcome> for SchedulingAction {
    fn from(outcome: StatusOutcome) -> Self {
        match outcome {
            StatusOutcome::Created => Self::Created,
            StatusOutcome::Updated => Self::Updated,
            StatusOutcome::NotFound => Self::NotFound,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SchedulingAck {
    pub success: bool,
    pub action: SchedulingAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn scheduling_status() -> Json<Value> {
    Json(json!({ "status": "ok", "webhook": "scheduling" }))
}

pub async fn scheduling(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<SchedulingAck>, ApiError> {
    if let Some(key) = state.settings.calendly_signing_key.as_deref() {
        let header = header_str(&headers, SCHEDULING_SIGNATURE_HEADER)
            .ok_or_else(|| ApiError::BadRequest("Missing signature".into()))?;
        signature::verify(
            key,
            header,
            &body,
            chrono::Utc::now().timestamp(),
            DEFAULT_TOLERANCE_SECS,
        )
        .map_err(|e| {
            tracing::warn!("Rejected scheduling webhook: {}", e);
            ApiError::BadRequest("Invalid signature".into())
        })?;
    }

    let hook: SchedulingWebhook = serde_json::from_str(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid webhook payload: {}", e)))?;
    tracing::info!(event = %hook.event, "Scheduling webhook received");

    match hook.interpret() {
        Interpreted::Ignored => Ok(Json(SchedulingAck {
            success: true,
            action: SchedulingAction::Ignored,
            email: None,
        })),
        Interpreted::MissingEmail => Err(ApiError::BadRequest("No email in payload".into())),
        Interpreted::Event { email, event } => {
            let update = state.sequencer.apply_status_event(&email, &event)?;
            let email = update
                .prospect
                .map(|p| p.email)
                .unwrap_or_else(|| outreach_core::models::normalize_email(&email));
            Ok(Json(SchedulingAck {
                success: true,
                action: update.outcome.into(),
                email: Some(email),
            }))
        }
    }
}

pub async fn payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let Some(secret) = state.settings.stripe_webhook_secret.as_deref() else {
        return Err(ApiError::Internal(
            "Payment webhook secret not configured".into(),
        ));
    };
    let header = header_str(&headers, PAYMENT_SIGNATURE_HEADER)
        .ok_or_else(|| ApiError::BadRequest("No signature".into()))?;
    signature::verify(
        secret,
        header,
        &body,
        chrono::Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|e| {
        tracing::warn!("Payment webhook signature verification failed: {}", e);
        ApiError::BadRequest("Invalid signature".into())
    })?;

    let event: PaymentEvent = serde_json::from_str(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid event payload: {}", e)))?;

    if event.event_type != CHECKOUT_COMPLETED {
        tracing::debug!(event_type = %event.event_type, "Unhandled payment event");
        return Ok(Json(json!({ "received": true })));
    }

    let input = CheckoutSession::from_event(&event)
        .and_then(|session| session.to_organization())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let organization = state.db.create_organization(input)?;
    tracing::info!(slug = %organization.slug, "Created organization from checkout");

    Ok(Json(json!({
        "received": true,
        "organization_id": organization.id,
        "slug": organization.slug,
    })))
}
