use std::collections::HashMap;

use outreach_core::models::{CreateOrganizationInput, OrganizationStatus};
use serde::Deserialize;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("No customer email found")]
    MissingEmail,
    #[error("Malformed checkout session: {0}")]
    Malformed(String),
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CheckoutSession {
    pub fn from_event(event: &PaymentEvent) -> Result<Self, CheckoutError> {
        serde_json::from_value(event.data.object.clone())
            .map_err(|e| CheckoutError::Malformed(e.to_string()))
    }

    /// Organization for a completed checkout. Requires a customer email.
    pub fn to_organization(&self) -> Result<CreateOrganizationInput, CheckoutError> {
        let details = self.customer_details.clone().unwrap_or_default();
        if non_blank(details.email.as_ref()).is_none() {
            return Err(CheckoutError::MissingEmail);
        }
        let customer_name = non_blank(details.name.as_ref()).unwrap_or_else(|| "Unknown".into());
        let name = non_blank(self.metadata.get("company_name")).unwrap_or(customer_name);

        Ok(CreateOrganizationInput {
            name,
            plan: non_blank(self.metadata.get("plan")),
            status: Some(OrganizationStatus::Active),
            stripe_customer_id: self.customer.clone(),
            stripe_subscription_id: self.subscription.clone(),
        })
    }
}
