//! Inbound webhook payloads from the payment processor and the scheduling tool.

pub mod payment;
pub mod scheduling;
pub mod signature;

pub use payment::{CheckoutError, CheckoutSession, PaymentEvent, CHECKOUT_COMPLETED};
pub use scheduling::{Interpreted, SchedulingWebhook};
pub use signature::{verify, SignatureError, DEFAULT_TOLERANCE_SECS};
