//! `t=<unix>,v1=<hex hmac>` signature headers, as sent by Stripe and Calendly.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed delivery, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing timestamp")]
    MissingTimestamp,
    #[error("Missing signature")]
    MissingSignature,
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    #[error("Timestamp outside tolerance")]
    Expired,
    #[error("Signature mismatch")]
    Mismatch,
    #[error("Invalid webhook secret")]
    InvalidSecret,
}

/// HMAC-SHA256 of `"{timestamp}.{payload}"`, hex encoded.
pub fn sign(secret: &str, timestamp: i64, payload: &str) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `header` against `payload`. Any one matching `v1` entry is accepted.
pub fn verify(
    secret: &str,
    header: &str,
    payload: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    let age = now
        .checked_sub(ts)
        .map(i64::unsigned_abs)
        .ok_or(SignatureError::Expired)?;
    if age > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let signed_payload = format!("{}.{}", timestamp, payload);
    let matched = signatures.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(signed_payload.as_bytes());
        mac.verify_slice(&expected).is_ok()
    });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
