//! Stripe webhook signature verification and event decoding
use super::PaymentTarget;
use crate::payments::error::{PaymentError, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Check a `Stripe-Signature` header (`t=...,v1=...`) against the raw body.
///
/// Any one matching `v1` entry is accepted; timestamps further than
/// `tolerance_secs` from `now` are rejected.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<()> {
    let mut timestamp: Option<&str> = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {},
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".into()))?;
    let issued: i64 = timestamp
        .parse()
        .map_err(|_| PaymentError::InvalidSignature("timestamp is not a number".into()))?;
    if candidates.is_empty() {
        return Err(PaymentError::InvalidSignature("no v1 signature".into()));
    }
    let within = now
        .checked_sub(issued)
        .and_then(i64::checked_abs)
        .is_some_and(|skew| skew <= tolerance_secs);
    if !within {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance".into()));
    }

    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(PaymentError::InvalidSignature("no matching signature".into()))
}

#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EnvelopeData,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    object: IntentObject,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct LastPaymentError {
    message: Option<String>,
}

/// Events the backend reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Succeeded { event_id: String, intent_id: String, target: PaymentTarget },
    Failed { event_id: String, intent_id: String, target: PaymentTarget, reason: Option<String> },
    Ignored { event_id: String, event_type: String },
}

/// Decode a verified payload; unknown types and foreign intents are ignored
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent> {
    let envelope: Envelope = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::InvalidPayload(e.to_string()))?;

    let object = envelope.data.object;
    let target = match (object.metadata.get("kind"), object.metadata.get("id")) {
        (Some(kind), Some(id)) => PaymentTarget::from_metadata(kind, id),
        _ => None,
    };

    let event = match (envelope.event_type.as_str(), target) {
        ("payment_intent.succeeded", Some(target)) => {
            WebhookEvent::Succeeded { event_id: envelope.id, intent_id: object.id, target }
        },
        ("payment_intent.payment_failed", Some(target)) => WebhookEvent::Failed {
            event_id: envelope.id,
            intent_id: object.id,
            target,
            reason: object.last_payment_error.and_then(|e| e.message),
        },
        _ => WebhookEvent::Ignored { event_id: envelope.id, event_type: envelope.event_type },
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BookingId;

    const SECRET: &str = "whsec_test";

    fn sign(payload: &[u8], t: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{t}.").as_bytes());
        mac.update(payload);
        format!("t={t},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, 1_700_000_000);
        assert!(verify_signature(payload, &header, SECRET, 1_700_000_100, 300).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = sign(br#"{"id":"evt_1"}"#, 1_700_000_000);
        let result = verify_signature(br#"{"id":"evt_2"}"#, &header, SECRET, 1_700_000_000, 300);
        assert!(matches!(result, Err(PaymentError::InvalidSignature(_))));
    }

    #[test]
    fn test_expired_signature_rejected() {
        let payload = b"{}";
        let header = sign(payload, 1_700_000_000);
        assert!(verify_signature(payload, &header, SECRET, 1_700_000_301, 300).is_err());
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let payload = b"{}";
        let header = format!("{},v1=deadbeef", sign(payload, 42));
        let rotated = header.replacen("v1=", "v1=00ff,v1=", 1);
        assert!(verify_signature(payload, &rotated, SECRET, 42, 300).is_ok());
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let header = format!("t={},v1=00", i64::MIN);
        assert!(matches!(
            verify_signature(b"{}", &header, SECRET, 1_700_000_000, 300),
            Err(PaymentError::InvalidSignature(_))
        ));
        let header = format!("t={},v1=00", i64::MAX);
        assert!(verify_signature(b"{}", &header, SECRET, -1_700_000_000, 300).is_err());
    }

    #[test]
    fn test_missing_parts_rejected() {
        assert!(verify_signature(b"{}", "v1=abcd", SECRET, 0, 300).is_err());
        assert!(verify_signature(b"{}", "t=10", SECRET, 10, 300).is_err());
    }

    #[test]
    fn test_parse_succeeded_event() {
        let booking = BookingId::new();
        let payload = format!(
            r#"{{"id":"evt_9","type":"payment_intent.succeeded",
                "data":{{"object":{{"id":"pi_1","metadata":{{"kind":"booking","id":"{booking}"}}}}}}}}"#
        );
        let event = parse_event(payload.as_bytes()).unwrap();
        assert_eq!(
            event,
            WebhookEvent::Succeeded {
                event_id: "evt_9".into(),
                intent_id: "pi_1".into(),
                target: PaymentTarget::Booking(booking),
            }
        );
    }

    #[test]
    fn test_parse_unrelated_event_ignored() {
        let payload = br#"{"id":"evt_3","type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#;
        assert!(matches!(parse_event(payload).unwrap(), WebhookEvent::Ignored { .. }));
        assert!(parse_event(b"not json").is_err());
    }
}
