//! # Webhook event signature format
//!
//! The payment processor signs every webhook delivery so that nobody else can post fake "payment completed" events to
//! the storefront and get goods for free.
//!
//! The signature arrives in a header of the form
//!
//! ```text
//!    t=1718000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
//! ```
//!
//! where
//!   * `t` is the unix timestamp at which the processor signed the event,
//!   * `v1` is the hex-encoded HMAC-SHA256 of `{t}.{payload}`, keyed with the shared webhook secret. There may be more
//!     than one `v1` entry while the secret is being rolled; any one of them matching is sufficient.
//!
//! Other schemes (e.g. `v0`) are ignored. An event is rejected if its timestamp is more than
//! [`SIGNATURE_TOLERANCE_SECS`] away from the current time, which limits replays of captured deliveries.
//!
//! The MAC comparison is constant-time.
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSignatureError {
    #[error("The signature header is missing or malformed: {0}")]
    MalformedHeader(String),
    #[error("No webhook secret is configured, so no event can be verified")]
    MissingSecret,
    #[error("The event timestamp {0} is outside the tolerance window")]
    TimestampOutOfTolerance(i64),
    #[error("No signature in the header matches the payload")]
    SignatureMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, EventSignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    let ts = value
                        .parse::<i64>()
                        .map_err(|_| EventSignatureError::MalformedHeader(format!("bad timestamp '{value}'")))?;
                    timestamp = Some(ts);
                },
                "v1" => match hex::decode(value) {
                    Ok(sig) => signatures.push(sig),
                    Err(_) => return Err(EventSignatureError::MalformedHeader("v1 is not valid hex".into())),
                },
                _ => {},
            }
        }
        let timestamp = timestamp.ok_or_else(|| EventSignatureError::MalformedHeader("no timestamp".into()))?;
        if signatures.is_empty() {
            return Err(EventSignatureError::MalformedHeader("no v1 signature".into()));
        }
        Ok(Self { timestamp, signatures })
    }
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, EventSignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| EventSignatureError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Checks that `header` carries a valid signature of `payload` made with `secret` within
/// `tolerance_secs` of `now`.
pub fn verify_event_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> Result<(), EventSignatureError> {
    if secret.is_empty() {
        return Err(EventSignatureError::MissingSecret);
    }
    let header = SignatureHeader::parse(header)?;
    if now.timestamp().abs_diff(header.timestamp) > tolerance_secs.unsigned_abs() {
        return Err(EventSignatureError::TimestampOutOfTolerance(header.timestamp));
    }
    let matched = header.signatures.iter().try_fold(false, |found, sig| {
        let mac = mac_for(secret, header.timestamp, payload)?;
        Ok::<_, EventSignatureError>(found | mac.verify_slice(sig).is_ok())
    })?;
    if matched {
        Ok(())
    } else {
        Err(EventSignatureError::SignatureMismatch)
    }
}

/// Produces a signature header for `payload`, exactly as the processor would. Useful for tests and local tooling.
pub fn sign_event_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, EventSignatureError> {
    let mac = mac_for(secret, timestamp, payload)?;
    let sig = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={sig}"))
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_718_000_000, 0).unwrap()
    }

    #[test]
    fn valid_signature() {
        let header = sign_event_payload(PAYLOAD, SECRET, 1_718_000_000).unwrap();
        assert!(verify_event_signature(PAYLOAD, &header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn generated_header_parses() {
        let header = sign_event_payload(b"hello", "key", 1).unwrap();
        let parsed = SignatureHeader::parse(&header).unwrap();
        assert_eq!(parsed.timestamp, 1);
        assert_eq!(parsed.signatures[0].len(), 32);
    }

    #[test]
    fn tampered_payload() {
        let header = sign_event_payload(PAYLOAD, SECRET, 1_718_000_000).unwrap();
        let err = verify_event_signature(b"{}", &header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).unwrap_err();
        assert_eq!(err, EventSignatureError::SignatureMismatch);
    }

    #[test]
    fn wrong_secret() {
        let header = sign_event_payload(PAYLOAD, "another", 1_718_000_000).unwrap();
        let err = verify_event_signature(PAYLOAD, &header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).unwrap_err();
        assert_eq!(err, EventSignatureError::SignatureMismatch);
    }

    #[test]
    fn stale_timestamp() {
        let header = sign_event_payload(PAYLOAD, SECRET, 1_718_000_000 - 301).unwrap();
        let err = verify_event_signature(PAYLOAD, &header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).unwrap_err();
        assert_eq!(err, EventSignatureError::TimestampOutOfTolerance(1_718_000_000 - 301));
        let header = sign_event_payload(PAYLOAD, SECRET, 1_718_000_000 - 300).unwrap();
        assert!(verify_event_signature(PAYLOAD, &header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn extreme_timestamps_are_out_of_tolerance() {
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={t},v1=00");
            let err = verify_event_signature(PAYLOAD, &header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).unwrap_err();
            assert_eq!(err, EventSignatureError::TimestampOutOfTolerance(t));
        }
    }

    #[test]
    fn rolled_secrets() {
        let good = sign_event_payload(PAYLOAD, SECRET, 1_718_000_000).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1718000000,v1={},v1={good_sig},v0=abcdef", "00".repeat(32));
        assert!(verify_event_signature(PAYLOAD, &header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).is_ok());
    }

    #[test]
    fn malformed_headers() {
        for header in ["", "t=abc,v1=00", "v1=00", "t=1718000000", "t=1718000000,v1=zz"] {
            let err = verify_event_signature(PAYLOAD, header, SECRET, now(), SIGNATURE_TOLERANCE_SECS).unwrap_err();
            assert!(matches!(err, EventSignatureError::MalformedHeader(_)), "{header} gave {err:?}");
        }
    }

    #[test]
    fn empty_secret_never_verifies() {
        let header = sign_event_payload(PAYLOAD, "", 1_718_000_000).unwrap();
        let err = verify_event_signature(PAYLOAD, &header, "", now(), SIGNATURE_TOLERANCE_SECS).unwrap_err();
        assert_eq!(err, EventSignatureError::MissingSecret);
    }
}
