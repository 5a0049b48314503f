//! Pre-shared-key request signing.
//!
//! A signed request carries three headers: [`API_KEY_HEADER`] naming the
//! key, [`DATE_HEADER`] with an RFC 2822 timestamp, and [`SIGNATURE_HEADER`]
//! holding the lowercase hex HMAC-SHA256 of the canonical request:
//!
//! ```text
//! METHOD\nPATH_AND_QUERY\nDATE\nhex(sha256(body))
//! ```
//!
//! The same scheme signs outbound calls to the archive service.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const DATE_HEADER: &str = "date";
pub const SIGNATURE_HEADER: &str = "signature";

/// Default tolerated distance between the `Date` header and server time.
pub const DEFAULT_MAX_SKEW_SECS: i64 = 900;

type HmacSha256 = Hmac<Sha256>;

/// A pre-shared API key and its secret.
#[derive(Clone)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Why a signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature header present but no API key is configured")]
    NotConfigured,
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("unknown API key")]
    UnknownKey,
    #[error("malformed Date header")]
    BadDate,
    #[error("request date outside the accepted window")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
    /// The body could not be read in full, so there is nothing to verify.
    #[error("signed body unreadable or larger than {0} bytes")]
    UnreadableBody(usize),
}

/// The parts of a request that are covered by the signature.
#[derive(Debug, Clone, Copy)]
pub struct SignedRequest<'a> {
    pub method: &'a str,
    pub path_and_query: &'a str,
    pub date: &'a str,
    pub body: &'a [u8],
}

impl SignedRequest<'_> {
    /// The canonical string the HMAC is computed over.
    pub fn canonical(&self) -> String {
        let digest = Sha256::digest(self.body);
        format!(
            "{}\n{}\n{}\n{digest:x}",
            self.method.to_ascii_uppercase(),
            self.path_and_query,
            self.date
        )
    }
}

fn mac_for(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length")
}

/// Compute the hex signature of a request under `secret`.
pub fn sign(secret: &str, request: &SignedRequest<'_>) -> String {
    let mut mac = mac_for(secret);
    mac.update(request.canonical().as_bytes());
    hex_encode(&mac.finalize().into_bytes())
}

/// Verify a presented signature.
///
/// `presented_key` must equal the configured key, the date must be within
/// `max_skew_secs` of `now`, and the signature must match in constant time.
pub fn verify(
    credentials: &ApiCredentials,
    presented_key: &str,
    signature: &str,
    request: &SignedRequest<'_>,
    now: DateTime<Utc>,
    max_skew_secs: i64,
) -> Result<(), SignatureError> {
    if presented_key != credentials.key {
        return Err(SignatureError::UnknownKey);
    }

    let date = DateTime::parse_from_rfc2822(request.date)
        .map_err(|_| SignatureError::BadDate)?
        .with_timezone(&Utc);
    if (now - date).num_seconds().abs() > max_skew_secs {
        return Err(SignatureError::Expired);
    }

    let expected = hex_decode(signature).ok_or(SignatureError::Mismatch)?;
    let mut mac = mac_for(&credentials.secret);
    mac.update(request.canonical().as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(text: &str) -> Option<Vec<u8>> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn credentials() -> ApiCredentials {
        ApiCredentials {
            key: "agent".to_string(),
            secret: "s3cr3t".to_string(),
        }
    }

    fn request<'a>(date: &'a str, body: &'a [u8]) -> SignedRequest<'a> {
        SignedRequest {
            method: "post",
            path_and_query: "/api/v1/hosts",
            date,
            body,
        }
    }

    #[test]
    fn canonical_form_is_stable() {
        let canonical = request("Mon, 01 Jan 2024 00:00:00 +0000", b"").canonical();
        assert_eq!(
            canonical,
            "POST\n/api/v1/hosts\nMon, 01 Jan 2024 00:00:00 +0000\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn signature_is_hex_and_deterministic() {
        let date = "Mon, 01 Jan 2024 00:00:00 +0000";
        let a = sign("s3cr3t", &request(date, b"{}"));
        let b = sign("s3cr3t", &request(date, b"{}"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, sign("other", &request(date, b"{}")));
    }

    #[test]
    fn valid_signature_verifies() {
        let now = Utc::now();
        let date = now.to_rfc2822();
        let req = request(&date, br#"{"name":"web-01"}"#);
        let signature = sign("s3cr3t", &req);
        assert_eq!(
            verify(&credentials(), "agent", &signature, &req, now, 900),
            Ok(())
        );
    }

    #[test]
    fn tampered_body_is_rejected() {
        let now = Utc::now();
        let date = now.to_rfc2822();
        let signature = sign("s3cr3t", &request(&date, b"original"));
        assert_matches!(
            verify(
                &credentials(),
                "agent",
                &signature,
                &request(&date, b"tampered"),
                now,
                900
            ),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn unknown_key_and_garbage_signature_are_rejected() {
        let now = Utc::now();
        let date = now.to_rfc2822();
        let req = request(&date, b"");
        let signature = sign("s3cr3t", &req);
        assert_matches!(
            verify(&credentials(), "intruder", &signature, &req, now, 900),
            Err(SignatureError::UnknownKey)
        );
        assert_matches!(
            verify(&credentials(), "agent", "zz", &req, now, 900),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_or_malformed_dates_are_rejected() {
        let now = Utc::now();
        let stale = (now - chrono::Duration::hours(1)).to_rfc2822();
        let req = request(&stale, b"");
        let signature = sign("s3cr3t", &req);
        assert_matches!(
            verify(&credentials(), "agent", &signature, &req, now, 900),
            Err(SignatureError::Expired)
        );

        let req = request("yesterday", b"");
        let signature = sign("s3cr3t", &req);
        assert_matches!(
            verify(&credentials(), "agent", &signature, &req, now, 900),
            Err(SignatureError::BadDate)
        );
    }

    #[test]
    fn hex_decode_rejects_odd_and_non_hex_input() {
        assert_eq!(hex_decode("0aff"), Some(vec![0x0a, 0xff]));
        assert_eq!(hex_decode("abc"), None);
        assert_eq!(hex_decode("zz"), None);
    }
}
