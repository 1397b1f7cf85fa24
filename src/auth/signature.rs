//! HMAC request signing and credential material generation.
//!
//! A client signs a request with
//!
//! ```text
//! base64(HMAC-SHA256(key = secret, message = uppercase(application_name + timestamp)))
//! ```
//!
//! and sends `<application_key>:<hash>:<timestamp>` in the `Authorization`
//! header. The same functions are used on both sides of the exchange.

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Bounds of the generated secret length, in characters (upper bound exclusive).
const SECRET_MIN_LEN: usize = 64;
const SECRET_MAX_LEN: usize = 128;

/// Computes the base64 signature of `application_name` + `timestamp` under `secret`.
///
/// The message is uppercased before signing; `timestamp` must be passed
/// exactly as it appears in the header.
pub fn sign(secret: &str, application_name: &str, timestamp: &str) -> String {
    let message = format!("{application_name}{timestamp}").to_uppercase();

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(message.as_bytes());

    STANDARD.encode(mac.finalize().into_bytes())
}

/// Builds a complete signed-request header value.
///
/// # Example
///
/// ```
/// let header = signed_ops::auth::signed_header("K1", "AppTest", "S1", "2025-01-15T10:30:00Z");
/// assert!(header.starts_with("K1:"));
/// assert!(header.ends_with(":2025-01-15T10:30:00Z"));
/// ```
pub fn signed_header(application_key: &str, application_name: &str, secret: &str, timestamp: &str) -> String {
    format!(
        "{application_key}:{}:{timestamp}",
        sign(secret, application_name, timestamp)
    )
}

/// Compares a received hash with the expected one without short-circuiting on
/// the first differing byte.
pub fn hashes_match(received: &str, expected: &str) -> bool {
    received.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// New public application key: 32 lowercase hex characters.
pub fn generate_application_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// New application secret.
///
/// Four random 128-bit identifiers in hex, truncated to a random length
/// between 64 and 127 characters.
pub fn generate_application_secret() -> String {
    let mut secret: String = (0..4).map(|_| Uuid::new_v4().simple().to_string()).collect();
    let length = rand::rng().random_range(SECRET_MIN_LEN..SECRET_MAX_LEN);
    secret.truncate(length);
    secret
}
