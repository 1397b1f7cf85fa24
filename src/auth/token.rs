//! Parsing of the signed-request header.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Naive timestamp layouts accepted besides RFC 3339. Interpreted as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Why a header could not be parsed. Never shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("header does not have the form <key>:<hash>:<timestamp>")]
    Malformed,

    #[error("timestamp '{0}' is not a recognized date-time")]
    Timestamp(String),
}

/// A decoded `<application_key>:<hash>:<timestamp>` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequestToken {
    pub application_key: String,
    pub client_hash: String,
    /// The timestamp exactly as sent; the signature is computed over this text.
    pub raw_timestamp: String,
    pub client_timestamp: DateTime<Utc>,
}

impl FromStr for SignedRequestToken {
    type Err = TokenError;

    /// Splits on the first two `:` only, so RFC 3339 timestamps keep their colons.
    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let mut segments = header.trim().splitn(3, ':');
        let (Some(key), Some(hash), Some(timestamp)) = (segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::Malformed);
        };
        if key.is_empty() || hash.is_empty() {
            return Err(TokenError::Malformed);
        }

        let client_timestamp =
            parse_timestamp(timestamp).ok_or_else(|| TokenError::Timestamp(timestamp.to_string()))?;

        Ok(Self {
            application_key: key.to_string(),
            client_hash: hash.to_string(),
            raw_timestamp: timestamp.to_string(),
            client_timestamp,
        })
    }
}

/// Parses an RFC 3339 timestamp, or a naive one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
