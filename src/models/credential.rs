//! Credential model and the request/response contracts of the credential operations.
//!
//! A credential registers one application allowed to send signed requests.
//! The secret (`application_token`) is the HMAC key of the signing scheme; it
//! is returned to the caller once, when the credential is created, and never
//! again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::operation::{OperationRequest, Paging};

/// Represents a credential record from the database.
///
/// # Database Table
///
/// Maps to the `credentials` table with columns:
/// - `id`: Store-generated identity
/// - `application_key`: Public identifier sent in signed requests (unique, immutable)
/// - `application_name`: Human-readable name, also part of the signed message
/// - `application_token`: Shared secret used as the HMAC key (immutable)
/// - `is_active`: Inactive credentials never authenticate
/// - `created_at`: Creation timestamp, used for filtering only
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Credential {
    pub id: i64,
    pub application_key: String,
    pub application_name: String,
    pub application_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Values for a credential about to be inserted. The store assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCredential {
    pub application_key: String,
    pub application_name: String,
    pub application_token: String,
    pub is_active: bool,
}

/// Credential as exposed by read operations. The secret is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialView {
    pub application_key: String,
    pub application_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Credential> for CredentialView {
    fn from(credential: Credential) -> Self {
        Self {
            application_key: credential.application_key,
            application_name: credential.application_name,
            is_active: credential.is_active,
            created_at: credential.created_at,
        }
    }
}

/// Credential as returned by the create operation, secret included.
///
/// # JSON Example
///
/// ```json
/// {
///   "application_key": "4f9c0d7f0a3b4c1e9d2a6b8c7e5f1a2b",
///   "application_name": "billing-worker",
///   "application_token": "b7e1...",
///   "is_active": true,
///   "created_at": "2025-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedCredential {
    pub application_key: String,
    pub application_name: String,
    pub application_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Credential> for CreatedCredential {
    fn from(credential: Credential) -> Self {
        Self {
            application_key: credential.application_key,
            application_name: credential.application_name,
            application_token: credential.application_token,
            is_active: credential.is_active,
            created_at: credential.created_at,
        }
    }
}

/// Request body for creating a credential.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCredentialRequest {
    #[serde(default)]
    pub application_name: String,
}

impl OperationRequest for CreateCredentialRequest {}

/// Request for a single credential by key.
#[derive(Debug, Clone, Default)]
pub struct GetCredentialRequest {
    pub application_key: String,
}

impl OperationRequest for GetCredentialRequest {}

/// Filter over credentials. Every set field narrows the result; unset fields
/// match everything.
///
/// As an operation request it is paged: the template fills `paging` before the
/// store sees it. Internal callers that bypass the template may leave `paging`
/// unset to read without a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialFilter {
    pub application_key: Option<String>,
    pub application_name: Option<String>,
    pub application_token: Option<String>,
    pub is_active: Option<bool>,
    pub start_created_at: Option<DateTime<Utc>>,
    pub end_created_at: Option<DateTime<Utc>>,
    pub paging: Paging,
}

impl CredentialFilter {
    /// Filter matching the active credential with `application_key`.
    pub fn active_key(application_key: impl Into<String>) -> Self {
        Self {
            application_key: Some(application_key.into()),
            is_active: Some(true),
            ..Self::default()
        }
    }

    /// Whether `credential` satisfies every set field. Paging is not considered.
    pub fn matches(&self, credential: &Credential) -> bool {
        fn eq(expected: &Option<String>, actual: &str) -> bool {
            expected.as_deref().is_none_or(|value| value.is_empty() || value == actual)
        }

        eq(&self.application_key, &credential.application_key)
            && eq(&self.application_name, &credential.application_name)
            && eq(&self.application_token, &credential.application_token)
            && self.is_active.is_none_or(|active| active == credential.is_active)
            && self.start_created_at.is_none_or(|start| credential.created_at >= start)
            && self.end_created_at.is_none_or(|end| credential.created_at <= end)
    }
}

impl OperationRequest for CredentialFilter {
    fn paging_mut(&mut self) -> Option<&mut Paging> {
        Some(&mut self.paging)
    }
}

/// Query string of `GET /management/authentication`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialQuery {
    pub application_key: Option<String>,
    pub application_name: Option<String>,
    pub application_token: Option<String>,
    pub is_active: Option<bool>,
    pub start_created_at: Option<DateTime<Utc>>,
    pub end_created_at: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<CredentialQuery> for CredentialFilter {
    fn from(query: CredentialQuery) -> Self {
        Self {
            application_key: query.application_key,
            application_name: query.application_name,
            application_token: query.application_token,
            is_active: query.is_active,
            start_created_at: query.start_created_at,
            end_created_at: query.end_created_at,
            paging: Paging {
                limit: query.limit,
                offset: query.offset,
            },
        }
    }
}

/// Body of `PATCH /management/authentication/{key}/activation`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ActivationBody {
    pub is_active: bool,
}

/// Activation toggle for one credential.
#[derive(Debug, Clone, Default)]
pub struct UpdateActivationRequest {
    pub application_key: String,
    pub is_active: bool,
}

impl OperationRequest for UpdateActivationRequest {}

/// Result of a successful activation toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationView {
    pub application_key: String,
    pub is_active: bool,
}
