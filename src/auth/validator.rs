//! Signed-request authentication.
//!
//! [`ValidateAuthentication`] checks a signed-request header in a fixed order,
//! stopping at the first failure:
//!
//! 1. Parse `<key>:<hash>:<timestamp>`.
//! 2. Reject timestamps more than the window ahead of now (`ts > now + window`).
//! 3. Reject timestamps at or beyond the window behind now (`now - window >= ts`).
//! 4. Resolve the credential through the cache, falling back to the store for
//!    the *active* credential with that key.
//! 5. Reject when nothing was resolved or the credential is inactive.
//! 6. Recompute the signature and compare key and hash.
//!
//! Every rejection produces the same unauthorized response. The reason is
//! only logged.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{
    signature::{hashes_match, sign},
    token::SignedRequestToken,
};
use crate::{
    cache::Cache,
    error::AppError,
    logger::Logger,
    models::credential::{Credential, CredentialFilter},
    operation::{Operation, OperationError, OperationRequest, OperationResponse, OperationTemplate},
    store::CredentialStore,
};

const OPERATION: &str = "ValidateAuthentication";

/// Widest accepted window, in seconds. Wider values are clamped to it.
pub const MAX_WINDOW_SECONDS: i64 = 86_400;

/// Process-wide credential cache, keyed by application key.
pub type CredentialCache = Cache<String, Credential>;

/// Source of "now" for the window checks.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A raw signed-request header to validate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateAuthenticationRequest {
    #[serde(default)]
    pub header: String,
}

impl ValidateAuthenticationRequest {
    pub fn new(header: impl Into<String>) -> Self {
        Self { header: header.into() }
    }
}

impl OperationRequest for ValidateAuthenticationRequest {}

/// Successful verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticationVerdict {
    pub is_valid: bool,
    pub application_name: String,
}

/// Why a well-formed request was refused. Logged, never returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Malformed,
    FromTheFuture,
    Expired,
    UnknownOrInactive,
    SignatureMismatch,
}

impl Rejection {
    fn describe(self) -> &'static str {
        match self {
            Rejection::Malformed => "malformed header",
            Rejection::FromTheFuture => "timestamp ahead of the accepted window",
            Rejection::Expired => "timestamp behind the accepted window",
            Rejection::UnknownOrInactive => "no active credential for key",
            Rejection::SignatureMismatch => "signature mismatch",
        }
    }
}

/// The authentication validator operation.
pub struct ValidateAuthentication {
    template: OperationTemplate,
    store: Arc<dyn CredentialStore>,
    cache: Arc<CredentialCache>,
    window: Duration,
    clock: Clock,
}

impl ValidateAuthentication {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: Arc<CredentialCache>,
        logger: Arc<dyn Logger>,
        window_seconds: i64,
    ) -> Self {
        Self {
            template: OperationTemplate::new(OPERATION, logger),
            store,
            cache,
            window: Duration::seconds(window_seconds.clamp(1, MAX_WINDOW_SECONDS)),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the wall clock, for deterministic window checks.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Accepted distance between a request timestamp and now.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Runs steps 1 to 6. `Ok(Err(_))` is a refusal, `Err(_)` a store fault.
    async fn verify(&self, header: &str) -> Result<Result<String, Rejection>, AppError> {
        let Ok(token) = header.parse::<SignedRequestToken>() else {
            return Ok(Err(Rejection::Malformed));
        };

        let now = (self.clock)();
        if token.client_timestamp > now + self.window {
            return Ok(Err(Rejection::FromTheFuture));
        }
        if now - self.window >= token.client_timestamp {
            return Ok(Err(Rejection::Expired));
        }

        let store = &self.store;
        let credential = self
            .cache
            .try_get_with(&token.application_key, |key| async move {
                let filter = CredentialFilter::active_key(key);
                Ok::<_, AppError>(store.get_by_filter(&filter).await?.into_iter().next())
            })
            .await?;

        let Some(credential) = credential.filter(|c| c.is_active) else {
            return Ok(Err(Rejection::UnknownOrInactive));
        };

        let expected = sign(
            &credential.application_token,
            &credential.application_name,
            &token.raw_timestamp,
        );
        if credential.application_key != token.application_key
            || !hashes_match(&token.client_hash, &expected)
        {
            return Ok(Err(Rejection::SignatureMismatch));
        }

        Ok(Ok(credential.application_name))
    }
}

fn validate_request(request: &ValidateAuthenticationRequest) -> Vec<OperationError> {
    if request.header.trim().is_empty() {
        vec![OperationError::validation("header can not be empty.")]
    } else {
        Vec::new()
    }
}

#[async_trait]
impl Operation for ValidateAuthentication {
    type Request = ValidateAuthenticationRequest;
    type Response = AuthenticationVerdict;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response> {
        self.template
            .execute(request, validate_request, |request| async move {
                match self.verify(&request.header).await? {
                    Ok(application_name) => Ok(OperationResponse::ok(AuthenticationVerdict {
                        is_valid: true,
                        application_name,
                    })),
                    Err(rejection) => {
                        self.template.logger().warn(
                            &format!("Signed request rejected: {}.", rejection.describe()),
                            None,
                            &[OPERATION],
                        );
                        Ok(OperationResponse::unauthorized())
                    }
                }
            })
            .await
    }
}
