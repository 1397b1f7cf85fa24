//! Signed-request authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Read the `Authorization` header verbatim (`<key>:<hash>:<timestamp>`)
//! 2. Run it through the shared authentication validator
//! 3. Inject authentication context into the request
//! 4. Reject everything else with the same HTTP 401 body

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    app::AppState,
    auth::ValidateAuthenticationRequest,
    operation::{Operation, OperationResponse, OperationStatus},
};

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    /// Name on record for the credential that signed the request
    pub application_name: String,
}

/// Signed-request authentication middleware function.
///
/// # Flow
///
/// 1. Extract the `Authorization` header (missing or non-UTF-8 reads as empty)
/// 2. Validate it with [`ValidateAuthentication`](crate::auth::ValidateAuthentication)
/// 3. If valid: inject `AuthContext` into request, call next handler
/// 4. Otherwise: return 401 Unauthorized
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: 4f9c0d7f0a3b4c1e9d2a6b8c7e5f1a2b:Xk3...=:2025-01-15T10:30:00Z
/// ```
///
/// # Returns
///
/// - The downstream response when the request is authenticated
/// - 401 with the generic unauthorized body for any rejection, including a
///   missing or blank header
/// - 500 with the generic internal-error body when the credential store failed
pub async fn signed_request_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    // Step 1: Extract Authorization header
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();

    // Step 2: Validate the signed request
    let response = state
        .validator
        .process(ValidateAuthenticationRequest::new(header))
        .await;

    if response.status == OperationStatus::InternalServerError {
        return response.into_response();
    }

    match response.data {
        // Step 3: Create authentication context and continue
        Some(verdict) if response.success && verdict.is_valid => {
            request.extensions_mut().insert(AuthContext {
                application_name: verdict.application_name,
            });
            next.run(request).await
        }
        _ => OperationResponse::<()>::unauthorized().into_response(),
    }
}
