//! Endpoint for callers to check their signed requests.

use axum::Extension;

use crate::{middleware::auth::AuthContext, operation::OperationResponse};

/// Echo the authenticated application.
///
/// # Endpoint
///
/// `GET /api/v1/identity`
///
/// # Authentication
///
/// Requires a valid signed request in the Authorization header.
///
/// # Response (200 OK)
///
/// ```json
/// { "success": true, "errors": [], "data": { "application_name": "billing-worker" } }
/// ```
pub async fn whoami(Extension(auth): Extension<AuthContext>) -> OperationResponse<AuthContext> {
    OperationResponse::ok(auth)
}
