//! Credential management HTTP handlers.
//!
//! This module implements the credential-related API endpoints:
//! - POST /management/authentication - Create credential
//! - GET /management/authentication - List credentials by filter
//! - GET /management/authentication/{key} - Get credential by key
//! - PATCH /management/authentication/{key}/activation - Activate or deactivate
//! - POST /management/authentication/validate - Validate a signed-request header
//!
//! Handlers only translate HTTP input into operation requests. Every outcome,
//! including the status code, comes from the operation response. A body or
//! query string that cannot be deserialized is answered with the same
//! envelope (400, code 51) instead of the framework's plain-text rejection.

use std::error::Error;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};

use crate::{
    app::AppState,
    auth::{AuthenticationVerdict, ValidateAuthenticationRequest},
    models::credential::{
        ActivationBody, ActivationView, CreateCredentialRequest, CreatedCredential, CredentialFilter,
        CredentialQuery, CredentialView, GetCredentialRequest, UpdateActivationRequest,
    },
    operation::{Operation, OperationResponse, Page},
    services::credentials::{CreateCredential, GetCredential, GetCredentials, UpdateCredentialActivation},
};

/// Create a new credential.
///
/// # Endpoint
///
/// `POST /management/authentication`
///
/// # Request Body
///
/// ```json
/// { "application_name": "billing-worker" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: The created credential, secret included
/// - **Error (400)**: Empty application name, or a body that is not the JSON above
/// - **Error (500)**: Store failure
pub async fn create_credential(
    State(state): State<AppState>,
    request: Result<Json<CreateCredentialRequest>, JsonRejection>,
) -> OperationResponse<CreatedCredential> {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return malformed(&state, &rejection),
    };

    CreateCredential::new(state.store, state.logger)
        .process(request)
        .await
}

/// List credentials matching the query string.
///
/// # Endpoint
///
/// `GET /management/authentication?is_active=true&limit=10&offset=0`
///
/// Accepted filters: `application_key`, `application_name`,
/// `application_token`, `is_active`, `start_created_at`, `end_created_at`
/// (RFC 3339), plus `limit` and `offset`.
///
/// # Response
///
/// - **Success (200 OK)**: `{ "items": [...], "limit": 10, "offset": 0 }`
/// - **Error (400)**: Invalid or unparsable paging, or inverted date range
/// - **Error (404)**: Nothing matched
pub async fn list_credentials(
    State(state): State<AppState>,
    query: Result<Query<CredentialQuery>, QueryRejection>,
) -> OperationResponse<Page<CredentialView>> {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return malformed(&state, &rejection),
    };

    GetCredentials::new(state.store, state.logger)
        .with_pagination(state.settings.pagination)
        .process(CredentialFilter::from(query))
        .await
}

/// Get a credential by application key. The secret is not returned.
///
/// # Endpoint
///
/// `GET /management/authentication/{key}`
pub async fn get_credential(
    State(state): State<AppState>,
    Path(application_key): Path<String>,
) -> OperationResponse<CredentialView> {
    GetCredential::new(state.store, state.logger)
        .process(GetCredentialRequest { application_key })
        .await
}

/// Activate or deactivate a credential.
///
/// # Endpoint
///
/// `PATCH /management/authentication/{key}/activation`
///
/// # Request Body
///
/// ```json
/// { "is_active": false }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{ "application_key": "...", "is_active": false }`
/// - **Error (400)**: Missing or unreadable body
/// - **Error (404)**: Unknown key
pub async fn update_activation(
    State(state): State<AppState>,
    Path(application_key): Path<String>,
    body: Result<Json<ActivationBody>, JsonRejection>,
) -> OperationResponse<ActivationView> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed(&state, &rejection),
    };

    UpdateCredentialActivation::new(state.store, state.cache, state.logger)
        .process(UpdateActivationRequest {
            application_key,
            is_active: body.is_active,
        })
        .await
}

/// Validate a signed-request header on behalf of a gateway.
///
/// # Endpoint
///
/// `POST /management/authentication/validate`
///
/// # Request Body
///
/// ```json
/// { "header": "<key>:<hash>:<timestamp>" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: `{ "is_valid": true, "application_name": "billing-worker" }`
/// - **Error (400)**: Blank header
/// - **Error (401)**: Any other rejection, with a generic message
pub async fn validate_authentication(
    State(state): State<AppState>,
    request: Result<Json<ValidateAuthenticationRequest>, JsonRejection>,
) -> OperationResponse<AuthenticationVerdict> {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return malformed(&state, &rejection),
    };

    state.validator.process(request).await
}

/// Logs why extraction failed and answers with the generic validation error.
fn malformed<T>(state: &AppState, rejection: &(dyn Error + 'static)) -> OperationResponse<T> {
    state
        .logger
        .warn("Rejected a request that could not be parsed.", Some(rejection), &["handlers"]);
    OperationResponse::malformed()
}
