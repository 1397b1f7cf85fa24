//! Health check endpoints for service monitoring.

use axum::extract::State;

use crate::{
    app::AppState,
    operation::{Operation, OperationResponse, PgUnitOfWork},
    services::health::{ApplicationInfo, EmptyRequest, GetApplicationInfo, HealthCheck, HealthReport},
};

/// Health check handler.
///
/// # Checks
///
/// - Database connectivity (opens a transaction and executes a simple query)
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "errors": [],
///   "data": {
///     "application_name": "signed_ops",
///     "version": "0.1.0",
///     "components": [{ "name": "postgres", "status": "ok", "checked_at": "2025-12-21T19:00:00Z" }]
///   }
/// }
/// ```
///
/// # Response (503 Service Unavailable)
///
/// Same report, with `"success": false` and one error per failing component.
pub async fn health_check(State(state): State<AppState>) -> OperationResponse<HealthReport> {
    let unit_of_work = PgUnitOfWork::new(state.pool.clone());

    HealthCheck::new(state.logger, Box::new(unit_of_work))
        .process(EmptyRequest)
        .await
}

/// Application name, version and platform.
///
/// # Endpoint
///
/// `GET /info`
pub async fn application_info(State(state): State<AppState>) -> OperationResponse<ApplicationInfo> {
    GetApplicationInfo::new(state.logger).process(EmptyRequest).await
}
