//! Application state and HTTP router.
//!
//! # Routes
//!
//! Public:
//! - `GET /health`, `GET /info`
//! - `POST|GET /management/authentication`
//! - `GET /management/authentication/{key}`
//! - `PATCH /management/authentication/{key}/activation`
//! - `POST /management/authentication/validate`
//!
//! Signed-request protected:
//! - `GET /api/v1/identity`

use std::{sync::Arc, time::Duration};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    auth::{CredentialCache, ValidateAuthentication},
    cache::DEFAULT_CAPACITY,
    config::Config,
    db::DbPool,
    error::AppError,
    handlers,
    logger::Logger,
    middleware,
    models::credential::{Credential, CredentialFilter},
    operation::PaginationSettings,
    store::CredentialStore,
};

/// Tunables shared by the operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub auth_window_seconds: i64,
    pub credential_cache_ttl: Option<Duration>,
    pub credential_cache_capacity: u64,
    pub pagination: PaginationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_window_seconds: 30,
            credential_cache_ttl: None,
            credential_cache_capacity: DEFAULT_CAPACITY,
            pagination: PaginationSettings::default(),
        }
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            auth_window_seconds: config.auth_window_seconds,
            credential_cache_ttl: config.credential_cache_ttl(),
            credential_cache_capacity: config.credential_cache_max_capacity,
            pagination: config.pagination(),
        }
    }
}

/// State shared by every handler.
///
/// The credential cache and the validator are process-wide; the other
/// operations are built per request from the shared parts.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub store: Arc<dyn CredentialStore>,
    pub cache: Arc<CredentialCache>,
    pub logger: Arc<dyn Logger>,
    pub validator: Arc<ValidateAuthentication>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(pool: DbPool, store: Arc<dyn CredentialStore>, logger: Arc<dyn Logger>, settings: Settings) -> Self {
        let cache = Arc::new(CredentialCache::with_limits(
            settings.credential_cache_capacity,
            settings.credential_cache_ttl,
        ));
        let validator = Arc::new(ValidateAuthentication::new(
            store.clone(),
            cache.clone(),
            logger.clone(),
            settings.auth_window_seconds,
        ));

        Self {
            pool,
            store,
            cache,
            logger,
            validator,
            settings,
        }
    }

    /// Replaces the cache contents with every active credential.
    ///
    /// Returns the number of credentials loaded. On error the cache is left
    /// as it was.
    pub async fn preload_credentials(&self) -> Result<usize, AppError> {
        let store = &self.store;
        let loaded = self
            .cache
            .load_all(|| async move {
                let filter = CredentialFilter {
                    is_active: Some(true),
                    ..CredentialFilter::default()
                };
                let entries: Vec<(String, Credential)> = store
                    .get_by_filter(&filter)
                    .await?
                    .into_iter()
                    .map(|credential| (credential.application_key.clone(), credential))
                    .collect();
                Ok::<_, AppError>(entries)
            })
            .await?;

        self.logger
            .info(&format!("Preloaded {loaded} credential(s) into the cache."), &["AppState"]);
        Ok(loaded)
    }
}

/// Builds the HTTP router.
pub fn router(state: AppState) -> Router {
    // Routes behind signed-request authentication
    let protected_routes = Router::new()
        .route("/api/v1/identity", get(handlers::identity::whoami))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::signed_request_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/info", get(handlers::health::application_info))
        // Credential management
        .route(
            "/management/authentication",
            post(handlers::credentials::create_credential).get(handlers::credentials::list_credentials),
        )
        .route(
            "/management/authentication/validate",
            post(handlers::credentials::validate_authentication),
        )
        .route(
            "/management/authentication/{key}",
            get(handlers::credentials::get_credential),
        )
        .route(
            "/management/authentication/{key}/activation",
            patch(handlers::credentials::update_activation),
        )
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
