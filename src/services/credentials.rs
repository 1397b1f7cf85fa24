//! Credential lifecycle operations.
//!
//! This module handles:
//! - Creating credentials with generated key and secret
//! - Reading one credential by key, or a filtered page of credentials
//! - Toggling activation, with eviction from the credential cache
//!
//! Store faults are returned as `Err` and turned into a generic internal
//! error by the operation template. An empty result is a not-found response.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    auth::{CredentialCache, generate_application_key, generate_application_secret},
    logger::Logger,
    models::credential::{
        ActivationView, CreateCredentialRequest, CreatedCredential, CredentialFilter, CredentialView,
        GetCredentialRequest, NewCredential, UpdateActivationRequest,
    },
    operation::{
        Operation, OperationError, OperationResponse, OperationTemplate, Page, PaginationSettings,
    },
    store::CredentialStore,
};

fn require(field: &str, value: &str) -> Option<OperationError> {
    value
        .trim()
        .is_empty()
        .then(|| OperationError::validation(format!("{field} can not be empty.")))
}

/// Registers a new application.
///
/// # Process
///
/// 1. Reject an empty `application_name`
/// 2. Generate a 32-character hex key and a 64 to 127 character secret
/// 3. Insert the credential as active
/// 4. Return it, secret included (the only time the secret is returned)
pub struct CreateCredential {
    template: OperationTemplate,
    store: Arc<dyn CredentialStore>,
}

impl CreateCredential {
    pub fn new(store: Arc<dyn CredentialStore>, logger: Arc<dyn Logger>) -> Self {
        Self {
            template: OperationTemplate::new("CreateCredential", logger),
            store,
        }
    }
}

#[async_trait]
impl Operation for CreateCredential {
    type Request = CreateCredentialRequest;
    type Response = CreatedCredential;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response> {
        self.template
            .execute(
                request,
                |request| require("application_name", &request.application_name).into_iter().collect(),
                |request| async move {
                    let credential = self
                        .store
                        .insert(NewCredential {
                            application_key: generate_application_key(),
                            application_name: request.application_name.trim().to_string(),
                            application_token: generate_application_secret(),
                            is_active: true,
                        })
                        .await?;

                    self.template.logger().info(
                        &format!("Created credential '{}'.", credential.application_key),
                        &[self.template.name()],
                    );
                    Ok(OperationResponse::ok(CreatedCredential::from(credential)))
                },
            )
            .await
    }
}

/// Reads one credential by application key, active or not.
pub struct GetCredential {
    template: OperationTemplate,
    store: Arc<dyn CredentialStore>,
}

impl GetCredential {
    pub fn new(store: Arc<dyn CredentialStore>, logger: Arc<dyn Logger>) -> Self {
        Self {
            template: OperationTemplate::new("GetCredential", logger),
            store,
        }
    }
}

#[async_trait]
impl Operation for GetCredential {
    type Request = GetCredentialRequest;
    type Response = CredentialView;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response> {
        self.template
            .execute(
                request,
                |request| require("application_key", &request.application_key).into_iter().collect(),
                |request| async move {
                    let filter = CredentialFilter {
                        application_key: Some(request.application_key),
                        ..CredentialFilter::default()
                    };

                    Ok(match self.store.get_by_filter(&filter).await?.into_iter().next() {
                        Some(credential) => OperationResponse::ok(CredentialView::from(credential)),
                        None => OperationResponse::not_found(),
                    })
                },
            )
            .await
    }
}

/// Lists credentials matching a filter, one page at a time.
///
/// The page echoes the normalized `limit` and `offset`.
pub struct GetCredentials {
    template: OperationTemplate,
    store: Arc<dyn CredentialStore>,
}

impl GetCredentials {
    pub fn new(store: Arc<dyn CredentialStore>, logger: Arc<dyn Logger>) -> Self {
        Self {
            template: OperationTemplate::new("GetCredentials", logger),
            store,
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationSettings) -> Self {
        self.template = self.template.with_pagination(pagination);
        self
    }
}

fn validate_filter(filter: &CredentialFilter) -> Vec<OperationError> {
    match (filter.start_created_at, filter.end_created_at) {
        (Some(start), Some(end)) if start > end => vec![OperationError::validation(
            "start_created_at can not be later than end_created_at.",
        )],
        _ => Vec::new(),
    }
}

#[async_trait]
impl Operation for GetCredentials {
    type Request = CredentialFilter;
    type Response = Page<CredentialView>;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response> {
        self.template
            .execute(request, validate_filter, |filter| async move {
                let credentials = self.store.get_by_filter(&filter).await?;
                if credentials.is_empty() {
                    return Ok(OperationResponse::not_found());
                }

                Ok(OperationResponse::ok(Page {
                    items: credentials.into_iter().map(CredentialView::from).collect(),
                    limit: filter.paging.limit(),
                    offset: filter.paging.offset(),
                }))
            })
            .await
    }
}

/// Activates or deactivates a credential.
///
/// On success the key is evicted from the credential cache so the next
/// validation in this process reloads it from the store.
pub struct UpdateCredentialActivation {
    template: OperationTemplate,
    store: Arc<dyn CredentialStore>,
    cache: Arc<CredentialCache>,
}

impl UpdateCredentialActivation {
    pub fn new(store: Arc<dyn CredentialStore>, cache: Arc<CredentialCache>, logger: Arc<dyn Logger>) -> Self {
        Self {
            template: OperationTemplate::new("UpdateCredentialActivation", logger),
            store,
            cache,
        }
    }
}

#[async_trait]
impl Operation for UpdateCredentialActivation {
    type Request = UpdateActivationRequest;
    type Response = ActivationView;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response> {
        self.template
            .execute(
                request,
                |request| require("application_key", &request.application_key).into_iter().collect(),
                |request| async move {
                    let affected = self
                        .store
                        .update_activation(&request.application_key, request.is_active)
                        .await?;
                    if affected == 0 {
                        return Ok(OperationResponse::not_found());
                    }

                    self.cache.remove(&request.application_key);
                    self.template.logger().info(
                        &format!(
                            "Credential '{}' is now {}.",
                            request.application_key,
                            if request.is_active { "active" } else { "inactive" }
                        ),
                        &[self.template.name()],
                    );

                    Ok(OperationResponse::ok(ActivationView {
                        application_key: request.application_key,
                        is_active: request.is_active,
                    }))
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{
        logger::recording::RecordingLogger,
        operation::{OperationStatus, Paging, response::codes},
        store::InMemoryCredentialStore,
    };

    fn seeded_store() -> InMemoryCredentialStore {
        let store = InMemoryCredentialStore::new();
        for (key, active) in [("K1", true), ("K2", false), ("K3", true)] {
            store.seed(NewCredential {
                application_key: key.into(),
                application_name: format!("app-{key}"),
                application_token: format!("secret-{key}"),
                is_active: active,
            });
        }
        store
    }

    fn logger() -> Arc<RecordingLogger> {
        Arc::new(RecordingLogger::default())
    }

    #[tokio::test]
    async fn create_returns_the_secret_once_and_stores_an_active_credential() {
        let store = InMemoryCredentialStore::new();
        let operation = CreateCredential::new(Arc::new(store.clone()), logger());

        let response = operation
            .process(CreateCredentialRequest {
                application_name: "billing-worker".into(),
            })
            .await;

        let created = response.data.unwrap();
        assert_eq!(created.application_name, "billing-worker");
        assert_eq!(created.application_key.len(), 32);
        assert!((64..128).contains(&created.application_token.len()));
        assert!(created.is_active);

        let stored = store.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].application_token, created.application_token);
    }

    #[tokio::test]
    async fn create_with_blank_name_never_reaches_the_store() {
        let store = InMemoryCredentialStore::new();
        let operation = CreateCredential::new(Arc::new(store.clone()), logger());

        let response = operation
            .process(CreateCredentialRequest {
                application_name: "  ".into(),
            })
            .await;

        assert_eq!(response.status, OperationStatus::BadRequest);
        assert_eq!(response.errors[0].code, codes::REQUEST_VALIDATION_ERROR);
        assert_eq!(store.insert_calls(), 0);
    }

    #[tokio::test]
    async fn create_during_store_outage_is_a_generic_internal_error() {
        let store = InMemoryCredentialStore::new();
        store.set_available(false);
        let logger = logger();
        let operation = CreateCredential::new(Arc::new(store), logger.clone());

        let response = operation
            .process(CreateCredentialRequest {
                application_name: "billing-worker".into(),
            })
            .await;

        assert_eq!(response, OperationResponse::internal_error());
        assert_eq!(logger.errors()[0].tags, vec!["CreateCredential".to_string()]);
    }

    #[tokio::test]
    async fn get_returns_inactive_credentials_without_the_secret() {
        let operation = GetCredential::new(Arc::new(seeded_store()), logger());

        let response = operation
            .process(GetCredentialRequest {
                application_key: "K2".into(),
            })
            .await;

        let view = response.data.unwrap();
        assert_eq!(view.application_name, "app-K2");
        assert!(!view.is_active);
    }

    #[tokio::test]
    async fn get_unknown_key_is_not_found() {
        let operation = GetCredential::new(Arc::new(seeded_store()), logger());

        let response = operation
            .process(GetCredentialRequest {
                application_key: "missing".into(),
            })
            .await;

        assert_eq!(response.status, OperationStatus::NotFound);
        assert_eq!(response.errors[0].code, codes::REQUEST_VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn list_filters_and_echoes_normalized_paging() {
        let operation = GetCredentials::new(Arc::new(seeded_store()), logger());

        let response = operation
            .process(CredentialFilter {
                is_active: Some(true),
                ..CredentialFilter::default()
            })
            .await;

        let page = response.data.unwrap();
        let keys: Vec<_> = page.items.iter().map(|c| c.application_key.as_str()).collect();
        assert_eq!(keys, vec!["K1", "K3"]);
        assert_eq!((page.limit, page.offset), (25, 0));
    }

    #[tokio::test]
    async fn list_applies_configured_paging() {
        let operation = GetCredentials::new(Arc::new(seeded_store()), logger()).with_pagination(
            PaginationSettings {
                default_limit: 1,
                default_offset: 0,
                max_limit: 2,
            },
        );

        let first = operation.process(CredentialFilter::default()).await.data.unwrap();
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.limit, 1);

        let too_large = operation
            .process(CredentialFilter {
                paging: Paging::new(3, 0),
                ..CredentialFilter::default()
            })
            .await;
        assert_eq!(too_large.status, OperationStatus::BadRequest);
    }

    #[tokio::test]
    async fn list_with_no_matches_is_not_found() {
        let operation = GetCredentials::new(Arc::new(seeded_store()), logger());

        let response = operation
            .process(CredentialFilter {
                application_name: Some("nobody".into()),
                ..CredentialFilter::default()
            })
            .await;

        assert_eq!(response.status, OperationStatus::NotFound);
    }

    #[tokio::test]
    async fn list_rejects_inverted_date_range() {
        let store = seeded_store();
        let operation = GetCredentials::new(Arc::new(store.clone()), logger());
        let now = Utc::now();

        let response = operation
            .process(CredentialFilter {
                start_created_at: Some(now),
                end_created_at: Some(now - Duration::days(1)),
                ..CredentialFilter::default()
            })
            .await;

        assert_eq!(response.status, OperationStatus::BadRequest);
        assert_eq!(store.get_by_filter_calls(), 0);
    }

    #[tokio::test]
    async fn deactivation_updates_the_store_and_evicts_the_cache() {
        let store = seeded_store();
        let cache = Arc::new(CredentialCache::new());
        cache.set("K1".into(), store.snapshot()[0].clone());
        let operation = UpdateCredentialActivation::new(Arc::new(store.clone()), cache.clone(), logger());

        let response = operation
            .process(UpdateActivationRequest {
                application_key: "K1".into(),
                is_active: false,
            })
            .await;

        assert_eq!(
            response.data,
            Some(ActivationView {
                application_key: "K1".into(),
                is_active: false,
            })
        );
        assert!(!store.snapshot()[0].is_active);
        assert_eq!(store.update_activation_calls(), 1);
        assert_eq!(cache.peek(&"K1".to_string()), None);
    }

    #[tokio::test]
    async fn activation_of_unknown_key_is_not_found() {
        let store = seeded_store();
        let cache = Arc::new(CredentialCache::new());
        cache.set("K1".into(), store.snapshot()[0].clone());
        let operation = UpdateCredentialActivation::new(Arc::new(store.clone()), cache.clone(), logger());

        let response = operation
            .process(UpdateActivationRequest {
                application_key: "missing".into(),
                is_active: true,
            })
            .await;

        assert_eq!(response.status, OperationStatus::NotFound);
        assert_eq!(store.update_activation_calls(), 1);
        assert_eq!(cache.count(), 1);
    }
}
