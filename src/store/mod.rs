//! Credential persistence.
//!
//! Operations and the authentication validator depend on the
//! [`CredentialStore`] trait only. [`PgCredentialStore`] is the production
//! implementation; [`InMemoryCredentialStore`] backs tests and local tooling.

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::credential::{Credential, CredentialFilter, NewCredential},
};

mod memory;
mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Storage contract for credentials.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Credentials matching every set field of `filter`, oldest first.
    ///
    /// `filter.paging` bounds the result when set; unset paging returns every
    /// match.
    async fn get_by_filter(&self, filter: &CredentialFilter) -> Result<Vec<Credential>, AppError>;

    /// Persists a new credential and returns it with its generated identity.
    async fn insert(&self, credential: NewCredential) -> Result<Credential, AppError>;

    /// Sets `is_active` on the credential with `application_key`. Returns the
    /// number of affected records (0 when the key is unknown).
    async fn update_activation(&self, application_key: &str, is_active: bool) -> Result<u64, AppError>;
}
