//! In-memory credential store.
//!
//! [`InMemoryCredentialStore`] keeps credentials in insertion order behind a
//! [`parking_lot::RwLock`]. It counts calls per method so tests can assert on
//! how often the store was reached, and it can be switched to an unavailable
//! state in which every call fails with [`AppError::StoreUnavailable`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::CredentialStore;
use crate::{
    error::AppError,
    models::credential::{Credential, CredentialFilter, NewCredential},
};

#[derive(Default)]
struct Calls {
    get_by_filter: AtomicUsize,
    insert: AtomicUsize,
    update_activation: AtomicUsize,
}

struct Inner {
    credentials: RwLock<Vec<Credential>>,
    unavailable: AtomicBool,
    calls: Calls,
}

/// [`CredentialStore`] held entirely in memory.
///
/// Clones share the same data.
#[derive(Clone)]
pub struct InMemoryCredentialStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                credentials: RwLock::new(Vec::new()),
                unavailable: AtomicBool::new(false),
                calls: Calls::default(),
            }),
        }
    }

    /// Adds a credential directly, bypassing availability and call counting.
    pub fn seed(&self, credential: NewCredential) -> Credential {
        let mut credentials = self.inner.credentials.write();
        let stored = Credential {
            id: credentials.len() as i64 + 1,
            application_key: credential.application_key,
            application_name: credential.application_name,
            application_token: credential.application_token,
            is_active: credential.is_active,
            created_at: Utc::now(),
        };
        credentials.push(stored.clone());
        stored
    }

    /// Makes every subsequent store call fail (`false`) or succeed (`true`).
    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Current contents, in insertion order.
    pub fn snapshot(&self) -> Vec<Credential> {
        self.inner.credentials.read().clone()
    }

    pub fn get_by_filter_calls(&self) -> usize {
        self.inner.calls.get_by_filter.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.inner.calls.insert.load(Ordering::SeqCst)
    }

    pub fn update_activation_calls(&self) -> usize {
        self.inner.calls.update_activation.load(Ordering::SeqCst)
    }

    fn enter(&self, counter: &AtomicUsize) -> Result<(), AppError> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_by_filter(&self, filter: &CredentialFilter) -> Result<Vec<Credential>, AppError> {
        self.enter(&self.inner.calls.get_by_filter)?;

        let offset = filter.paging.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.paging.limit.map_or(usize::MAX, |l| l.max(0) as usize);

        let credentials = self.inner.credentials.read();
        Ok(credentials
            .iter()
            .filter(|c| filter.matches(c))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, credential: NewCredential) -> Result<Credential, AppError> {
        self.enter(&self.inner.calls.insert)?;

        let duplicate = self
            .inner
            .credentials
            .read()
            .iter()
            .any(|c| c.application_key == credential.application_key);
        if duplicate {
            return Err(AppError::DuplicateKey(credential.application_key));
        }

        Ok(self.seed(credential))
    }

    async fn update_activation(&self, application_key: &str, is_active: bool) -> Result<u64, AppError> {
        self.enter(&self.inner.calls.update_activation)?;

        let mut credentials = self.inner.credentials.write();
        let mut affected = 0;
        for credential in credentials.iter_mut().filter(|c| c.application_key == application_key) {
            credential.is_active = is_active;
            affected += 1;
        }
        Ok(affected)
    }
}
