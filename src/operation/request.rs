//! Operation requests and paging normalization.

use serde::Deserialize;

use super::response::{INVALID_PAGINATION_MESSAGE, OperationError};

/// Marker for values accepted by the operation template.
///
/// Paged requests override [`paging_mut`](Self::paging_mut) so the template
/// can default and bounds-check `limit`/`offset` before the operation runs.
pub trait OperationRequest: Send {
    fn paging_mut(&mut self) -> Option<&mut Paging> {
        None
    }
}

/// `limit`/`offset` pair carried by paged requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub limit: Option<i64>,

    #[serde(default)]
    pub offset: Option<i64>,
}

impl Paging {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Normalized limit. Only meaningful after the template ran.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or_default()
    }

    /// Normalized offset. Only meaningful after the template ran.
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or_default()
    }
}

/// Paging defaults and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub default_limit: i64,
    pub default_offset: i64,
    pub max_limit: i64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: 25,
            default_offset: 0,
            max_limit: 1000,
        }
    }
}

impl PaginationSettings {
    /// Fills unset values with defaults, then rejects negative values and
    /// limits above `max_limit`.
    pub fn normalize(&self, paging: &mut Paging) -> Result<(), OperationError> {
        let limit = *paging.limit.get_or_insert(self.default_limit);
        let offset = *paging.offset.get_or_insert(self.default_offset);

        if limit < 0 || offset < 0 || limit > self.max_limit {
            return Err(OperationError::validation(INVALID_PAGINATION_MESSAGE));
        }
        Ok(())
    }
}
