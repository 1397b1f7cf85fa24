//! Operation execution contract.
//!
//! Business operations are built on [`OperationTemplate`]: each one owns a
//! template and hands it a validation function and a body. Callers only see
//! [`Operation::process`], which always yields an [`OperationResponse`].

use async_trait::async_trait;

pub mod request;
pub mod response;
pub mod template;
pub mod unit_of_work;

pub use request::{OperationRequest, PaginationSettings, Paging};
pub use response::{OperationError, OperationResponse, OperationStatus, Page};
pub use template::OperationTemplate;
pub use unit_of_work::{PgUnitOfWork, UnitOfWork};

/// A business operation exposed behind the uniform execution contract.
#[async_trait]
pub trait Operation: Send + Sync {
    type Request: OperationRequest;
    type Response;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response>;
}
