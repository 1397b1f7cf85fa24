//! The operation execution template.
//!
//! [`OperationTemplate::execute`] runs every operation through the same
//! pipeline:
//!
//! 1. Operation-specific validation. Any error short-circuits with a 400 and
//!    the operation body never runs.
//! 2. Paging normalization for paged requests (defaults, then bounds).
//! 3. The operation body. Its response is returned verbatim.
//! 4. Fault containment. An `Err` from the body, or a panic anywhere in steps
//!    1 to 3, is logged and answered with a generic internal-error response.
//!
//! Each invocation runs inside the span returned by [`Logger::start_trace`].
//!
//! Concrete operations own a template and supply the validation and body as
//! closures, instead of inheriting the pipeline.

use std::{any::Any, error::Error, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::sync::{Mutex, MutexGuard};
use tracing::Instrument;

use super::{
    request::{OperationRequest, PaginationSettings},
    response::{OperationError, OperationResponse},
    unit_of_work::UnitOfWork,
};
use crate::{error::AppError, logger::Logger};

/// Shared pipeline plus the resources every operation carries.
pub struct OperationTemplate {
    name: &'static str,
    logger: Arc<dyn Logger>,
    pagination: PaginationSettings,
    unit_of_work: Mutex<Option<Box<dyn UnitOfWork>>>,
}

impl OperationTemplate {
    /// Creates a template for the operation called `name` (used as trace label
    /// and log tag) with default paging settings and no unit of work.
    pub fn new(name: &'static str, logger: Arc<dyn Logger>) -> Self {
        Self {
            name,
            logger,
            pagination: PaginationSettings::default(),
            unit_of_work: Mutex::new(None),
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationSettings) -> Self {
        self.pagination = pagination;
        self
    }

    /// Attaches a unit of work, released when the template is disposed.
    pub fn with_unit_of_work(mut self, unit_of_work: Box<dyn UnitOfWork>) -> Self {
        *self.unit_of_work.get_mut() = Some(unit_of_work);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn pagination(&self) -> PaginationSettings {
        self.pagination
    }

    /// Access to the attached unit of work, `None` if there is none or it was
    /// already released.
    pub async fn unit_of_work(&self) -> MutexGuard<'_, Option<Box<dyn UnitOfWork>>> {
        self.unit_of_work.lock().await
    }

    /// Runs `request` through the pipeline.
    ///
    /// Never fails: every outcome, including faults, is an
    /// [`OperationResponse`].
    pub async fn execute<Req, T, V, P, Fut>(
        &self,
        request: Req,
        validate: V,
        process: P,
    ) -> OperationResponse<T>
    where
        Req: OperationRequest,
        V: FnOnce(&Req) -> Vec<OperationError>,
        P: FnOnce(Req) -> Fut,
        Fut: Future<Output = Result<OperationResponse<T>, AppError>>,
    {
        let span = self.logger.start_trace(self.name);

        let pipeline = async move {
            self.logger
                .debug(&format!("Starting operation '{}'.", self.name), &[self.name]);

            let errors = validate(&request);
            if !errors.is_empty() {
                return Ok(OperationResponse::rejected(errors));
            }

            let mut request = request;
            if let Some(paging) = request.paging_mut() {
                if let Err(error) = self.pagination.normalize(paging) {
                    return Ok(OperationResponse::rejected(vec![error]));
                }
            }

            process(request).await
        };

        match AssertUnwindSafe(pipeline).catch_unwind().instrument(span).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                let err: &(dyn Error + 'static) = &err;
                self.logger.error(
                    "An internal error occurred while processing the request.",
                    Some(err),
                    &[self.name],
                );
                OperationResponse::internal_error()
            }
            Err(panic) => {
                self.logger.error(
                    &format!(
                        "Operation panicked while processing the request: {}",
                        panic_message(panic.as_ref())
                    ),
                    None,
                    &[self.name],
                );
                OperationResponse::internal_error()
            }
        }
    }

    /// Releases the attached unit of work. Safe to call more than once; only
    /// the first call has an effect.
    pub fn dispose(&mut self) {
        if let Some(mut unit_of_work) = self.unit_of_work.get_mut().take() {
            unit_of_work.release();
        }
    }
}

impl Drop for OperationTemplate {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
