//! Health and application information operations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    logger::Logger,
    operation::{
        Operation, OperationError, OperationRequest, OperationResponse, OperationStatus, OperationTemplate,
        UnitOfWork, response::codes,
    },
};

/// Request of the parameterless operations in this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRequest;

impl OperationRequest for EmptyRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Ok,
    PartiallyAvailable,
    Critical,
}

/// State of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    pub name: String,
    pub status: ComponentStatus,
    pub checked_at: DateTime<Utc>,
}

/// Health check report.
///
/// # JSON Example
///
/// ```json
/// {
///   "application_name": "signed_ops",
///   "version": "0.1.0",
///   "components": [
///     { "name": "postgres", "status": "ok", "checked_at": "2025-01-15T10:30:00Z" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub application_name: &'static str,
    pub version: &'static str,
    pub components: Vec<ComponentInfo>,
}

/// Checks every dependency reachable through the attached unit of work.
///
/// Any component that is not `ok` adds a `53` error and turns the response
/// into service-unavailable; the report is still returned. The unit of work
/// is released when the operation is dropped.
pub struct HealthCheck {
    template: OperationTemplate,
}

impl HealthCheck {
    pub fn new(logger: Arc<dyn Logger>, unit_of_work: Box<dyn UnitOfWork>) -> Self {
        Self {
            template: OperationTemplate::new("HealthCheck", logger).with_unit_of_work(unit_of_work),
        }
    }

    /// Releases the unit of work ahead of drop.
    pub fn dispose(&mut self) {
        self.template.dispose();
    }
}

#[async_trait]
impl Operation for HealthCheck {
    type Request = EmptyRequest;
    type Response = HealthReport;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response> {
        self.template
            .execute(request, |_| Vec::new(), |_| async move {
                let mut components = Vec::new();

                if let Some(unit_of_work) = self.template.unit_of_work().await.as_mut() {
                    let status = match unit_of_work.probe().await {
                        Ok(()) => ComponentStatus::Ok,
                        Err(err) => {
                            self.template.logger().warn(
                                &format!("Component '{}' failed its probe.", unit_of_work.component()),
                                Some(&err),
                                &[self.template.name()],
                            );
                            ComponentStatus::Critical
                        }
                    };
                    components.push(ComponentInfo {
                        name: unit_of_work.component().to_string(),
                        status,
                        checked_at: Utc::now(),
                    });
                }

                let unhealthy: Vec<OperationError> = components
                    .iter()
                    .filter(|c| c.status != ComponentStatus::Ok)
                    .map(|c| {
                        OperationError::new(
                            codes::SERVICE_UNAVAILABLE,
                            format!("Component '{}' is {:?}.", c.name, c.status),
                        )
                    })
                    .collect();

                let mut response = OperationResponse::ok(HealthReport {
                    application_name: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                    components,
                });
                for error in unhealthy {
                    response.add_error(error, OperationStatus::ServiceUnavailable);
                }
                Ok(response)
            })
            .await
    }
}

/// Static facts about the running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationInfo {
    pub application_name: &'static str,
    pub version: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Reports name, version and platform. Always succeeds.
pub struct GetApplicationInfo {
    template: OperationTemplate,
}

impl GetApplicationInfo {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            template: OperationTemplate::new("GetApplicationInfo", logger),
        }
    }
}

#[async_trait]
impl Operation for GetApplicationInfo {
    type Request = EmptyRequest;
    type Response = ApplicationInfo;

    async fn process(&self, request: Self::Request) -> OperationResponse<Self::Response> {
        self.template
            .execute(request, |_| Vec::new(), |_| async {
                Ok(OperationResponse::ok(ApplicationInfo {
                    application_name: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                    os: std::env::consts::OS,
                    arch: std::env::consts::ARCH,
                    timestamp: Utc::now(),
                }))
            })
            .await
    }
}
