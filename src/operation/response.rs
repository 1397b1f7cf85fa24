//! Uniform operation responses.
//!
//! Every operation answers with an [`OperationResponse`], successful or not,
//! so callers never special-case a missing response. The transport adapter
//! turns the response into JSON and picks the HTTP status from
//! [`OperationStatus`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Error codes carried in [`OperationError::code`].
pub mod codes {
    pub const INTERNAL_ERROR: &str = "50";
    pub const REQUEST_VALIDATION_ERROR: &str = "51";
    pub const UNAUTHORIZED_ERROR: &str = "52";
    pub const SERVICE_UNAVAILABLE: &str = "53";
}

pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal server error occurred while processing the request.";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized.";
pub const NOT_FOUND_MESSAGE: &str = "Requested resource not found.";
pub const INVALID_PAGINATION_MESSAGE: &str = "Invalid pagination parameters.";
pub const MALFORMED_REQUEST_MESSAGE: &str = "Request could not be parsed.";

/// Outcome classification, mapped onto HTTP by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationStatus {
    Ok,
    #[default]
    BadRequest,
    Unauthorized,
    NotFound,
    InternalServerError,
    ServiceUnavailable,
}

impl OperationStatus {
    pub fn http_status(self) -> StatusCode {
        match self {
            OperationStatus::Ok => StatusCode::OK,
            OperationStatus::BadRequest => StatusCode::BAD_REQUEST,
            OperationStatus::Unauthorized => StatusCode::UNAUTHORIZED,
            OperationStatus::NotFound => StatusCode::NOT_FOUND,
            OperationStatus::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            OperationStatus::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// A single `(code, message)` error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub code: String,
    pub message: String,
}

impl OperationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// A request-validation error (code `51`).
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(codes::REQUEST_VALIDATION_ERROR, message)
    }
}

/// Response envelope shared by all operations.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": false,
///   "errors": [{ "code": "51", "message": "application_name can not be empty." }]
/// }
/// ```
///
/// `status` is not serialized; it only drives the HTTP status code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResponse<T> {
    pub success: bool,

    pub errors: Vec<OperationError>,

    #[serde(skip)]
    pub status: OperationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> OperationResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            status: OperationStatus::Ok,
            data: Some(data),
        }
    }

    /// Failed response with the given status and errors.
    pub fn failure(status: OperationStatus, errors: Vec<OperationError>) -> Self {
        Self {
            success: false,
            errors,
            status,
            data: None,
        }
    }

    /// Client error (400) listing every validation problem.
    pub fn rejected(errors: Vec<OperationError>) -> Self {
        Self::failure(OperationStatus::BadRequest, errors)
    }

    pub fn not_found() -> Self {
        Self::failure(
            OperationStatus::NotFound,
            vec![OperationError::validation(NOT_FOUND_MESSAGE)],
        )
    }

    /// Generic 401. Identical for every authentication failure.
    pub fn unauthorized() -> Self {
        Self::failure(
            OperationStatus::Unauthorized,
            vec![OperationError::new(codes::UNAUTHORIZED_ERROR, UNAUTHORIZED_MESSAGE)],
        )
    }

    /// Generic 500 with no internal detail.
    pub fn internal_error() -> Self {
        Self::failure(
            OperationStatus::InternalServerError,
            vec![OperationError::new(codes::INTERNAL_ERROR, INTERNAL_ERROR_MESSAGE)],
        )
    }

    /// Appends an error and marks the response failed with `status`.
    pub fn add_error(&mut self, error: OperationError, status: OperationStatus) {
        self.errors.push(error);
        self.success = false;
        self.status = status;
    }

    /// HTTP status for this response.
    ///
    /// A response flagged successful that still carries errors is inconsistent
    /// and reported as 500.
    pub fn http_status(&self) -> StatusCode {
        if self.success && !self.errors.is_empty() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        self.status.http_status()
    }

    /// 400 for a request body or query string that could not be read. The
    /// parser's own message is not returned.
    pub fn malformed() -> Self {
        Self::rejected(vec![OperationError::validation(MALFORMED_REQUEST_MESSAGE)])
    }
}

/// Convert an operation response into an HTTP response.
///
/// The body is the serialized envelope; the status comes from
/// [`OperationResponse::http_status`].
impl<T: Serialize> IntoResponse for OperationResponse<T> {
    fn into_response(self) -> Response {
        let status = self.http_status();
        (status, Json(self)).into_response()
    }
}

/// Data of a paged response, echoing the normalized paging values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
}
