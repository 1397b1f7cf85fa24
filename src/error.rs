//! Error types raised below the operation boundary.
//!
//! Stores, the credential cache loaders and units of work return
//! `Result<_, AppError>`. Nothing converts these into client-visible responses
//! except the operation template, which logs the full error and answers with a
//! generic internal-error response.

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Store Availability**: The credential store refused the call (outage, maintenance)
/// - **Conflicts**: Uniqueness violations detected outside the database
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The credential store cannot serve requests right now.
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    /// An insert collided with an existing application key.
    #[error("Duplicate application key: {0}")]
    DuplicateKey(String),
}
