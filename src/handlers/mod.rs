//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Builds the matching operation and runs it
//! 3. Returns the operation response, which picks its own HTTP status

/// Credential management endpoints
pub mod credentials;

/// Health and application info endpoints
pub mod health;

/// Signed-request identity echo
pub mod identity;
