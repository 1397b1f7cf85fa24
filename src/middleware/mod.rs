//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Short-circuit requests (reject unauthorized)

/// Signed-request authentication middleware
pub mod auth;
