//! Data models representing database entities and operation contracts.

/// Registered application credentials
pub mod credential;
