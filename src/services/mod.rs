//! Business operations.
//!
//! Every operation here is built on the operation template and is driven by
//! HTTP handlers. The authentication validator lives in [`crate::auth`].

pub mod credentials;
pub mod health;
