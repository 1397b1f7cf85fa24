//! Signed Operations - operation execution template and signed-request authentication.
//!
//! Internal services expose their operations behind a uniform contract: every
//! operation runs through [`operation::OperationTemplate`], which validates the
//! request, normalizes paging, runs the body and contains every fault, always
//! answering with an [`operation::OperationResponse`].
//!
//! Machine-to-machine calls authenticate with a signed request header checked
//! by [`auth::ValidateAuthentication`] against credentials held in a
//! [`store::CredentialStore`] and cached in a [`cache::Cache`].
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: HMAC-SHA256 signed requests with a replay window
//! - **Format**: JSON requests/responses

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod operation;
pub mod services;
pub mod store;
