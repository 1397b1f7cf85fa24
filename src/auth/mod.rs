//! Signed-request authentication: the signing scheme, header parsing and the
//! validator operation.

pub mod signature;
pub mod token;
pub mod validator;

pub use signature::{generate_application_key, generate_application_secret, sign, signed_header};
pub use token::{SignedRequestToken, TokenError};
pub use validator::{
    AuthenticationVerdict, Clock, CredentialCache, MAX_WINDOW_SECONDS, ValidateAuthentication,
    ValidateAuthenticationRequest,
};
