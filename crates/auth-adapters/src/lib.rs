//! # auth-adapters
//!
//! HTTP Basic credential checks against Argon2 hashes from configuration,
//! and the role-based [`AccessControl`](domains::AccessControl) policy.

pub mod access;
pub mod basic;

pub use access::RoleAccessControl;
pub use basic::{hash_password, BasicAuthenticator, UserAccount};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The `Authorization` header is not a well-formed Basic credential.
    #[error("malformed credentials: {0}")]
    Malformed(String),

    /// Unknown user or wrong password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// A configured hash could not be parsed or produced.
    #[error("password hash error: {0}")]
    Hash(String),
}
