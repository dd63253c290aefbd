use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::Engine;
use domains::{Identity, Role};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::AuthError;

/// A configured login.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub name: String,
    /// PHC-formatted Argon2 hash.
    pub password_hash: SecretString,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// Verifies `Authorization: Basic ...` headers against configured accounts.
///
/// Unknown names are checked against a throwaway hash so they cost as much
/// as a wrong password.
#[derive(Debug, Default)]
pub struct BasicAuthenticator {
    users: HashMap<String, UserAccount>,
    decoy_hash: Option<String>,
}

impl BasicAuthenticator {
    pub fn new(users: impl IntoIterator<Item = UserAccount>) -> Self {
        let decoy_hash = hash_password("decoy password for unknown users").ok();
        Self {
            users: users.into_iter().map(|u| (u.name.clone(), u)).collect(),
            decoy_hash,
        }
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Resolves the value of an `Authorization` header to an identity.
    pub fn authenticate_header(&self, header: &str) -> Result<Identity, AuthError> {
        let encoded = header
            .strip_prefix("Basic ")
            .or_else(|| header.strip_prefix("basic "))
            .ok_or_else(|| AuthError::Malformed("expected the Basic scheme".into()))?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        let decoded =
            String::from_utf8(decoded).map_err(|e| AuthError::Malformed(e.to_string()))?;
        let (name, password) = decoded
            .split_once(':')
            .ok_or_else(|| AuthError::Malformed("missing `:` separator".into()))?;
        self.verify(name, password)
    }

    pub fn verify(&self, name: &str, password: &str) -> Result<Identity, AuthError> {
        let Some(account) = self.users.get(name) else {
            let decoy = self.decoy_hash.as_deref().and_then(|h| PasswordHash::new(h).ok());
            if let Some(parsed) = decoy {
                let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
            }
            debug!(user = name, "unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        let parsed = PasswordHash::new(account.password_hash.expose_secret())
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| {
                debug!(user = name, "password mismatch");
                AuthError::InvalidCredentials
            })?;
        Ok(Identity::new(account.name.clone(), account.roles.iter().copied()))
    }
}

/// Produces a PHC string suitable for `auth.users[].password_hash`.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn authenticator() -> BasicAuthenticator {
        BasicAuthenticator::new([UserAccount {
            name: "alexandre".into(),
            password_hash: SecretString::from(hash_password("s3cret").unwrap()),
            roles: vec![Role::Author],
        }])
    }

    fn basic(credentials: &str) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }

    #[test]
    fn valid_credentials_yield_identity() {
        let identity = authenticator()
            .authenticate_header(&basic("alexandre:s3cret"))
            .unwrap();
        assert_eq!(identity.name(), "alexandre");
        assert!(identity.has_role(Role::Author));
    }

    #[test]
    fn wrong_password_and_unknown_user_look_alike() {
        let auth = authenticator();
        assert_eq!(
            auth.authenticate_header(&basic("alexandre:nope")),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.authenticate_header(&basic("marine:s3cret")),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn unknown_user_still_pays_for_a_hash_check() {
        let auth = authenticator();
        let decoy = auth.decoy_hash.as_deref().unwrap();
        assert!(PasswordHash::new(decoy).is_ok());

        let started = Instant::now();
        let _ = auth.verify("alexandre", "nope");
        let wrong_password = started.elapsed();

        let started = Instant::now();
        assert_eq!(auth.verify("marine", "nope"), Err(AuthError::InvalidCredentials));
        let unknown_user = started.elapsed();

        assert!(
            unknown_user * 4 >= wrong_password,
            "unknown user took {unknown_user:?}, wrong password {wrong_password:?}"
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let auth = authenticator();
        assert!(matches!(
            auth.authenticate_header("Bearer abc"),
            Err(AuthError::Malformed(_))
        ));
        assert!(matches!(
            auth.authenticate_header("Basic !!!"),
            Err(AuthError::Malformed(_))
        ));
        assert!(matches!(
            auth.authenticate_header(&basic("no-separator")),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn broken_configured_hash_is_reported() {
        let auth = BasicAuthenticator::new([UserAccount {
            name: "jean".into(),
            password_hash: SecretString::from("plaintext"),
            roles: Vec::new(),
        }]);
        assert!(matches!(auth.verify("jean", "plaintext"), Err(AuthError::Hash(_))));
    }
}
