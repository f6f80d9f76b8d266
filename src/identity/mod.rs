//! Identity service: credentials and bearer tokens.

use async_trait::async_trait;

use crate::store::StoreError;

pub mod jwt;
mod local;
pub mod password;

pub use local::StoreIdentity;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("The email address is already in use by another account")]
    EmailExists,
    #[error("The email address is badly formatted")]
    InvalidEmail,
    #[error("The password must be at least {min} characters long")]
    WeakPassword { min: usize },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hashing(argon2::password_hash::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Registers a credential and returns the new user id.
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, IdentityError>;

    /// Returns the user id owning the credential.
    async fn verify_credentials(&self, email: &str, password: &str)
        -> Result<String, IdentityError>;

    fn issue_token(&self, user_id: &str) -> Result<String, IdentityError>;

    /// Returns the token's subject.
    fn verify_token(&self, token: &str) -> Result<String, IdentityError>;
}
