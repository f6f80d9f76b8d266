use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    IdentityError, IdentityService,
};
use crate::store::{from_document, to_document, DocumentStore, StoreError, Write, CREDENTIALS};
use crate::timestamp::Timestamp;

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Stored under `credentials/<normalised email>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credential {
    uid: String,
    email: String,
    display_name: String,
    password_hash: String,
    created_at: Timestamp,
}

/// Identity service keeping argon2 credentials in the document store and
/// issuing HS256 tokens.
pub struct StoreIdentity {
    store: Arc<dyn DocumentStore>,
    keys: JwtKeys,
}

impl StoreIdentity {
    pub fn new(store: Arc<dyn DocumentStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }
}

#[async_trait]
impl IdentityService for StoreIdentity {
    #[instrument(skip(self, password))]
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<String, IdentityError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let credential = Credential {
            uid: Uuid::new_v4().simple().to_string(),
            email: email.clone(),
            display_name: display_name.to_string(),
            password_hash: hash_password(password).map_err(IdentityError::Hashing)?,
            created_at: Timestamp::now(),
        };
        let data = to_document(&credential)?;
        match self
            .store
            .commit(vec![Write::create(CREDENTIALS, &email, data)])
            .await
        {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => {
                warn!(email = %email, "email already registered");
                return Err(IdentityError::EmailExists);
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %credential.uid, "credential created");
        Ok(credential.uid)
    }

    #[instrument(skip(self, password))]
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<String, IdentityError> {
        let email = normalize_email(email);
        let Some(doc) = self.store.get(CREDENTIALS, &email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(IdentityError::InvalidCredentials);
        };
        let credential: Credential = from_document(doc)?;

        let ok = verify_password(password, &credential.password_hash)
            .map_err(IdentityError::Hashing)?;
        if !ok {
            warn!(email = %email, user_id = %credential.uid, "login invalid password");
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(credential.uid)
    }

    fn issue_token(&self, user_id: &str) -> Result<String, IdentityError> {
        self.keys.sign(user_id).map_err(IdentityError::Signing)
    }

    fn verify_token(&self, token: &str) -> Result<String, IdentityError> {
        let claims = self.keys.verify(token).map_err(IdentityError::InvalidToken)?;
        Ok(claims.sub)
    }
}
