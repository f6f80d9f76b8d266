use serde::{Deserialize, Serialize};

use crate::{error::ApiError, users::dto::PublicUser};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "displayName")]
    pub name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for token verification.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

/// Validated registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Validated login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn present(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

impl TryFrom<RegisterRequest> for Registration {
    type Error = ApiError;

    fn try_from(req: RegisterRequest) -> Result<Self, Self::Error> {
        let email = req.email.filter(|e| !e.trim().is_empty());
        match (email, present(req.password), trimmed(req.name)) {
            (Some(email), Some(password), Some(display_name)) => Ok(Self {
                email,
                password,
                display_name,
            }),
            _ => Err(ApiError::BadRequest(
                "Missing required fields: email, password, name".into(),
            )),
        }
    }
}

impl TryFrom<LoginRequest> for Credentials {
    type Error = ApiError;

    fn try_from(req: LoginRequest) -> Result<Self, Self::Error> {
        match (trimmed(req.email), present(req.password)) {
            (Some(email), Some(password)) => Ok(Self { email, password }),
            _ => Err(ApiError::BadRequest(
                "Missing required fields: email, password".into(),
            )),
        }
    }
}

impl VerifyRequest {
    pub fn into_token(self) -> Result<String, ApiError> {
        trimmed(self.token).ok_or_else(|| ApiError::Unauthorized("No token provided".into()))
    }
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: PublicUser,
    pub token: String,
}
