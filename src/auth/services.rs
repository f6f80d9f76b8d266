use tracing::{error, info, instrument, warn};

use crate::{
    auth::dto::{AuthResponse, Credentials, Registration},
    error::ApiError,
    state::AppState,
    timestamp::Timestamp,
    users::{dto::UserResponse, repo_types::UserRecord},
};

/// Synthetic session handed out while the store is unavailable. Nothing is
/// persisted and no credential is checked.
fn mock_session(email: String, display_name: String, message: &str) -> AuthResponse {
    let now = Timestamp::now();
    let millis = now.unix_millis();
    let user = UserRecord::new(format!("user_{millis}"), email, display_name, now);
    AuthResponse {
        message: format!("{message} (mock mode)"),
        user: user.into(),
        token: format!("mock_token_{millis}"),
    }
}

#[instrument(skip(state, reg), fields(email = %reg.email))]
pub async fn register(state: &AppState, reg: Registration) -> Result<AuthResponse, ApiError> {
    if !state.store_available {
        warn!("store unavailable; returning mock registration");
        return Ok(mock_session(
            reg.email,
            reg.display_name,
            "User registered successfully",
        ));
    }

    let uid = state
        .identity
        .create_credential(&reg.email, &reg.password, &reg.display_name)
        .await
        .map_err(|e| {
            warn!(error = %e, "identity service rejected registration");
            ApiError::BadRequest(e.to_string())
        })?;

    let user = UserRecord::new(uid, reg.email, reg.display_name, Timestamp::now());
    if let Err(e) = user.save(state.store.as_ref()).await {
        error!(error = %e, user_id = %user.uid, "write user record failed");
        return Err(ApiError::BadRequest(e.to_string()));
    }

    let token = state.identity.issue_token(&user.uid).map_err(|e| {
        error!(error = %e, user_id = %user.uid, "token issue failed");
        ApiError::BadRequest(e.to_string())
    })?;

    info!(user_id = %user.uid, "user registered");
    Ok(AuthResponse {
        message: "User registered successfully".into(),
        user: user.into(),
        token,
    })
}

#[instrument(skip(state, creds), fields(email = %creds.email))]
pub async fn login(state: &AppState, creds: Credentials) -> Result<AuthResponse, ApiError> {
    if !state.store_available {
        warn!("store unavailable; returning mock login");
        let display_name = creds
            .email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        return Ok(mock_session(creds.email, display_name, "Login successful"));
    }

    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let uid = state
        .identity
        .verify_credentials(&creds.email, &creds.password)
        .await
        .map_err(|e| {
            warn!(error = %e, "login rejected");
            invalid()
        })?;

    let store = state.store.as_ref();
    let now = Timestamp::now();
    if let Err(e) = UserRecord::touch_last_login(store, &uid, now).await {
        error!(error = %e, user_id = %uid, "refresh lastLogin failed");
        return Err(invalid());
    }
    let user = match UserRecord::find(store, &uid).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(user_id = %uid, "credential without user record");
            return Err(invalid());
        }
        Err(e) => {
            error!(error = %e, user_id = %uid, "load user failed");
            return Err(invalid());
        }
    };

    let token = state.identity.issue_token(&user.uid).map_err(|e| {
        error!(error = %e, user_id = %user.uid, "token issue failed");
        invalid()
    })?;

    info!(user_id = %user.uid, "user logged in");
    Ok(AuthResponse {
        message: "Login successful".into(),
        user: user.into(),
        token,
    })
}

#[instrument(skip(state, token))]
pub async fn verify_token(state: &AppState, token: &str) -> Result<UserResponse, ApiError> {
    let uid = state.identity.verify_token(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;

    let user = UserRecord::find(state.store.as_ref(), &uid)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %uid, "load user failed");
            ApiError::internal(e)
        })?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(UserResponse { user: user.into() })
}
