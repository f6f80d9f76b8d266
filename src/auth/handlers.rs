use axum::{extract::State, routing::post, Router};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, Credentials, LoginRequest, RegisterRequest, Registration, VerifyRequest},
        services,
    },
    error::{ApiJson, ApiResult, Envelope},
    state::AppState,
    users::dto::UserResponse,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/verify", post(verify))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let reg = Registration::try_from(payload)?;
    services::register(&state, reg).await.map(Envelope::ok)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let creds = Credentials::try_from(payload)?;
    services::login(&state, creds).await.map(Envelope::ok)
}

#[instrument(skip(state, payload))]
pub async fn verify(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyRequest>,
) -> ApiResult<UserResponse> {
    let token = payload.into_token()?;
    services::verify_token(&state, &token).await.map(Envelope::ok)
}
