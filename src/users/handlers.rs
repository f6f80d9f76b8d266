use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use tracing::instrument;

use super::{
    dto::{UpdatedUserResponse, UserListResponse, UserResponse},
    services,
};
use crate::{
    error::{ApiJson, ApiResult, Envelope},
    state::AppState,
    store::Document,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/user/:user_id", get(get_user).put(update_user))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<UserResponse> {
    services::get_user(&state, &user_id).await.map(Envelope::ok)
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<UserListResponse> {
    services::list_users(&state).await.map(Envelope::ok)
}

#[instrument(skip(state, fields))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(fields): ApiJson<Document>,
) -> ApiResult<UpdatedUserResponse> {
    services::update_user(&state, &user_id, fields)
        .await
        .map(Envelope::ok)
}
