use axum::{
    extract::{Path, State},
    routing::{get, post},
    Router,
};
use tracing::instrument;

use super::{
    dto::{CreateProjectRequest, NewProject, ProjectListResponse, ProjectResponse},
    services,
};
use crate::{
    error::{ApiJson, ApiResult, Envelope},
    state::AppState,
};

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", post(create_project))
        .route("/api/user/:user_id/projects", get(list_user_projects))
}

#[instrument(skip(state, body))]
pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateProjectRequest>,
) -> ApiResult<ProjectResponse> {
    let req = NewProject::try_from(body)?;
    services::create_project(&state, req).await.map(Envelope::ok)
}

#[instrument(skip(state))]
pub async fn list_user_projects(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ProjectListResponse> {
    services::list_user_projects(&state, &user_id)
        .await
        .map(Envelope::ok)
}
