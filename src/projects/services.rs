use tracing::{error, info, instrument, warn};

use super::{
    dto::{NewProject, ProjectListResponse, ProjectResponse},
    repo_types::ProjectRecord,
};
use crate::{
    error::ApiError, state::AppState, timestamp::Timestamp, users::repo_types::UserRecord,
};

#[instrument(skip(state))]
pub async fn create_project(state: &AppState, req: NewProject) -> Result<ProjectResponse, ApiError> {
    let store = state.store.as_ref();

    let owner = UserRecord::find(store, &req.user_id).await.map_err(|e| {
        error!(error = %e, user_id = %req.user_id, "load project owner failed");
        ApiError::internal(e)
    })?;
    if owner.is_none() {
        warn!(user_id = %req.user_id, "project owner not found");
        return Err(ApiError::NotFound("User not found".into()));
    }

    let project = ProjectRecord::new(
        req.user_id,
        req.name,
        req.kind,
        req.description,
        Timestamp::now(),
    );
    project.insert_with_owner(store).await.map_err(|e| {
        error!(error = %e, project_id = %project.id, "create project failed");
        ApiError::internal(e)
    })?;

    info!(project_id = %project.id, user_id = %project.user_id, "project created");
    Ok(ProjectResponse {
        message: "Project created successfully",
        project,
    })
}

#[instrument(skip(state))]
pub async fn list_user_projects(
    state: &AppState,
    user_id: &str,
) -> Result<ProjectListResponse, ApiError> {
    let projects = ProjectRecord::list_by_user(state.store.as_ref(), user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "list projects failed");
            ApiError::internal(e)
        })?;
    Ok(ProjectListResponse {
        count: projects.len(),
        projects,
    })
}
