use serde::{Deserialize, Serialize};

use super::repo_types::ProjectRecord;
use crate::error::ApiError;

/// Request body for project creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub user_id: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
}

/// Validated form of [`CreateProjectRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub description: String,
}

fn required(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl TryFrom<CreateProjectRequest> for NewProject {
    type Error = ApiError;

    fn try_from(req: CreateProjectRequest) -> Result<Self, Self::Error> {
        match (required(req.user_id), required(req.name), required(req.kind)) {
            (Some(user_id), Some(name), Some(kind)) => Ok(Self {
                user_id,
                name,
                kind,
                description: req.description.unwrap_or_default(),
            }),
            _ => Err(ApiError::BadRequest(
                "Missing required fields: userId, name, type".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub message: &'static str,
    pub project: ProjectRecord,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectRecord>,
    pub count: usize,
}
