use serde::Serialize;
use serde_json::{Map, Value};

use super::repo_types::{Role, UserRecord, UserSettings};
use crate::timestamp::Timestamp;

/// Fields of a user safe to hand to any caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub total_projects: u64,
    pub projects: Vec<String>,
    pub settings: UserSettings,
    pub created_at: Timestamp,
    pub last_login: Timestamp,
}

impl From<UserRecord> for PublicUser {
    fn from(u: UserRecord) -> Self {
        Self {
            uid: u.uid,
            email: u.email,
            display_name: u.display_name,
            role: u.role,
            total_projects: u.total_projects,
            projects: u.projects,
            settings: u.settings,
            created_at: u.created_at,
            last_login: u.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUser>,
    pub count: usize,
}

/// Full stored record after a profile update, extra fields included.
#[derive(Debug, Serialize)]
pub struct UpdatedUserResponse {
    pub message: &'static str,
    pub user: Map<String, Value>,
}
