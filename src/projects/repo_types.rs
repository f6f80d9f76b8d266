use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
    Completed,
}

/// Project record stored under `projects/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub collaborators: Vec<Value>,
    #[serde(default)]
    pub tasks: Vec<Value>,
}

impl ProjectRecord {
    pub fn new(
        user_id: String,
        name: String,
        kind: String,
        description: String,
        now: Timestamp,
    ) -> Self {
        Self {
            id: format!("project_{}", now.unix_millis()),
            user_id,
            name,
            kind,
            description,
            created_at: now,
            updated_at: now,
            status: ProjectStatus::Active,
            collaborators: Vec::new(),
            tasks: Vec::new(),
        }
    }
}
