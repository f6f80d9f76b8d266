use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    /// Any role name written by a profile update, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub theme: String,
    pub notifications: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".into(),
            notifications: true,
        }
    }
}

/// User record stored under `users/<uid>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub created_at: Timestamp,
    pub last_login: Timestamp,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub settings: UserSettings,
    /// Owned project ids, insertion ordered, no duplicates.
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl UserRecord {
    /// Fresh record as written on registration.
    pub fn new(uid: String, email: String, display_name: String, now: Timestamp) -> Self {
        Self {
            uid,
            email,
            display_name,
            created_at: now,
            last_login: now,
            role: Role::User,
            total_projects: 0,
            settings: UserSettings::default(),
            projects: Vec::new(),
            updated_at: None,
        }
    }
}
