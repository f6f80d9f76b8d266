use serde_json::Value;
use tracing::{error, info, instrument};

use super::{
    dto::{PublicUser, UpdatedUserResponse, UserListResponse, UserResponse},
    repo::merge_fields,
    repo_types::UserRecord,
};
use crate::{
    error::ApiError,
    state::AppState,
    store::{Document, Patch},
    timestamp::Timestamp,
};

/// Keys a profile update may never overwrite.
pub const PROTECTED_FIELDS: [&str; 4] = ["id", "uid", "email", "createdAt"];

pub fn strip_protected(mut fields: Document) -> Document {
    for key in PROTECTED_FIELDS {
        fields.remove(key);
    }
    fields
}

fn invalid(field: &str) -> ApiError {
    ApiError::BadRequest(format!("Invalid value for field: {field}"))
}

/// Checks the fields a user record reads back against their stored types.
///
/// `settings` is merged key by key; `updatedAt` is always stamped by the
/// server; unknown keys are stored as sent.
pub fn profile_patch(fields: Document, now: Timestamp) -> Result<Patch, ApiError> {
    let mut plain = Document::new();
    let mut settings = None;

    for (key, value) in strip_protected(fields) {
        match key.as_str() {
            "updatedAt" => continue,
            "displayName" | "role" if !value.is_string() => return Err(invalid(&key)),
            "totalProjects" if value.as_u64().is_none() => return Err(invalid(&key)),
            "projects" => {
                let ok = value
                    .as_array()
                    .is_some_and(|ids| ids.iter().all(Value::is_string));
                if !ok {
                    return Err(invalid(&key));
                }
            }
            "lastLogin" => {
                let at = value
                    .as_str()
                    .and_then(|s| Timestamp::parse(s).ok())
                    .ok_or_else(|| invalid(&key))?;
                plain.insert("lastLogin".into(), at.to_string().into());
                continue;
            }
            "settings" => {
                let Value::Object(inner) = value else {
                    return Err(invalid("settings"));
                };
                if inner.get("theme").is_some_and(|v| !v.is_string()) {
                    return Err(invalid("settings.theme"));
                }
                if inner.get("notifications").is_some_and(|v| !v.is_boolean()) {
                    return Err(invalid("settings.notifications"));
                }
                settings = Some(inner);
                continue;
            }
            _ => {}
        }
        plain.insert(key, value);
    }

    plain.insert("updatedAt".into(), now.to_string().into());
    let patch = Patch::from(plain);
    Ok(match settings {
        Some(inner) => patch.merge("settings", inner),
        None => patch,
    })
}

#[instrument(skip(state))]
pub async fn get_user(state: &AppState, user_id: &str) -> Result<UserResponse, ApiError> {
    let user = UserRecord::find(state.store.as_ref(), user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "load user failed");
            ApiError::internal(e)
        })?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(UserResponse { user: user.into() })
}

#[instrument(skip(state))]
pub async fn list_users(state: &AppState) -> Result<UserListResponse, ApiError> {
    let users: Vec<PublicUser> = UserRecord::list(state.store.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "list users failed");
            ApiError::internal(e)
        })?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(UserListResponse {
        count: users.len(),
        users,
    })
}

#[instrument(skip(state, fields))]
pub async fn update_user(
    state: &AppState,
    user_id: &str,
    fields: Document,
) -> Result<UpdatedUserResponse, ApiError> {
    let patch = profile_patch(fields, Timestamp::now())?;

    let user = merge_fields(state.store.as_ref(), user_id, patch)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "update user failed");
            ApiError::internal(e)
        })?;

    info!(%user_id, "user updated");
    Ok(UpdatedUserResponse {
        message: "User updated successfully",
        user,
    })
}
