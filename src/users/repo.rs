use serde_json::Value;
use tracing::warn;

use super::repo_types::UserRecord;
use crate::store::{
    from_document, to_document, Document, DocumentStore, Patch, StoreError, USERS,
};
use crate::timestamp::Timestamp;

impl UserRecord {
    /// Find a user by id.
    pub async fn find(store: &dyn DocumentStore, uid: &str) -> Result<Option<Self>, StoreError> {
        store
            .get(USERS, uid)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Write the full record, replacing anything stored under the same id.
    pub async fn save(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        store.set(USERS, &self.uid, to_document(self)?).await
    }

    /// Every readable user; a document that no longer parses is logged and skipped.
    pub async fn list(store: &dyn DocumentStore) -> Result<Vec<Self>, StoreError> {
        let users = store
            .list(USERS)
            .await?
            .into_iter()
            .filter_map(|doc| {
                let uid = doc.get("uid").cloned();
                match from_document::<Self>(doc) {
                    Ok(user) => Some(user),
                    Err(e) => {
                        warn!(error = %e, ?uid, "skipping unreadable user");
                        None
                    }
                }
            })
            .collect();
        Ok(users)
    }

    pub async fn touch_last_login(
        store: &dyn DocumentStore,
        uid: &str,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        store
            .update(USERS, uid, Patch::new().set("lastLogin", at.to_string()))
            .await
    }
}

/// Apply a profile patch to a stored user and return the record as stored.
pub async fn merge_fields(
    store: &dyn DocumentStore,
    uid: &str,
    patch: Patch,
) -> Result<Document, StoreError> {
    store.update(USERS, uid, patch).await?;
    store
        .get(USERS, uid)
        .await?
        .ok_or_else(|| StoreError::MissingDocument {
            collection: USERS.to_string(),
            id: uid.to_string(),
        })
}

/// Patch adding one owned project to a user.
pub fn project_added(project_id: &str) -> Patch {
    Patch::new()
        .increment("totalProjects", 1)
        .array_union("projects", vec![Value::from(project_id)])
}
