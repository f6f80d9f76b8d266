use super::repo_types::ProjectRecord;
use crate::store::{
    from_document, to_document, DocumentStore, Filter, OrderBy, StoreError, Write, PROJECTS, USERS,
};
use crate::users::repo::project_added;

impl ProjectRecord {
    /// Projects owned by `user_id`, newest first.
    pub async fn list_by_user(
        store: &dyn DocumentStore,
        user_id: &str,
    ) -> Result<Vec<Self>, StoreError> {
        store
            .query(
                PROJECTS,
                &Filter::eq("userId", user_id),
                Some(&OrderBy::desc("createdAt")),
            )
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Insert the project and bump the owner's `totalProjects`/`projects` in one batch.
    pub async fn insert_with_owner(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        store
            .commit(vec![
                Write::create(PROJECTS, &self.id, to_document(self)?),
                Write::update(USERS, &self.user_id, project_added(&self.id)),
            ])
            .await
    }
}
