use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Filter, OrderBy, StoreError, Write};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// Process-local store for `STORE_BACKEND=memory` and tests.
///
/// A batch applies in place under the write lock and is undone on the first failure.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

/// Prior state of one document touched by a batch: `None` means it did not exist.
type Undo = (String, String, Option<Document>);

fn apply(collections: &mut Collections, write: Write, undo: &mut Vec<Undo>) -> Result<(), StoreError> {
    match write {
        Write::Create {
            collection,
            id,
            data,
        } => {
            let docs = collections.entry(collection.clone()).or_default();
            if docs.contains_key(&id) {
                return Err(StoreError::AlreadyExists { collection, id });
            }
            docs.insert(id.clone(), data);
            undo.push((collection, id, None));
        }
        Write::Set {
            collection,
            id,
            data,
        } => {
            let previous = collections
                .entry(collection.clone())
                .or_default()
                .insert(id.clone(), data);
            undo.push((collection, id, previous));
        }
        Write::Update {
            collection,
            id,
            patch,
        } => {
            let Some(doc) = collections.get_mut(&collection).and_then(|docs| docs.get_mut(&id)) else {
                return Err(StoreError::MissingDocument { collection, id });
            };
            let previous = doc.clone();
            patch.apply(doc);
            undo.push((collection, id, Some(previous)));
        }
    }
    Ok(())
}

fn rollback(collections: &mut Collections, undo: Vec<Undo>) {
    for (collection, id, previous) in undo.into_iter().rev() {
        let docs = collections.entry(collection).or_default();
        match previous {
            Some(doc) => {
                docs.insert(id, doc);
            }
            None => {
                docs.remove(&id);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        let mut found: Vec<Document> = guard
            .get(collection)
            .map(|docs| docs.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        if let Some(order) = order {
            found.sort_by(|a, b| order.compare(a, b));
        }
        Ok(found)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let mut undo = Vec::with_capacity(writes.len());
        for write in writes {
            if let Err(e) = apply(&mut guard, write, &mut undo) {
                rollback(&mut guard, undo);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
