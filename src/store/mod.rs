//! Document store consumed by the handler layer.
//!
//! Records live in named collections as JSON objects keyed by id. Adapters:
//! PostgreSQL (JSONB table), in-memory, and a null store used when no backend
//! could be reached.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::{Map, Value};

mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

pub const USERS: &str = "users";
pub const PROJECTS: &str = "projects";
pub const CREDENTIALS: &str = "credentials";

pub type Document = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable")]
    Unavailable,
    #[error("no document to update: {collection}/{id}")]
    MissingDocument { collection: String, id: String },
    #[error("document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A single field operation inside a [`Patch`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    /// Adds to a numeric field; a missing or non-numeric field counts as 0.
    Increment(i64),
    /// Appends each value not already present; a missing or non-array field counts as empty.
    ArrayUnion(Vec<Value>),
    /// Sets keys inside an object field, keeping the others; a missing or non-object field counts as empty.
    Merge(Document),
}

/// Ordered list of top-level field operations applied by `update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    ops: Vec<(String, FieldUpdate)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push((field.into(), FieldUpdate::Set(value.into())));
        self
    }

    pub fn increment(mut self, field: impl Into<String>, by: i64) -> Self {
        self.ops.push((field.into(), FieldUpdate::Increment(by)));
        self
    }

    pub fn array_union(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.ops.push((field.into(), FieldUpdate::ArrayUnion(values)));
        self
    }

    pub fn merge(mut self, field: impl Into<String>, fields: Document) -> Self {
        self.ops.push((field.into(), FieldUpdate::Merge(fields)));
        self
    }

    pub fn apply(&self, doc: &mut Document) {
        for (field, op) in &self.ops {
            match op {
                FieldUpdate::Set(value) => {
                    doc.insert(field.clone(), value.clone());
                }
                FieldUpdate::Increment(by) => {
                    let next = match doc.get(field) {
                        Some(Value::Number(n)) => match n.as_i64() {
                            Some(current) => Value::from(current.saturating_add(*by)),
                            None => Value::from(n.as_f64().unwrap_or(0.0) + *by as f64),
                        },
                        _ => Value::from(*by),
                    };
                    doc.insert(field.clone(), next);
                }
                FieldUpdate::ArrayUnion(values) => {
                    let mut items = match doc.remove(field) {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    };
                    for value in values {
                        if !items.contains(value) {
                            items.push(value.clone());
                        }
                    }
                    doc.insert(field.clone(), Value::Array(items));
                }
                FieldUpdate::Merge(fields) => {
                    let mut inner = match doc.remove(field) {
                        Some(Value::Object(inner)) => inner,
                        _ => Document::new(),
                    };
                    for (key, value) in fields {
                        inner.insert(key.clone(), value.clone());
                    }
                    doc.insert(field.clone(), Value::Object(inner));
                }
            }
        }
    }
}

impl From<Document> for Patch {
    /// Every key of the map becomes a `Set`: a partial merge of top-level fields.
    fn from(fields: Document) -> Self {
        fields
            .into_iter()
            .fold(Patch::new(), |patch, (field, value)| patch.set(field, value))
    }
}

/// One write of an atomic [`DocumentStore::commit`] batch.
#[derive(Debug, Clone)]
pub enum Write {
    /// Fails with `AlreadyExists` if the id is taken.
    Create {
        collection: String,
        id: String,
        data: Document,
    },
    /// Upsert, replacing the whole document.
    Set {
        collection: String,
        id: String,
        data: Document,
    },
    /// Fails with `MissingDocument` if there is nothing to update.
    Update {
        collection: String,
        id: String,
        patch: Patch,
    },
}

impl Write {
    pub fn create(collection: &str, id: &str, data: Document) -> Self {
        Write::Create {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        }
    }

    pub fn set(collection: &str, id: &str, data: Document) -> Self {
        Write::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        }
    }

    pub fn update(collection: &str, id: &str, patch: Patch) -> Self {
        Write::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        }
    }
}

/// Equality filter on one top-level field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        doc.get(&self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = compare_values(a.get(&self.field), b.get(&self.field));
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

// Missing < null < bool < number < string < array < object.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_)) => 5,
            Some(Value::Object(_)) => 6,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Every document of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Applies all writes or none of them.
    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        self.commit(vec![Write::set(collection, id, data)]).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Patch) -> Result<(), StoreError> {
        self.commit(vec![Write::update(collection, id, patch)]).await
    }
}

/// Stand-in when no backend is reachable; every call fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore;

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn query(
        &self,
        _collection: &str,
        _filter: &Filter,
        _order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn list(&self, _collection: &str) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn commit(&self, _writes: Vec<Write>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }
}

/// Serialises a record into a store document.
pub fn to_document<T: serde::Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        )))),
    }
}

pub fn from_document<T: serde::de::DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
