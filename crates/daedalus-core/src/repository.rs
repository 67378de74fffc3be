//! Repository contracts and the in-memory reference implementation.
//!
//! Entities are JSON documents keyed by a configurable id field.
//! Adapters over real stores implement [`Repository`] (and
//! [`OneToManyRepository`] for nested collections); the in-memory
//! implementation backs tests and the CRUD controller template.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{DaedalusError, DaedalusResult};

/// Sort direction for a find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Shaping options for a find.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Equality filter: every key must match the document.
    pub filter: Option<Value>,
    /// Fields to keep in each returned document; empty keeps all.
    pub select: Vec<String>,
    /// Sort keys applied in order.
    pub order: Vec<(String, SortOrder)>,
}

/// Persistence contract over one entity collection.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetches a document by id.
    async fn get(&self, id: &Value) -> DaedalusResult<Option<Value>>;

    /// Lists documents with paging and shaping.
    async fn find(&self, offset: usize, limit: usize, options: FindOptions)
        -> DaedalusResult<Vec<Value>>;

    /// Counts documents matching the filter.
    async fn count(&self, filter: Option<Value>) -> DaedalusResult<usize>;

    /// Inserts the document when it has no id (or an unknown one) and
    /// updates it otherwise. Returns the stored document.
    async fn save(&self, document: Value) -> DaedalusResult<Value>;

    /// Deletes a document by id. Returns true when one was removed.
    async fn delete(&self, id: &Value) -> DaedalusResult<bool>;
}

/// Persistence contract over a child collection nested under a parent
/// entity.
#[async_trait]
pub trait OneToManyRepository: Send + Sync {
    /// Fetches one child of the parent.
    async fn get_child(&self, parent: &Value, id: &Value) -> DaedalusResult<Option<Value>>;

    /// Lists children of the parent.
    async fn find_children(
        &self,
        parent: &Value,
        offset: usize,
        limit: usize,
        options: FindOptions,
    ) -> DaedalusResult<Vec<Value>>;

    /// Inserts or updates a child of the parent.
    async fn save_child(&self, parent: &Value, document: Value) -> DaedalusResult<Value>;

    /// Deletes a child of the parent. Returns true when one was
    /// removed.
    async fn delete_child(&self, parent: &Value, id: &Value) -> DaedalusResult<bool>;
}

fn matches_filter(document: &Value, filter: Option<&Value>) -> bool {
    match filter {
        Some(Value::Object(pairs)) => pairs
            .iter()
            .all(|(key, expected)| document.get(key) == Some(expected)),
        _ => true,
    }
}

fn project(mut document: Value, select: &[String]) -> Value {
    if select.is_empty() {
        return document;
    }
    if let Value::Object(fields) = &mut document {
        fields.retain(|key, _| select.iter().any(|s| s == key));
    }
    document
}

fn compare(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// In-memory repository over JSON documents with numeric
/// auto-increment ids.
pub struct InMemoryRepository {
    id_field: String,
    state: RwLock<MemoryState>,
}

struct MemoryState {
    documents: Vec<Value>,
    next_id: u64,
}

impl InMemoryRepository {
    /// Creates an empty repository keyed by `id`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_field("id")
    }

    /// Creates an empty repository keyed by the given field.
    #[must_use]
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            state: RwLock::new(MemoryState {
                documents: Vec::new(),
                next_id: 1,
            }),
        }
    }

    fn position(&self, documents: &[Value], id: &Value) -> Option<usize> {
        documents
            .iter()
            .position(|d| d.get(&self.id_field) == Some(id))
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get(&self, id: &Value) -> DaedalusResult<Option<Value>> {
        let state = self.state.read();
        Ok(self
            .position(&state.documents, id)
            .map(|i| state.documents[i].clone()))
    }

    async fn find(
        &self,
        offset: usize,
        limit: usize,
        options: FindOptions,
    ) -> DaedalusResult<Vec<Value>> {
        let state = self.state.read();
        let mut matched: Vec<Value> = state
            .documents
            .iter()
            .filter(|d| matches_filter(d, options.filter.as_ref()))
            .cloned()
            .collect();
        for (key, order) in options.order.iter().rev() {
            matched.sort_by(|a, b| {
                let ordering = compare(
                    a.get(key).unwrap_or(&Value::Null),
                    b.get(key).unwrap_or(&Value::Null),
                );
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|d| project(d, &options.select))
            .collect())
    }

    async fn count(&self, filter: Option<Value>) -> DaedalusResult<usize> {
        let state = self.state.read();
        Ok(state
            .documents
            .iter()
            .filter(|d| matches_filter(d, filter.as_ref()))
            .count())
    }

    async fn save(&self, mut document: Value) -> DaedalusResult<Value> {
        if !document.is_object() {
            return Err(DaedalusError::configuration(
                "in-memory repository stores object documents only",
            ));
        }
        let mut state = self.state.write();
        let existing = document
            .get(&self.id_field)
            .filter(|id| !id.is_null())
            .cloned()
            .and_then(|id| self.position(&state.documents, &id));
        match existing {
            Some(index) => {
                state.documents[index] = document.clone();
            }
            None => {
                if document
                    .get(&self.id_field)
                    .map_or(true, serde_json::Value::is_null)
                {
                    let id = state.next_id;
                    state.next_id += 1;
                    document[self.id_field.as_str()] = Value::from(id);
                }
                state.documents.push(document.clone());
            }
        }
        Ok(document)
    }

    async fn delete(&self, id: &Value) -> DaedalusResult<bool> {
        let mut state = self.state.write();
        match self.position(&state.documents, id) {
            Some(index) => {
                state.documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
