use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Document, Filter, RecordStore, StoreError};

/// In-process record store with the same filter semantics as `PgStore`.
/// Backs the test suite; also usable as a zero-dependency dev mode.
#[derive(Default)]
pub struct MemStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(body: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(field, expected) => body.get(*field) == Some(expected),
        Filter::Contains(field, expected) => body
            .get(*field)
            .and_then(|v| v.as_array())
            .map(|items| items.contains(expected))
            .unwrap_or(false),
    }
}

fn matches_all(body: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches(body, f))
}

fn new_doc(body: Value) -> Result<(String, Value), StoreError> {
    let mut body = body;
    let obj = body.as_object_mut().ok_or(StoreError::NotAnObject)?;
    let id = Uuid::new_v4().to_string();
    obj.insert("id".to_string(), Value::String(id.clone()));
    Ok((id, body))
}

#[async_trait]
impl RecordStore for MemStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|body| Document {
                id: id.to_string(),
                body: body.clone(),
            }))
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, body)| matches_all(body, filters))
            .map(|(id, body)| Document {
                id: id.clone(),
                body: body.clone(),
            })
            .collect())
    }

    async fn add(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let (id, body) = new_doc(body)?;

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), body.clone());

        Ok(Document { id, body })
    }

    async fn add_if_absent(
        &self,
        collection: &str,
        guard: &[Filter],
        body: Value,
    ) -> Result<Document, StoreError> {
        let (id, body) = new_doc(body)?;

        // Check and insert under one write lock; that is the atomicity.
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.values().any(|existing| matches_all(existing, guard)) {
            return Err(StoreError::Conflict(collection.to_string()));
        }

        docs.insert(id.clone(), body.clone());
        Ok(Document { id, body })
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let patch_obj = match patch {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject),
        };

        let mut collections = self.collections.write().await;
        let body = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        let obj = body.as_object_mut().ok_or(StoreError::NotAnObject)?;
        for (key, value) in patch_obj {
            obj.insert(key, value);
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        Ok(self.query(collection, filters).await?.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
