// ============================================================================
// Record Store
// ============================================================================
//
// Generic keyed-document persistence used by every domain entity. Documents
// are JSON objects living in named collections; queries are conjunctions of
// equality and array-membership filters.
//
// Implementations:
// - postgres::PgStore - JSONB documents on Postgres (production)
// - memory::MemStore  - in-process store with identical semantics (tests)
//
// ============================================================================

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no such record: {collection}/{id}")]
    Missing { collection: String, id: String },

    #[error("unique guard violated in collection {0}")]
    Conflict(String),

    #[error("document is not a JSON object")]
    NotAnObject,
}

/// A single query predicate. Filters in a query are ANDed together.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Top-level field equals the given JSON value.
    Eq(&'static str, Value),
    /// Top-level array field contains the given JSON value.
    Contains(&'static str, Value),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq(field, value.into())
    }

    pub fn contains(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::Contains(field, value.into())
    }
}

/// A stored document. The body always carries its `id` field, so decoding
/// into an entity type with an `id` member needs no extra bookkeeping.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

impl Document {
    pub fn from_body(body: Value) -> Result<Self, StoreError> {
        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or(StoreError::NotAnObject)?
            .to_string();
        Ok(Self { id, body })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

/// Collection-scoped keyed-document persistence with equality and
/// array-membership filtering.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents matching every filter. No ordering guarantee.
    async fn query(&self, collection: &str, filters: &[Filter])
        -> Result<Vec<Document>, StoreError>;

    /// Inserts a new document, assigning it a fresh id.
    async fn add(&self, collection: &str, body: Value) -> Result<Document, StoreError>;

    /// Atomic compare-and-create: inserts only if no existing document
    /// matches `guard`, otherwise fails with `Conflict`. Concurrent callers
    /// racing on the same guard see exactly one winner.
    async fn add_if_absent(
        &self,
        collection: &str,
        guard: &[Filter],
        body: Value,
    ) -> Result<Document, StoreError>;

    /// Shallow-merges `patch` into the document's top-level fields.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}
