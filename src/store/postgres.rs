use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::Config;

use super::{Document, Filter, RecordStore, StoreError};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(config: &Config) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db.max_connections)
        .acquire_timeout(Duration::from_secs(config.db.acquire_timeout_secs))
        .connect(&config.database_url)
        .await
}

/// Creates the records table and its GIN index. Idempotent.
pub async fn init_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            doc JSONB NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_records_doc
        ON records USING GIN (doc jsonb_path_ops)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Record store on Postgres. Every document is one JSONB row; filters
/// compile to containment operators so the GIN index answers compound
/// queries instead of the application scanning collections.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for filter in filters {
        match filter {
            // {"field": value} <@ doc - strict scalar equality; containment
            // does not promote nested scalars into arrays.
            Filter::Eq(field, value) => {
                let mut probe = serde_json::Map::new();
                probe.insert((*field).to_string(), value.clone());
                qb.push(" AND doc @> ");
                qb.push_bind(Value::Object(probe));
            }
            // doc->field is an array containing value.
            Filter::Contains(field, value) => {
                qb.push(" AND doc -> ");
                qb.push_bind(*field);
                qb.push(" @> ");
                qb.push_bind(Value::Array(vec![value.clone()]));
            }
        }
    }
}

/// Stable advisory-lock key for a compare-and-create guard.
fn guard_lock_key(collection: &str, guard: &[Filter]) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(collection.as_bytes());
    hasher.update(format!("{:?}", guard).as_bytes());
    let hash = hasher.finalize();
    i64::from_be_bytes(hash[..8].try_into().expect("sha256 yields at least 8 bytes"))
}

fn with_id(body: Value) -> Result<(String, Value), StoreError> {
    let mut body = body;
    let obj = body.as_object_mut().ok_or(StoreError::NotAnObject)?;
    let id = Uuid::new_v4().to_string();
    obj.insert("id".to_string(), Value::String(id.clone()));
    Ok((id, body))
}

#[async_trait]
impl RecordStore for PgStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let body: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM records WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(body.map(|body| Document {
            id: id.to_string(),
            body,
        }))
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<Vec<Document>, StoreError> {
        let mut qb = QueryBuilder::new("SELECT doc FROM records WHERE collection = ");
        qb.push_bind(collection);
        push_filters(&mut qb, filters);

        let bodies: Vec<Value> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        bodies.into_iter().map(Document::from_body).collect()
    }

    async fn add(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let (id, body) = with_id(body)?;

        sqlx::query("INSERT INTO records (collection, id, doc) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(&body)
            .execute(&self.pool)
            .await?;

        Ok(Document { id, body })
    }

    async fn add_if_absent(
        &self,
        collection: &str,
        guard: &[Filter],
        body: Value,
    ) -> Result<Document, StoreError> {
        let (id, body) = with_id(body)?;

        let mut tx = self.pool.begin().await?;

        // Serialize racing creators of the same guard on an advisory lock,
        // then check-and-insert inside the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(guard_lock_key(collection, guard))
            .execute(&mut *tx)
            .await?;

        let mut qb = QueryBuilder::new("SELECT 1 FROM records WHERE collection = ");
        qb.push_bind(collection);
        push_filters(&mut qb, guard);
        qb.push(" LIMIT 1");

        let taken: Option<i32> = qb.build_query_scalar().fetch_optional(&mut *tx).await?;
        if taken.is_some() {
            return Err(StoreError::Conflict(collection.to_string()));
        }

        sqlx::query("INSERT INTO records (collection, id, doc) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(&body)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Document { id, body })
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        if !patch.is_object() {
            return Err(StoreError::NotAnObject);
        }

        let result =
            sqlx::query("UPDATE records SET doc = doc || $3 WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .bind(&patch)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM records WHERE collection = ");
        qb.push_bind(collection);
        push_filters(&mut qb, filters);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
