use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{PgPool, query_builder::QueryBuilder, types::Json};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::schema::{Direction, FieldKind, SortKey, parse_timestamp};

/// StoreError
///
/// Failures raised by a document store backend. The API layer maps these to
/// `DuplicateResource` or a generic internal error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Filter
///
/// Equality conditions on top-level document fields. A key is present only if the
/// caller actually supplied it; an absent key places no constraint at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Adds the condition only when a value was supplied.
    pub fn eq_some<T: Into<Value>>(self, field: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    /// Layers `floor` over this filter; on conflicting keys the floor wins.
    pub fn overlay(mut self, floor: Filter) -> Self {
        self.0.extend(floor.0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

/// DocumentQuery
///
/// A filtered, ordered and optionally capped read over one collection.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub filter: Filter,
    pub sort: &'static [SortKey],
    pub limit: Option<usize>,
}

/// DocumentStore Trait
///
/// The persistence contract the resource services are written against. Documents
/// are JSON objects grouped by collection and addressed by a generated UUID.
/// Per-document writes are atomic; nothing stronger is promised.
///
/// **Send + Sync + async_trait** let the store be shared as `Arc<dyn DocumentStore>`
/// across Axum's task boundaries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Value>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError>;

    async fn insert(&self, collection: &str, id: Uuid, document: Value) -> Result<(), StoreError>;

    /// Replaces an existing document. Returns false (and writes nothing) when the
    /// id is unknown; never upserts.
    async fn replace(&self, collection: &str, id: Uuid, document: Value) -> Result<bool, StoreError>;

    /// Removes a document, returning it if it existed.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError>;
}

/// StoreState
///
/// The concrete type used to share the document store across the application state.
pub type StoreState = Arc<dyn DocumentStore>;

/// PostgresDocumentStore
///
/// Keeps every collection in a single `documents` table with a JSONB body.
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the backing table and its containment index if missing. Safe to
    /// call on every startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id UUID NOT NULL,
                body JSONB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS documents_body_idx ON documents USING GIN (body)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Sort expression for one key. Field names come from static schemas, never
/// from request input.
fn order_expression(key: &SortKey) -> String {
    let expr = match key.kind {
        FieldKind::Timestamp => format!("(body->>'{}')::timestamptz", key.field),
        _ => format!("body->'{}'", key.field),
    };
    // Missing values sort lowest in both directions.
    match key.direction {
        Direction::Asc => format!("{} ASC NULLS FIRST", expr),
        Direction::Desc => format!("{} DESC NULLS LAST", expr),
    }
}

fn map_write_error(err: sqlx::Error, id: Uuid) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(id.to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    /// find
    ///
    /// Equality filters become a single JSONB containment test (`body @> $filter`),
    /// which the GIN index serves directly.
    async fn find(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT body FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());

        if !query.filter.is_empty() {
            builder.push(" AND body @> ");
            builder.push_bind(Json(query.filter.as_map().clone()));
        }

        if !query.sort.is_empty() {
            let order = query
                .sort
                .iter()
                .map(order_expression)
                .collect::<Vec<_>>()
                .join(", ");
            builder.push(" ORDER BY ");
            builder.push(order);
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("find error on {}: {:?}", collection, e);
                StoreError::Database(e)
            })?;

        Ok(rows.into_iter().map(|Json(body)| body).collect())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(body)| body))
    }

    async fn insert(&self, collection: &str, id: Uuid, document: Value) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id)
            .bind(Json(document))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, id))?;

        Ok(())
    }

    async fn replace(&self, collection: &str, id: Uuid, document: Value) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .bind(Json(document))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, id))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Value>>(
            "DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(body)| body))
    }
}

/// InMemoryDocumentStore
///
/// A process-local store used when no database is configured in local mode, and
/// by the test suite. Collections keep insertion order so ties in the sort keys
/// resolve the same way on every read.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<(Uuid, Value)>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn kind_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Bool(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value.as_str().and_then(parse_timestamp)
}

/// Total order over field values: missing lowest, then by JSON type, then by value.
fn compare_field(a: Option<&Value>, b: Option<&Value>, kind: FieldKind) -> Ordering {
    if kind == FieldKind::Timestamp {
        if let (Some(x), Some(y)) = (a.and_then(as_timestamp), b.and_then(as_timestamp)) {
            return x.cmp(&y);
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn compare_documents(a: &Value, b: &Value, sort: &[SortKey]) -> Ordering {
    sort.iter()
        .map(|key| {
            let ordering = compare_field(a.get(key.field), b.get(key.field), key.kind);
            match key.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(&self, collection: &str, query: &DocumentQuery) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        let mut documents: Vec<Value> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| query.filter.matches(doc))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default();

        documents.sort_by(|a, b| compare_documents(a, b, query.sort));
        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }
        Ok(documents)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| *doc_id == id))
            .map(|(_, doc)| doc.clone()))
    }

    async fn insert(&self, collection: &str, id: Uuid, document: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|(doc_id, _)| *doc_id == id) {
            return Err(StoreError::Duplicate(id.to_string()));
        }
        docs.push((id, document));
        Ok(())
    }

    async fn replace(&self, collection: &str, id: Uuid, document: Value) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let slot = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id));
        match slot {
            Some((_, existing)) => {
                *existing = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .position(|(doc_id, _)| *doc_id == id)
            .map(|index| docs.remove(index).1))
    }
}
