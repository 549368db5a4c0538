//! The generic resource service.
//!
//! One `ResourceService<E>` serves every record kind; behavior differences live in
//! each kind's `Schema`. The two product-specific queries (people by category,
//! featured projects) are inherent methods on the concrete instantiations.

use chrono::Utc;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Person, Project};
use crate::schema::{CREATED_AT_FIELD, Entity, FieldKind, ID_FIELD, SortKey, UPDATED_AT_FIELD};
use crate::store::{DocumentQuery, Filter, StoreState};

/// Featured projects shown on the landing page, at most.
pub const FEATURED_PROJECT_LIMIT: usize = 6;

const FEATURED_SORT: &[SortKey] = &[SortKey::asc("order", FieldKind::Integer)];

/// ResourceService
///
/// Create/read/update/delete over one collection. Holds no state besides the
/// store handle, so constructing one per request is free.
pub struct ResourceService<E: Entity> {
    store: StoreState,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for ResourceService<E> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<E: Entity> ResourceService<E> {
    pub fn new(store: StoreState) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn collection(&self) -> &'static str {
        E::SCHEMA.collection
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", E::SCHEMA.label))
    }

    /// Identifiers that are not UUIDs cannot exist, so they resolve to NotFound.
    fn parse_id(&self, id: &str) -> Result<Uuid, AppError> {
        Uuid::parse_str(id.trim()).map_err(|_| self.not_found())
    }

    async fn query(&self, query: DocumentQuery) -> Result<Vec<E>, AppError> {
        let documents = self.store.find(self.collection(), &query).await?;
        documents
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(AppError::from))
            .collect()
    }

    /// list
    ///
    /// Returns every record matching `filter`, in the kind's fixed sort order.
    /// An empty result is not an error.
    pub async fn list(&self, filter: Filter) -> Result<Vec<E>, AppError> {
        self.query(DocumentQuery {
            filter,
            sort: E::SCHEMA.sort,
            limit: None,
        })
        .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<E, AppError> {
        self.get_scoped(id, &Filter::new()).await
    }

    /// Like `get_by_id`, but a record outside `scope` is reported as missing.
    pub async fn get_scoped(&self, id: &str, scope: &Filter) -> Result<E, AppError> {
        let id = self.parse_id(id)?;
        let document = self
            .store
            .find_by_id(self.collection(), id)
            .await?
            .filter(|doc| scope.matches(doc))
            .ok_or_else(|| self.not_found())?;
        Ok(serde_json::from_value(document)?)
    }

    /// Normalizes an incoming payload: unknown keys dropped, values coerced to
    /// their field kinds, per-kind derivations applied.
    fn prepare_payload(&self, payload: &mut Map<String, Value>) -> Result<(), AppError> {
        E::SCHEMA.retain_known(payload);
        E::SCHEMA.coerce(payload)?;
        E::prepare(payload);
        Ok(())
    }

    /// create
    ///
    /// Fills defaults for unset fields, assigns the id and timestamps, checks the
    /// full schema and persists the record.
    pub async fn create(&self, mut payload: Map<String, Value>) -> Result<E, AppError> {
        self.prepare_payload(&mut payload)?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut document = E::SCHEMA.defaults(now);
        document.extend(payload);
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        document.insert(CREATED_AT_FIELD.to_string(), serde_json::to_value(now)?);
        document.insert(UPDATED_AT_FIELD.to_string(), serde_json::to_value(now)?);

        let record: E = E::SCHEMA.materialize(document)?;
        self.store
            .insert(self.collection(), id, serde_json::to_value(&record)?)
            .await?;

        tracing::info!(collection = self.collection(), %id, "record created");
        Ok(record)
    }

    /// update
    ///
    /// Replaces only the supplied fields, then re-checks the whole merged
    /// document. A record that was already invalid therefore fails any update
    /// until the offending field is fixed. Unknown ids fail without writing.
    pub async fn update(&self, id: &str, mut payload: Map<String, Value>) -> Result<E, AppError> {
        let id = self.parse_id(id)?;
        self.prepare_payload(&mut payload)?;

        let existing = self
            .store
            .find_by_id(self.collection(), id)
            .await?
            .ok_or_else(|| self.not_found())?;

        let mut document = match existing {
            Value::Object(map) => map,
            _ => return Err(AppError::Internal(format!("malformed document {}", id))),
        };
        document.extend(payload);
        document.insert(UPDATED_AT_FIELD.to_string(), serde_json::to_value(Utc::now())?);

        let record: E = E::SCHEMA.materialize(document)?;

        // The record may have been deleted since it was read.
        if !self
            .store
            .replace(self.collection(), id, serde_json::to_value(&record)?)
            .await?
        {
            return Err(self.not_found());
        }

        tracing::info!(collection = self.collection(), %id, "record updated");
        Ok(record)
    }

    /// delete
    ///
    /// Removes the record and returns it. Uploaded files it references stay on disk.
    pub async fn delete(&self, id: &str) -> Result<E, AppError> {
        let id = self.parse_id(id)?;
        let document = self
            .store
            .delete(self.collection(), id)
            .await?
            .ok_or_else(|| self.not_found())?;

        tracing::info!(collection = self.collection(), %id, "record deleted");
        Ok(serde_json::from_value(document)?)
    }
}

impl ResourceService<Person> {
    /// Active people in one category, in the standard people order. The
    /// `isActive` condition is fixed and cannot be lifted by the caller.
    pub async fn get_by_category(&self, category: &str) -> Result<Vec<Person>, AppError> {
        let filter = Filter::new()
            .eq("category", category.trim().to_uppercase())
            .eq("isActive", true);
        self.list(filter).await
    }
}

impl ResourceService<Project> {
    /// Featured, completed projects ordered by display order, capped at
    /// `FEATURED_PROJECT_LIMIT`.
    pub async fn get_featured(&self) -> Result<Vec<Project>, AppError> {
        self.query(DocumentQuery {
            filter: Filter::new()
                .eq("isFeatured", true)
                .eq("status", "COMPLETED"),
            sort: FEATURED_SORT,
            limit: Some(FEATURED_PROJECT_LIMIT),
        })
        .await
    }
}
