//! In-memory document store.
//!
//! Suitable for development and tests: state lives in the process and is
//! lost on exit. Locks are held only for synchronous sections, never
//! across an `.await`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;

use super::{
    expand_documents, project, sort_documents, stamp_id, Collection, Document, EntityStore,
    Filter, FindOptions, UniqueInsert,
};
use crate::{
    error::{AppError, AppResult},
    models::EntityId,
};

type Documents = IndexMap<EntityId, Document>;

/// Insertion-ordered collections behind a single lock
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Documents>>,
}

fn poison_err<T>(_: PoisonError<T>) -> AppError {
    AppError::Store("lock poisoned".to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: Collection) -> AppResult<usize> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections.get(&collection).map(IndexMap::len).unwrap_or(0))
    }

    /// Load a fixture document, keeping its `id` when it carries one
    pub fn seed(&self, collection: Collection, mut doc: Document) -> AppResult<Document> {
        let id = super::document_id(&doc).unwrap_or_else(EntityId::generate);
        stamp_id(&mut doc, &id)?;

        let mut collections = self.collections.write().map_err(poison_err)?;
        collections.entry(collection).or_default().insert(id, doc.clone());
        Ok(doc)
    }

    fn matching(&self, collection: Collection, filter: &Filter) -> AppResult<Vec<Document>> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn find_by_id(&self, collection: Collection, id: &EntityId) -> AppResult<Option<Document>> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>> {
        let mut docs = self.matching(collection, filter)?;
        if let Some(sort) = &options.sort {
            sort_documents(&mut docs, sort);
        }
        if let Some(fields) = &options.projection {
            docs = docs.into_iter().map(|doc| project(doc, fields)).collect();
        }
        expand_documents(self, docs, &options.expand).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64> {
        let collections = self.collections.read().map_err(poison_err)?;
        let count = collections
            .get(&collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn insert(&self, collection: Collection, mut doc: Document) -> AppResult<Document> {
        let id = EntityId::generate();
        stamp_id(&mut doc, &id)?;

        let mut collections = self.collections.write().map_err(poison_err)?;
        collections.entry(collection).or_default().insert(id, doc.clone());
        Ok(doc)
    }

    async fn insert_unique(
        &self,
        collection: Collection,
        field: &str,
        mut doc: Document,
    ) -> AppResult<UniqueInsert> {
        let key = doc.get(field).cloned();

        let mut collections = self.collections.write().map_err(poison_err)?;
        let docs = collections.entry(collection).or_default();

        if let Some(key) = key {
            if let Some(existing) = docs.values().find(|d| d.get(field) == Some(&key)) {
                return Ok(UniqueInsert::Existing(existing.clone()));
            }
        }

        let id = EntityId::generate();
        stamp_id(&mut doc, &id)?;
        docs.insert(id, doc.clone());
        Ok(UniqueInsert::Inserted(doc))
    }

    async fn replace_by_id(
        &self,
        collection: Collection,
        id: &EntityId,
        mut doc: Document,
    ) -> AppResult<Option<Document>> {
        stamp_id(&mut doc, id)?;

        let mut collections = self.collections.write().map_err(poison_err)?;
        let Some(slot) = collections.get_mut(&collection).and_then(|docs| docs.get_mut(id)) else {
            return Ok(None);
        };
        *slot = doc.clone();
        Ok(Some(doc))
    }

    async fn delete_by_id(&self, collection: Collection, id: &EntityId) -> AppResult<bool> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        Ok(collections
            .get_mut(&collection)
            .map(|docs| docs.shift_remove(id).is_some())
            .unwrap_or(false))
    }
}
