//! Document store layer.
//!
//! The catalog treats its backing store as a set of JSON document
//! collections reached through [`EntityStore`]. Two backends are provided:
//! [`memory::InMemoryStore`] for development and tests, and
//! [`postgres::PgDocumentStore`] which keeps every collection in one JSONB
//! table. Only single-document atomicity is assumed; nothing here opens a
//! multi-document transaction.

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::EntityId,
};

/// A stored document: always a JSON object carrying an `id` field
pub type Document = Value;

/// Shared handle used by every request
pub type SharedStore = Arc<dyn EntityStore>;

/// The four catalog collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Authors,
    Genres,
    Books,
    BookInstances,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Authors => "authors",
            Collection::Genres => "genres",
            Collection::Books => "books",
            Collection::BookInstances => "bookinstances",
        }
    }

    /// Canonical catalog URL of a document in this collection
    pub fn url_for(&self, id: &EntityId) -> String {
        let segment = match self {
            Collection::Authors => "author",
            Collection::Genres => "genre",
            Collection::Books => "book",
            Collection::BookInstances => "bookinstance",
        };
        format!("/catalog/{}/{}", segment, id)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate on a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value
    Eq(String, Value),
    /// Field is an array holding the value
    Contains(String, Value),
    /// Field equals one of the values
    AnyOf(String, Vec<Value>),
}

/// Conjunction of conditions; the empty filter matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &EntityId) -> Self {
        Self::all().eq("id", id.as_str())
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Contains(field.to_string(), value.into()));
        self
    }

    pub fn any_of<I, V>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push(Condition::AnyOf(field.to_string(), values));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => doc.get(field) == Some(value),
            Condition::Contains(field, value) => doc
                .get(field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false),
            Condition::AnyOf(field, values) => doc
                .get(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// Replace the reference id(s) held in `field` by the referenced documents
#[derive(Debug, Clone, PartialEq)]
pub struct Expand {
    pub field: String,
    pub collection: Collection,
}

/// Shape of a `find` result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Fields to keep besides `id`; `None` keeps the whole document
    pub projection: Option<Vec<String>>,
    pub sort: Option<Sort>,
    pub expand: Vec<Expand>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some(Sort {
            field: field.to_string(),
            order,
        });
        self
    }

    pub fn expand(mut self, field: &str, collection: Collection) -> Self {
        self.expand.push(Expand {
            field: field.to_string(),
            collection,
        });
        self
    }
}

/// Outcome of an atomic find-or-insert on a unique field
#[derive(Debug, Clone, PartialEq)]
pub enum UniqueInsert {
    Inserted(Document),
    Existing(Document),
}

/// Query/command interface over the document collections.
///
/// `find_by_id` and `replace_by_id` report a missing id as `None`; every
/// method fails only on a store fault.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find_by_id(&self, collection: Collection, id: &EntityId) -> AppResult<Option<Document>>;

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> AppResult<Vec<Document>>;

    async fn count(&self, collection: Collection, filter: &Filter) -> AppResult<u64>;

    /// Insert a new document; the store assigns its `id`
    async fn insert(&self, collection: Collection, doc: Document) -> AppResult<Document>;

    /// Insert unless a document with the same `field` value exists, as one atomic step
    async fn insert_unique(
        &self,
        collection: Collection,
        field: &str,
        doc: Document,
    ) -> AppResult<UniqueInsert>;

    /// Full-document replace; the stored document keeps `id`
    async fn replace_by_id(
        &self,
        collection: Collection,
        id: &EntityId,
        doc: Document,
    ) -> AppResult<Option<Document>>;

    async fn delete_by_id(&self, collection: Collection, id: &EntityId) -> AppResult<bool>;
}

pub fn to_document<T: Serialize>(value: &T) -> AppResult<Document> {
    let doc = serde_json::to_value(value)?;
    if !doc.is_object() {
        return Err(AppError::Internal("documents must serialize to JSON objects".to_string()));
    }
    Ok(doc)
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> AppResult<T> {
    Ok(serde_json::from_value(doc)?)
}

pub fn document_id(doc: &Document) -> Option<EntityId> {
    doc.get("id").and_then(Value::as_str).map(EntityId::from)
}

/// Write `id` into the document, overwriting whatever id it carried
pub(crate) fn stamp_id(doc: &mut Document, id: &EntityId) -> AppResult<()> {
    let object = doc
        .as_object_mut()
        .ok_or_else(|| AppError::Store("document is not a JSON object".to_string()))?;
    object.insert("id".to_string(), Value::String(id.as_str().to_string()));
    Ok(())
}

pub(crate) fn project(doc: Document, fields: &[String]) -> Document {
    match doc {
        Value::Object(mut object) => {
            object.retain(|key, _| key == "id" || fields.iter().any(|f| f == key));
            Value::Object(object)
        }
        other => other,
    }
}

pub(crate) fn sort_documents(docs: &mut [Document], sort: &Sort) {
    docs.sort_by(|a, b| {
        let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
        match sort.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

/// Missing values sort last; strings and numbers compare naturally
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Greater,
        (_, Some(Value::Null) | None) => Ordering::Less,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Resolve `expand` references through `find_by_id`.
///
/// A dangling scalar reference becomes `null`; dangling entries of a
/// reference array are dropped.
pub(crate) async fn expand_documents<S>(
    store: &S,
    mut docs: Vec<Document>,
    expand: &[Expand],
) -> AppResult<Vec<Document>>
where
    S: EntityStore + ?Sized,
{
    if expand.is_empty() {
        return Ok(docs);
    }

    let mut cache: HashMap<(Collection, EntityId), Option<Document>> = HashMap::new();

    for doc in docs.iter_mut() {
        for rule in expand {
            let Some(slot) = doc.get_mut(&rule.field) else {
                continue;
            };
            match slot {
                Value::String(id) => {
                    let id = EntityId::new(id.clone());
                    let resolved = resolve(store, &mut cache, rule.collection, &id).await?;
                    if resolved.is_none() {
                        tracing::warn!(
                            collection = %rule.collection,
                            id = %id,
                            field = %rule.field,
                            "dangling reference expanded to null"
                        );
                    }
                    *slot = resolved.unwrap_or(Value::Null);
                }
                Value::Array(items) => {
                    let mut expanded = Vec::with_capacity(items.len());
                    for item in items.iter() {
                        if let Some(id) = item.as_str() {
                            let id = EntityId::new(id);
                            if let Some(found) = resolve(store, &mut cache, rule.collection, &id).await? {
                                expanded.push(found);
                            }
                        }
                    }
                    *items = expanded;
                }
                _ => {}
            }
        }
    }

    Ok(docs)
}

async fn resolve<S>(
    store: &S,
    cache: &mut HashMap<(Collection, EntityId), Option<Document>>,
    collection: Collection,
    id: &EntityId,
) -> AppResult<Option<Document>>
where
    S: EntityStore + ?Sized,
{
    let key = (collection, id.clone());
    if let Some(hit) = cache.get(&key) {
        return Ok(hit.clone());
    }
    let found = store.find_by_id(collection, id).await?;
    cache.insert(key, found.clone());
    Ok(found)
}
