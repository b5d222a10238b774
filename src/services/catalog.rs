//! Catalog-wide operations and the outcome types shared by the entity services

use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

use super::{
    aggregate::{fetch_count, fetch_many, fetch_one, Aggregation, Fetched},
    guard::{DependentRule, DependentSummary, GuardedDelete, IntegrityGuard},
};
use crate::{
    error::AppResult,
    models::{CatalogEntity, EntityId, InstanceStatus, Violation},
    repository::{from_document, Collection, Document, Filter, FindOptions, SharedStore},
};

/// Result of a create submission
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome<T, D> {
    Created(T),
    /// A matching entity already existed and nothing was inserted
    Existing(T),
    Invalid { draft: D, violations: Vec<Violation> },
}

/// Result of an update submission
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<T, D> {
    Updated(T),
    Invalid { draft: D, violations: Vec<Violation> },
    NotFound,
}

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Refused; the listed documents still reference the entity
    Blocked(Vec<DependentSummary>),
    NotFound,
    /// The request was not confirmed, so nothing was checked or removed
    Unconfirmed,
}

/// What a delete would affect, for showing before confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletePreview<T> {
    pub entity: T,
    pub label: String,
    pub url: String,
    pub dependents: Vec<DependentSummary>,
}

/// Counts shown on the catalog home page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogCounts {
    pub book_count: u64,
    pub book_instance_count: u64,
    pub book_instance_available_count: u64,
    pub author_count: u64,
    pub genre_count: u64,
}

#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
}

impl CatalogService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn dashboard(&self) -> AppResult<CatalogCounts> {
        let store = &self.store;
        let mut results = Aggregation::new()
            .with("book_count", fetch_count(store, Collection::Books, Filter::all()))
            .with("book_instance_count", fetch_count(store, Collection::BookInstances, Filter::all()))
            .with(
                "book_instance_available_count",
                fetch_count(
                    store,
                    Collection::BookInstances,
                    Filter::all().eq("status", InstanceStatus::Available.as_str()),
                ),
            )
            .with("author_count", fetch_count(store, Collection::Authors, Filter::all()))
            .with("genre_count", fetch_count(store, Collection::Genres, Filter::all()))
            .run()
            .await?;

        Ok(CatalogCounts {
            book_count: results.count("book_count")?,
            book_instance_count: results.count("book_instance_count")?,
            book_instance_available_count: results.count("book_instance_available_count")?,
            author_count: results.count("author_count")?,
            genre_count: results.count("genre_count")?,
        })
    }

    /// Cheapest round trip that proves the store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.count(Collection::Genres, &Filter::all()).await.map(|_| ())
    }
}

pub(crate) fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> AppResult<Vec<T>> {
    docs.into_iter().map(from_document).collect()
}

/// NotFound is decided before the guard runs; an unconfirmed request stops there too
pub(crate) async fn delete_entity(
    store: &SharedStore,
    guard: &IntegrityGuard,
    collection: Collection,
    id: &EntityId,
    confirmed: bool,
) -> AppResult<DeleteOutcome> {
    if store.find_by_id(collection, id).await?.is_none() {
        return Ok(DeleteOutcome::NotFound);
    }
    if !confirmed {
        return Ok(DeleteOutcome::Unconfirmed);
    }
    Ok(match guard.delete(collection, id).await? {
        GuardedDelete::Deleted => DeleteOutcome::Deleted,
        GuardedDelete::Gone => DeleteOutcome::NotFound,
        GuardedDelete::Blocked(dependents) => DeleteOutcome::Blocked(dependents),
    })
}

/// The entity and its dependents, fetched together
pub(crate) async fn delete_preview<T: DeserializeOwned + CatalogEntity>(
    store: &SharedStore,
    collection: Collection,
    id: &EntityId,
) -> AppResult<Option<DeletePreview<T>>> {
    let mut aggregation: Aggregation<Fetched> =
        Aggregation::new().with("entity", fetch_one(store, collection, id, FindOptions::new()));
    let rule = DependentRule::for_collection(collection);
    if let Some(rule) = rule {
        aggregation = aggregation.with(
            "dependents",
            fetch_many(store, rule.dependents, rule.filter(id), FindOptions::new()),
        );
    }
    let mut results = aggregation.run().await?;

    let Some(entity) = results.one("entity")? else {
        return Ok(None);
    };
    let dependents = match rule {
        Some(rule) => IntegrityGuard::verdict(rule, &results.many("dependents")?).dependents,
        None => Vec::new(),
    };
    let entity: T = from_document(entity)?;
    Ok(Some(DeletePreview {
        label: entity.label(),
        url: entity.url(),
        entity,
        dependents,
    }))
}
