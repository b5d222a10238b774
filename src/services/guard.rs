//! Referential-integrity guard for deletes.
//!
//! Deleting an entity that other documents still reference is refused,
//! never cascaded. The dependent lookup and the delete are two separate
//! store calls: a dependent created in between is not seen. Dependents
//! come from low-frequency administrative flows, so that window is
//! accepted.

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::EntityId,
    repository::{document_id, Collection, Document, Filter, FindOptions, SharedStore},
};

/// Where the dependents of a collection live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependentRule {
    pub dependents: Collection,
    pub field: &'static str,
    /// The reference field is an array of ids
    pub many: bool,
    /// Field shown when a dependent is listed
    pub label_field: &'static str,
}

impl DependentRule {
    pub fn for_collection(collection: Collection) -> Option<Self> {
        match collection {
            Collection::Books => Some(Self {
                dependents: Collection::BookInstances,
                field: "book",
                many: false,
                label_field: "imprint",
            }),
            Collection::Genres => Some(Self {
                dependents: Collection::Books,
                field: "genre",
                many: true,
                label_field: "title",
            }),
            Collection::Authors => Some(Self {
                dependents: Collection::Books,
                field: "author",
                many: false,
                label_field: "title",
            }),
            Collection::BookInstances => None,
        }
    }

    pub fn filter(&self, id: &EntityId) -> Filter {
        if self.many {
            Filter::all().contains(self.field, id.as_str())
        } else {
            Filter::all().eq(self.field, id.as_str())
        }
    }
}

/// A document that blocks a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DependentSummary {
    pub id: EntityId,
    #[schema(value_type = String)]
    pub collection: Collection,
    pub label: String,
    pub url: String,
}

impl DependentSummary {
    pub fn from_document(collection: Collection, label_field: &str, doc: &Document) -> Option<Self> {
        let id = document_id(doc)?;
        let label = doc
            .get(label_field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self {
            url: collection.url_for(&id),
            id,
            collection,
            label,
        })
    }
}

/// Dependents found for one delete request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct GuardVerdict {
    pub dependents: Vec<DependentSummary>,
}

impl GuardVerdict {
    pub fn blocked(&self) -> bool {
        !self.dependents.is_empty()
    }
}

/// Result of a guarded delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedDelete {
    Deleted,
    /// The document vanished before the delete ran
    Gone,
    Blocked(Vec<DependentSummary>),
}

#[derive(Clone)]
pub struct IntegrityGuard {
    store: SharedStore,
}

impl IntegrityGuard {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Dependent documents currently referencing `id`
    pub async fn check(&self, collection: Collection, id: &EntityId) -> AppResult<GuardVerdict> {
        let Some(rule) = DependentRule::for_collection(collection) else {
            return Ok(GuardVerdict::default());
        };
        let docs = self
            .store
            .find(rule.dependents, &rule.filter(id), &FindOptions::new())
            .await?;
        Ok(Self::verdict(rule, &docs))
    }

    pub fn verdict(rule: DependentRule, docs: &[Document]) -> GuardVerdict {
        GuardVerdict {
            dependents: docs
                .iter()
                .filter_map(|doc| DependentSummary::from_document(rule.dependents, rule.label_field, doc))
                .collect(),
        }
    }

    /// CHECKING → BLOCKED, or CHECKING → DELETING → DELETED
    pub async fn delete(&self, collection: Collection, id: &EntityId) -> AppResult<GuardedDelete> {
        tracing::debug!(%collection, %id, "delete: checking dependents");
        let verdict = self.check(collection, id).await?;
        if verdict.blocked() {
            tracing::info!(
                %collection,
                %id,
                dependents = verdict.dependents.len(),
                "delete blocked by dependents"
            );
            return Ok(GuardedDelete::Blocked(verdict.dependents));
        }

        tracing::debug!(%collection, %id, "delete: deleting");
        if self.store.delete_by_id(collection, id).await? {
            tracing::info!(%collection, %id, "deleted");
            Ok(GuardedDelete::Deleted)
        } else {
            Ok(GuardedDelete::Gone)
        }
    }
}
