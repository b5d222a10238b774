//! Data models for the catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod form;
pub mod genre;

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repository::Collection;

// Re-export commonly used types
pub use author::{Author, AuthorDraft, Lifespan};
pub use book::{Book, BookDraft, BookSummary, BookView};
pub use book_instance::{BookInstance, BookInstanceDraft, BookInstanceView, InstanceStatus};
pub use form::{FromForm, RawInput, SanitizedForm, Violation};
pub use genre::{Genre, GenreDraft};

/// Opaque, store-assigned entity identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for a document about to be inserted
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Behaviour shared by the four stored entity types
pub trait CatalogEntity {
    /// Collection the entity is stored in
    const COLLECTION: Collection;

    fn id(&self) -> &EntityId;

    /// Short human label used when the entity is listed as a dependent
    fn label(&self) -> String;

    /// Canonical catalog URL, derived from the id
    fn url(&self) -> String {
        Self::COLLECTION.url_for(self.id())
    }
}
