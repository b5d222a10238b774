//! Genre model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{form::SanitizedForm, CatalogEntity, EntityId, FromForm};
use crate::repository::Collection;

/// Stored genre document. `name` is unique across the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Genre {
    pub id: EntityId,
    pub name: String,
}

impl CatalogEntity for Genre {
    const COLLECTION: Collection = Collection::Genres;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GenreDraft {
    pub name: String,
}

impl GenreDraft {
    pub fn into_genre(self, id: EntityId) -> Genre {
        Genre { id, name: self.name }
    }
}

impl FromForm for GenreDraft {
    fn from_form(form: &SanitizedForm) -> Self {
        Self {
            name: form.text("name"),
        }
    }
}
