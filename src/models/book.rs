//! Book model and its expanded views

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{author::Author, form::SanitizedForm, genre::Genre, CatalogEntity, EntityId, FromForm};
use crate::repository::Collection;

/// Stored book document; `author` and `genre` hold references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: EntityId,
    pub title: String,
    pub author: EntityId,
    pub summary: String,
    pub isbn: String,
    #[serde(default)]
    pub genre: Vec<EntityId>,
}

impl CatalogEntity for Book {
    const COLLECTION: Collection = Collection::Books;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> String {
        self.title.clone()
    }
}

/// List projection: title plus the expanded author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: EntityId,
    pub title: String,
    pub author: Author,
}

/// Book with author and genres expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookView {
    pub id: EntityId,
    pub title: String,
    pub author: Author,
    pub summary: String,
    pub isbn: String,
    #[serde(default)]
    pub genre: Vec<Genre>,
}

impl BookView {
    pub fn url(&self) -> String {
        Collection::Books.url_for(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookDraft {
    pub title: String,
    pub author: EntityId,
    pub summary: String,
    pub isbn: String,
    pub genre: Vec<EntityId>,
}

impl BookDraft {
    pub fn into_book(self, id: EntityId) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            summary: self.summary,
            isbn: self.isbn,
            genre: self.genre,
        }
    }
}

impl FromForm for BookDraft {
    fn from_form(form: &SanitizedForm) -> Self {
        let mut genre: Vec<EntityId> = Vec::new();
        for id in form.values("genre") {
            let id = EntityId::new(id);
            if !genre.contains(&id) {
                genre.push(id);
            }
        }
        Self {
            title: form.text("title"),
            author: EntityId::new(form.text("author")),
            summary: form.text("summary"),
            isbn: form.text("isbn"),
            genre,
        }
    }
}
