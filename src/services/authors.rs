//! Author service

use serde::Serialize;
use utoipa::ToSchema;

use super::{
    aggregate::{fetch_many, fetch_one, Aggregation},
    catalog::{decode_all, delete_entity, delete_preview, CreateOutcome, DeleteOutcome, DeletePreview, UpdateOutcome},
    guard::IntegrityGuard,
    validation::{Pipeline, Validated},
};
use crate::{
    error::AppResult,
    models::{Author, AuthorDraft, Book, CatalogEntity, EntityId, RawInput},
    repository::{from_document, to_document, Collection, Filter, FindOptions, SharedStore, SortOrder},
};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AuthorDetail {
    pub author: Author,
    /// "family_name, first_name"
    pub name: String,
    pub lifespan: String,
    pub url: String,
    pub author_books: Vec<Book>,
}

#[derive(Clone)]
pub struct AuthorService {
    store: SharedStore,
    guard: IntegrityGuard,
    pipeline: Pipeline,
}

impl AuthorService {
    pub fn new(store: SharedStore, pipeline: Pipeline) -> Self {
        Self {
            guard: IntegrityGuard::new(store.clone()),
            store,
            pipeline,
        }
    }

    /// All authors, sorted by family name
    pub async fn list(&self) -> AppResult<Vec<Author>> {
        let options = FindOptions::new().sort_by("family_name", SortOrder::Ascending);
        let docs = self.store.find(Collection::Authors, &Filter::all(), &options).await?;
        decode_all(docs)
    }

    pub async fn detail(&self, id: &EntityId) -> AppResult<Option<AuthorDetail>> {
        let mut results = Aggregation::new()
            .with("author", fetch_one(&self.store, Collection::Authors, id, FindOptions::new()))
            .with(
                "author_books",
                fetch_many(
                    &self.store,
                    Collection::Books,
                    Filter::all().eq("author", id.as_str()),
                    FindOptions::new().select(&["title", "summary", "author", "isbn", "genre"]),
                ),
            )
            .run()
            .await?;

        let Some(author) = results.one("author")? else {
            return Ok(None);
        };
        let author: Author = from_document(author)?;
        Ok(Some(AuthorDetail {
            name: author.name(),
            lifespan: author.lifespan().to_string(),
            url: author.url(),
            author,
            author_books: decode_all(results.many("author_books")?)?,
        }))
    }

    pub async fn create(&self, raw: &RawInput) -> AppResult<CreateOutcome<Author, AuthorDraft>> {
        let draft = match self.pipeline.validate::<AuthorDraft>(raw) {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(CreateOutcome::Invalid { draft, violations });
            }
        };

        let doc = self.store.insert(Collection::Authors, to_document(&draft)?).await?;
        let author: Author = from_document(doc)?;
        tracing::info!(id = %author.id, name = %author.name(), "author created");
        Ok(CreateOutcome::Created(author))
    }

    pub async fn update(&self, id: &EntityId, raw: &RawInput) -> AppResult<UpdateOutcome<Author, AuthorDraft>> {
        let draft = match self.pipeline.validate::<AuthorDraft>(raw) {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(UpdateOutcome::Invalid { draft, violations });
            }
        };

        let author = draft.into_author(id.clone());
        match self
            .store
            .replace_by_id(Collection::Authors, id, to_document(&author)?)
            .await?
        {
            Some(doc) => Ok(UpdateOutcome::Updated(from_document(doc)?)),
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    pub async fn delete_preview(&self, id: &EntityId) -> AppResult<Option<DeletePreview<Author>>> {
        delete_preview(&self.store, Collection::Authors, id).await
    }

    pub async fn delete(&self, id: &EntityId, confirmed: bool) -> AppResult<DeleteOutcome> {
        delete_entity(&self.store, &self.guard, Collection::Authors, id, confirmed).await
    }
}
