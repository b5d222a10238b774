//! Genre service

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
    models::{Book, CatalogEntity, EntityId, Genre, GenreDraft, RawInput, Violation},
    repository::{
        from_document, to_document, Collection, Filter, FindOptions, SharedStore, SortOrder, UniqueInsert,
    },
};

/// A genre with the books filed under it
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GenreDetail {
    pub genre: Genre,
    pub url: String,
    pub genre_books: Vec<Book>,
}

#[derive(Clone)]
pub struct GenreService {
    store: SharedStore,
    guard: IntegrityGuard,
    pipeline: Pipeline,
}

impl GenreService {
    pub fn new(store: SharedStore, pipeline: Pipeline) -> Self {
        Self {
            guard: IntegrityGuard::new(store.clone()),
            store,
            pipeline,
        }
    }

    /// All genres, sorted by name
    pub async fn list(&self) -> AppResult<Vec<Genre>> {
        let options = FindOptions::new().sort_by("name", SortOrder::Ascending);
        let docs = self.store.find(Collection::Genres, &Filter::all(), &options).await?;
        decode_all(docs)
    }

    pub async fn detail(&self, id: &EntityId) -> AppResult<Option<GenreDetail>> {
        let mut results = Aggregation::new()
            .with("genre", fetch_one(&self.store, Collection::Genres, id, FindOptions::new()))
            .with(
                "genre_books",
                fetch_many(
                    &self.store,
                    Collection::Books,
                    Filter::all().contains("genre", id.as_str()),
                    FindOptions::new(),
                ),
            )
            .run()
            .await?;

        let Some(genre) = results.one("genre")? else {
            return Ok(None);
        };
        let genre: Genre = from_document(genre)?;
        Ok(Some(GenreDetail {
            url: genre.url(),
            genre,
            genre_books: decode_all(results.many("genre_books")?)?,
        }))
    }

    /// Find-or-create by name: an existing genre with the same name is returned as is
    pub async fn create(&self, raw: &RawInput) -> AppResult<CreateOutcome<Genre, GenreDraft>> {
        let draft = match self.pipeline.validate::<GenreDraft>(raw) {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(CreateOutcome::Invalid { draft, violations });
            }
        };

        if let Some(existing) = self.find_by_name(&draft.name).await? {
            tracing::info!(id = %existing.id, name = %existing.name, "genre already exists");
            return Ok(CreateOutcome::Existing(existing));
        }

        // A concurrent submission may have won since the lookup; the store settles it
        match self
            .store
            .insert_unique(Collection::Genres, "name", to_document(&draft)?)
            .await?
        {
            UniqueInsert::Inserted(doc) => {
                let genre: Genre = from_document(doc)?;
                tracing::info!(id = %genre.id, name = %genre.name, "genre created");
                Ok(CreateOutcome::Created(genre))
            }
            UniqueInsert::Existing(doc) => Ok(CreateOutcome::Existing(from_document(doc)?)),
        }
    }

    pub async fn update(&self, id: &EntityId, raw: &RawInput) -> AppResult<UpdateOutcome<Genre, GenreDraft>> {
        let draft = match self.pipeline.validate::<GenreDraft>(raw) {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(UpdateOutcome::Invalid { draft, violations });
            }
        };

        if self.store.find_by_id(Collection::Genres, id).await?.is_none() {
            return Ok(UpdateOutcome::NotFound);
        }
        if let Some(other) = self.find_by_name(&draft.name).await? {
            if &other.id != id {
                return Ok(UpdateOutcome::Invalid {
                    draft,
                    violations: vec![Violation::new("name", "A genre with this name already exists")],
                });
            }
        }

        let genre = draft.into_genre(id.clone());
        match self
            .store
            .replace_by_id(Collection::Genres, id, to_document(&genre)?)
            .await?
        {
            Some(doc) => Ok(UpdateOutcome::Updated(from_document(doc)?)),
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    pub async fn delete_preview(&self, id: &EntityId) -> AppResult<Option<DeletePreview<Genre>>> {
        delete_preview(&self.store, Collection::Genres, id).await
    }

    pub async fn delete(&self, id: &EntityId, confirmed: bool) -> AppResult<DeleteOutcome> {
        delete_entity(&self.store, &self.guard, Collection::Genres, id, confirmed).await
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Genre>> {
        let mut docs = self
            .store
            .find(Collection::Genres, &Filter::all().eq("name", name), &FindOptions::new())
            .await?;
        if docs.is_empty() {
            return Ok(None);
        }
        from_document(docs.swap_remove(0)).map(Some)
    }
}
