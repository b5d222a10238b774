//! Book service

use serde::Serialize;
use utoipa::ToSchema;

use super::{
    aggregate::{fetch_count, fetch_many, fetch_one, Aggregation},
    catalog::{decode_all, delete_entity, delete_preview, CreateOutcome, DeleteOutcome, DeletePreview, UpdateOutcome},
    guard::IntegrityGuard,
    validation::{Pipeline, Validated},
};
use crate::{
    error::AppResult,
    models::{Author, Book, BookDraft, BookInstance, BookSummary, BookView, EntityId, Genre, RawInput, Violation},
    repository::{from_document, to_document, Collection, Filter, FindOptions, SharedStore, SortOrder},
};

/// A book with its author and genres expanded, plus every copy of it
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: BookView,
    pub url: String,
    pub book_instances: Vec<BookInstance>,
}

/// Choices offered by the book form
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BookFormOptions {
    pub authors: Vec<Author>,
    pub genres: Vec<Genre>,
}

#[derive(Clone)]
pub struct BookService {
    store: SharedStore,
    guard: IntegrityGuard,
    pipeline: Pipeline,
}

impl BookService {
    pub fn new(store: SharedStore, pipeline: Pipeline) -> Self {
        Self {
            guard: IntegrityGuard::new(store.clone()),
            store,
            pipeline,
        }
    }

    /// Title and author of every book, sorted by title
    pub async fn list(&self) -> AppResult<Vec<BookSummary>> {
        let options = FindOptions::new()
            .select(&["title", "author"])
            .sort_by("title", SortOrder::Ascending)
            .expand("author", Collection::Authors);
        let docs = self.store.find(Collection::Books, &Filter::all(), &options).await?;
        decode_all(docs)
    }

    pub async fn detail(&self, id: &EntityId) -> AppResult<Option<BookDetail>> {
        let mut results = Aggregation::new()
            .with(
                "book",
                fetch_one(
                    &self.store,
                    Collection::Books,
                    id,
                    FindOptions::new()
                        .expand("author", Collection::Authors)
                        .expand("genre", Collection::Genres),
                ),
            )
            .with(
                "book_instance",
                fetch_many(
                    &self.store,
                    Collection::BookInstances,
                    Filter::all().eq("book", id.as_str()),
                    FindOptions::new(),
                ),
            )
            .run()
            .await?;

        let Some(book) = results.one("book")? else {
            return Ok(None);
        };
        let book: BookView = from_document(book)?;
        Ok(Some(BookDetail {
            url: book.url(),
            book,
            book_instances: decode_all(results.many("book_instance")?)?,
        }))
    }

    pub async fn form_options(&self) -> AppResult<BookFormOptions> {
        let mut results = Aggregation::new()
            .with(
                "authors",
                fetch_many(
                    &self.store,
                    Collection::Authors,
                    Filter::all(),
                    FindOptions::new().sort_by("family_name", SortOrder::Ascending),
                ),
            )
            .with(
                "genres",
                fetch_many(
                    &self.store,
                    Collection::Genres,
                    Filter::all(),
                    FindOptions::new().sort_by("name", SortOrder::Ascending),
                ),
            )
            .run()
            .await?;

        Ok(BookFormOptions {
            authors: decode_all(results.many("authors")?)?,
            genres: decode_all(results.many("genres")?)?,
        })
    }

    pub async fn create(&self, raw: &RawInput) -> AppResult<CreateOutcome<Book, BookDraft>> {
        let draft = match self.validated(raw).await? {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(CreateOutcome::Invalid { draft, violations });
            }
        };

        let doc = self.store.insert(Collection::Books, to_document(&draft)?).await?;
        let book: Book = from_document(doc)?;
        tracing::info!(id = %book.id, title = %book.title, "book created");
        Ok(CreateOutcome::Created(book))
    }

    pub async fn update(&self, id: &EntityId, raw: &RawInput) -> AppResult<UpdateOutcome<Book, BookDraft>> {
        let draft = match self.validated(raw).await? {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(UpdateOutcome::Invalid { draft, violations });
            }
        };

        let book = draft.into_book(id.clone());
        match self
            .store
            .replace_by_id(Collection::Books, id, to_document(&book)?)
            .await?
        {
            Some(doc) => Ok(UpdateOutcome::Updated(from_document(doc)?)),
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    pub async fn delete_preview(&self, id: &EntityId) -> AppResult<Option<DeletePreview<Book>>> {
        delete_preview(&self.store, Collection::Books, id).await
    }

    pub async fn delete(&self, id: &EntityId, confirmed: bool) -> AppResult<DeleteOutcome> {
        delete_entity(&self.store, &self.guard, Collection::Books, id, confirmed).await
    }

    /// Pipeline result, extended with violations for references that do not resolve
    async fn validated(&self, raw: &RawInput) -> AppResult<Validated<BookDraft>> {
        let (draft, mut violations) = match self.pipeline.validate::<BookDraft>(raw) {
            Validated::Valid(draft) => (draft, Vec::new()),
            Validated::Invalid { draft, violations } => (draft, violations),
        };
        violations.extend(self.dangling_references(&draft).await?);

        if violations.is_empty() {
            Ok(Validated::Valid(draft))
        } else {
            Ok(Validated::Invalid { draft, violations })
        }
    }

    async fn dangling_references(&self, draft: &BookDraft) -> AppResult<Vec<Violation>> {
        let mut checks = Aggregation::new();
        if !draft.author.is_empty() {
            checks = checks.with("author", fetch_count(&self.store, Collection::Authors, Filter::by_id(&draft.author)));
        }
        if !draft.genre.is_empty() {
            let ids = draft.genre.iter().map(|id| id.as_str().to_string());
            checks = checks.with(
                "genre",
                fetch_count(&self.store, Collection::Genres, Filter::all().any_of("id", ids)),
            );
        }
        if checks.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = checks.run().await?;
        let mut violations = Vec::new();
        if !draft.author.is_empty() && results.count("author")? == 0 {
            violations.push(Violation::new("author", "Author does not exist"));
        }
        if !draft.genre.is_empty() && results.count("genre")? < draft.genre.len() as u64 {
            violations.push(Violation::new("genre", "Unknown genre selected"));
        }
        Ok(violations)
    }
}
