//! Book instance service

use super::{
    catalog::{decode_all, delete_entity, delete_preview, CreateOutcome, DeleteOutcome, DeletePreview, UpdateOutcome},
    guard::IntegrityGuard,
    validation::{Pipeline, Validated},
};
use crate::{
    error::AppResult,
    models::{Book, BookInstance, BookInstanceDraft, BookInstanceView, EntityId, RawInput, Violation},
    repository::{from_document, to_document, Collection, Filter, FindOptions, SharedStore, SortOrder},
};

#[derive(Clone)]
pub struct BookInstanceService {
    store: SharedStore,
    guard: IntegrityGuard,
    pipeline: Pipeline,
}

impl BookInstanceService {
    pub fn new(store: SharedStore, pipeline: Pipeline) -> Self {
        Self {
            guard: IntegrityGuard::new(store.clone()),
            store,
            pipeline,
        }
    }

    /// Every copy with its book expanded
    pub async fn list(&self) -> AppResult<Vec<BookInstanceView>> {
        let options = FindOptions::new().expand("book", Collection::Books);
        let docs = self
            .store
            .find(Collection::BookInstances, &Filter::all(), &options)
            .await?;
        decode_all(docs)
    }

    pub async fn detail(&self, id: &EntityId) -> AppResult<Option<BookInstanceView>> {
        let options = FindOptions::new().expand("book", Collection::Books);
        let mut docs = self
            .store
            .find(Collection::BookInstances, &Filter::by_id(id), &options)
            .await?;
        if docs.is_empty() {
            return Ok(None);
        }
        from_document(docs.swap_remove(0)).map(Some)
    }

    /// Books a copy can be filed under, sorted by title
    pub async fn book_choices(&self) -> AppResult<Vec<Book>> {
        let options = FindOptions::new().sort_by("title", SortOrder::Ascending);
        let docs = self.store.find(Collection::Books, &Filter::all(), &options).await?;
        decode_all(docs)
    }

    pub async fn create(&self, raw: &RawInput) -> AppResult<CreateOutcome<BookInstance, BookInstanceDraft>> {
        let draft = match self.validated(raw).await? {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(CreateOutcome::Invalid { draft, violations });
            }
        };

        let doc = self
            .store
            .insert(Collection::BookInstances, to_document(&draft)?)
            .await?;
        let instance: BookInstance = from_document(doc)?;
        tracing::info!(id = %instance.id, book = %instance.book, status = %instance.status, "book instance created");
        Ok(CreateOutcome::Created(instance))
    }

    pub async fn update(
        &self,
        id: &EntityId,
        raw: &RawInput,
    ) -> AppResult<UpdateOutcome<BookInstance, BookInstanceDraft>> {
        let draft = match self.validated(raw).await? {
            Validated::Valid(draft) => draft,
            Validated::Invalid { draft, violations } => {
                return Ok(UpdateOutcome::Invalid { draft, violations });
            }
        };

        let instance = draft.into_instance(id.clone());
        match self
            .store
            .replace_by_id(Collection::BookInstances, id, to_document(&instance)?)
            .await?
        {
            Some(doc) => Ok(UpdateOutcome::Updated(from_document(doc)?)),
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    pub async fn delete_preview(&self, id: &EntityId) -> AppResult<Option<DeletePreview<BookInstance>>> {
        delete_preview(&self.store, Collection::BookInstances, id).await
    }

    /// Copies have no dependents, so a confirmed delete of an existing copy always succeeds
    pub async fn delete(&self, id: &EntityId, confirmed: bool) -> AppResult<DeleteOutcome> {
        delete_entity(&self.store, &self.guard, Collection::BookInstances, id, confirmed).await
    }

    async fn validated(&self, raw: &RawInput) -> AppResult<Validated<BookInstanceDraft>> {
        let (draft, mut violations) = match self.pipeline.validate::<BookInstanceDraft>(raw) {
            Validated::Valid(draft) => (draft, Vec::new()),
            Validated::Invalid { draft, violations } => (draft, violations),
        };

        if !draft.book.is_empty() && self.store.count(Collection::Books, &Filter::by_id(&draft.book)).await? == 0 {
            violations.push(Violation::new("book", "Book does not exist"));
        }

        if violations.is_empty() {
            Ok(Validated::Valid(draft))
        } else {
            Ok(Validated::Invalid { draft, violations })
        }
    }
}
