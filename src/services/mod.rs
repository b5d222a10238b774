//! Business logic services

pub mod aggregate;
pub mod authors;
pub mod book_instances;
pub mod books;
pub mod catalog;
pub mod genres;
pub mod guard;
pub mod validation;

use crate::repository::SharedStore;

pub use validation::Pipelines;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub genres: genres::GenreService,
    pub authors: authors::AuthorService,
    pub books: books::BookService,
    pub book_instances: book_instances::BookInstanceService,
}

impl Services {
    /// Create all services over one store
    pub fn new(store: SharedStore, pipelines: Pipelines) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone()),
            genres: genres::GenreService::new(store.clone(), pipelines.genre),
            authors: authors::AuthorService::new(store.clone(), pipelines.author),
            books: books::BookService::new(store.clone(), pipelines.book),
            book_instances: book_instances::BookInstanceService::new(store, pipelines.book_instance),
        }
    }
}
