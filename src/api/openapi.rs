//! OpenAPI documentation

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::api::{authors, book_instances, books, catalog, genres, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Local Library API",
        version = "1.0.0",
        description = "Library catalog REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        catalog::dashboard,
        // Genres
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::update_genre,
        genres::delete_genre_preview,
        genres::delete_genre,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author_preview,
        authors::delete_author,
        // Books
        books::list_books,
        books::get_book,
        books::book_form_options,
        books::create_book,
        books::update_book,
        books::delete_book_preview,
        books::delete_book,
        // Book instances
        book_instances::list_book_instances,
        book_instances::get_book_instance,
        book_instances::book_choices,
        book_instances::create_book_instance,
        book_instances::update_book_instance,
        book_instances::delete_book_instance_preview,
        book_instances::delete_book_instance,
    ),
    components(
        schemas(
            crate::models::EntityId,
            crate::models::Violation,
            crate::models::Genre,
            crate::models::Author,
            crate::models::Book,
            crate::models::BookSummary,
            crate::models::BookView,
            crate::models::BookInstance,
            crate::models::BookInstanceView,
            crate::models::InstanceStatus,
            crate::models::GenreDraft,
            crate::models::AuthorDraft,
            crate::models::BookDraft,
            crate::models::BookInstanceDraft,
            crate::services::catalog::CatalogCounts,
            crate::services::genres::GenreDetail,
            crate::services::authors::AuthorDetail,
            crate::services::books::BookDetail,
            crate::services::books::BookFormOptions,
            crate::services::guard::DependentSummary,
            crate::api::BlockedBody,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Catalog home"),
        (name = "genres", description = "Genre management"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book management"),
        (name = "bookinstances", description = "Copies of books")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document as JSON
pub fn create_openapi_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
