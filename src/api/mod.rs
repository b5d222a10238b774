//! API handlers for the catalog REST endpoints

pub mod authors;
pub mod book_instances;
pub mod books;
pub mod catalog;
pub mod genres;
pub mod health;
pub mod openapi;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{ErrorCode, ErrorResponse},
    models::Violation,
    services::{
        catalog::{CreateOutcome, DeleteOutcome, UpdateOutcome},
        guard::DependentSummary,
    },
    AppState,
};

/// Query string of a delete request
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// Must be true for anything to be removed
    #[serde(default)]
    pub confirm: bool,
}

/// 422 body: what was wrong, plus the sanitized submission for re-display
#[derive(Debug, Serialize)]
pub struct InvalidBody<D> {
    pub violations: Vec<Violation>,
    pub draft: D,
}

/// 409 body of a refused delete
#[derive(Debug, Serialize, ToSchema)]
pub struct BlockedBody {
    pub code: u32,
    pub error: String,
    pub message: String,
    pub dependents: Vec<DependentSummary>,
}

fn invalid<D: Serialize>(draft: D, violations: Vec<Violation>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(InvalidBody { violations, draft }),
    )
        .into_response()
}

fn not_found(what: &str, id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(ErrorCode::NoSuchData, format!("{} {} not found", what, id))),
    )
        .into_response()
}

pub(crate) fn create_response<T: Serialize, D: Serialize>(outcome: CreateOutcome<T, D>) -> Response {
    match outcome {
        CreateOutcome::Created(entity) => (StatusCode::CREATED, Json(entity)).into_response(),
        CreateOutcome::Existing(entity) => (StatusCode::OK, Json(entity)).into_response(),
        CreateOutcome::Invalid { draft, violations } => invalid(draft, violations),
    }
}

pub(crate) fn update_response<T: Serialize, D: Serialize>(
    what: &str,
    id: &str,
    outcome: UpdateOutcome<T, D>,
) -> Response {
    match outcome {
        UpdateOutcome::Updated(entity) => (StatusCode::OK, Json(entity)).into_response(),
        UpdateOutcome::Invalid { draft, violations } => invalid(draft, violations),
        UpdateOutcome::NotFound => not_found(what, id),
    }
}

pub(crate) fn delete_response(what: &str, id: &str, outcome: DeleteOutcome) -> Response {
    match outcome {
        DeleteOutcome::Deleted => StatusCode::NO_CONTENT.into_response(),
        DeleteOutcome::NotFound => not_found(what, id),
        DeleteOutcome::Unconfirmed => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                ErrorCode::BadValue,
                "Deletion must be confirmed with confirm=true",
            )),
        )
            .into_response(),
        DeleteOutcome::Blocked(dependents) => {
            let code = ErrorCode::HasDependents;
            (
                StatusCode::CONFLICT,
                Json(BlockedBody {
                    code: code as u32,
                    error: format!("{:?}", code),
                    message: format!("{} {} is still referenced", what, id),
                    dependents,
                }),
            )
                .into_response()
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog home
        .route("/catalog", get(catalog::dashboard))
        // Genres
        .route("/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/genres/:id",
            get(genres::get_genre)
                .put(genres::update_genre)
                .delete(genres::delete_genre),
        )
        .route("/genres/:id/delete", get(genres::delete_genre_preview))
        // Authors
        .route("/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        .route("/authors/:id/delete", get(authors::delete_author_preview))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/options", get(books::book_form_options))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        .route("/books/:id/delete", get(books::delete_book_preview))
        // Book instances
        .route(
            "/bookinstances",
            get(book_instances::list_book_instances).post(book_instances::create_book_instance),
        )
        .route("/bookinstances/options", get(book_instances::book_choices))
        .route(
            "/bookinstances/:id",
            get(book_instances::get_book_instance)
                .put(book_instances::update_book_instance)
                .delete(book_instances::delete_book_instance),
        )
        .route(
            "/bookinstances/:id/delete",
            get(book_instances::delete_book_instance_preview),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
