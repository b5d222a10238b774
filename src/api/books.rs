//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookSummary, EntityId, RawInput},
    services::{
        books::{BookDetail, BookFormOptions},
        catalog::DeletePreview,
    },
    AppState,
};

use super::{create_response, delete_response, update_response, DeleteQuery};

/// List all books with their authors
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    responses(
        (status = 200, description = "Books sorted by title", body = Vec<BookSummary>)
    )
)]
pub async fn list_books(State(state): State<AppState>) -> AppResult<Json<Vec<BookSummary>>> {
    Ok(Json(state.services.books.list().await?))
}

/// Get a book, its author, its genres and its copies
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetail),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<BookDetail>> {
    state
        .services
        .books
        .detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
}

/// Authors and genres a book can be filed under
#[utoipa::path(
    get,
    path = "/books/options",
    tag = "books",
    responses(
        (status = 200, description = "Form choices", body = BookFormOptions)
    )
)]
pub async fn book_form_options(State(state): State<AppState>) -> AppResult<Json<BookFormOptions>> {
    Ok(Json(state.services.books.form_options().await?))
}

#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 422, description = "Invalid input or unknown author/genre")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.books.create(&raw).await?;
    Ok(create_response(outcome))
}

#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Invalid input or unknown author/genre")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.books.update(&id, &raw).await?;
    Ok(update_response("Book", id.as_str(), outcome))
}

#[utoipa::path(
    get,
    path = "/books/{id}/delete",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book and its copies"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book_preview(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DeletePreview<Book>>> {
    state
        .services
        .books
        .delete_preview(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
}

/// Delete a book with no copies
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = String, Path, description = "Book ID"),
        DeleteQuery
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Deletion not confirmed"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Copies of the book still exist", body = BlockedBody)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Response> {
    let outcome = state.services.books.delete(&id, query.confirm).await?;
    Ok(delete_response("Book", id.as_str(), outcome))
}
