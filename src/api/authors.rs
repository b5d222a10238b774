//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{Author, EntityId, RawInput},
    services::{authors::AuthorDetail, catalog::DeletePreview},
    AppState,
};

use super::{create_response, delete_response, update_response, DeleteQuery};

/// List all authors
#[utoipa::path(
    get,
    path = "/authors",
    tag = "authors",
    responses(
        (status = 200, description = "Authors sorted by family name", body = Vec<Author>)
    )
)]
pub async fn list_authors(State(state): State<AppState>) -> AppResult<Json<Vec<Author>>> {
    Ok(Json(state.services.authors.list().await?))
}

/// Get an author and their books
#[utoipa::path(
    get,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = String, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author details", body = AuthorDetail),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<AuthorDetail>> {
    state
        .services
        .authors
        .detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
}

#[utoipa::path(
    post,
    path = "/authors",
    tag = "authors",
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.authors.create(&raw).await?;
    Ok(create_response(outcome))
}

#[utoipa::path(
    put,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = String, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.authors.update(&id, &raw).await?;
    Ok(update_response("Author", id.as_str(), outcome))
}

/// Show what deleting an author would affect
#[utoipa::path(
    get,
    path = "/authors/{id}/delete",
    tag = "authors",
    params(
        ("id" = String, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author and their books"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author_preview(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DeletePreview<Author>>> {
    state
        .services
        .authors
        .delete_preview(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
}

/// Delete an author with no books
#[utoipa::path(
    delete,
    path = "/authors/{id}",
    tag = "authors",
    params(
        ("id" = String, Path, description = "Author ID"),
        DeleteQuery
    ),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 400, description = "Deletion not confirmed"),
        (status = 404, description = "Author not found"),
        (status = 409, description = "Books still reference the author", body = BlockedBody)
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Response> {
    let outcome = state.services.authors.delete(&id, query.confirm).await?;
    Ok(delete_response("Author", id.as_str(), outcome))
}
