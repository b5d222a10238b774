//! Genre endpoints

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{EntityId, Genre, RawInput},
    services::{catalog::DeletePreview, genres::GenreDetail},
    AppState,
};

use super::{create_response, delete_response, update_response, DeleteQuery};

/// List all genres
#[utoipa::path(
    get,
    path = "/genres",
    tag = "genres",
    responses(
        (status = 200, description = "Genres sorted by name", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.services.genres.list().await?))
}

/// Get a genre and its books
#[utoipa::path(
    get,
    path = "/genres/{id}",
    tag = "genres",
    params(
        ("id" = String, Path, description = "Genre ID")
    ),
    responses(
        (status = 200, description = "Genre details", body = GenreDetail),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn get_genre(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<GenreDetail>> {
    state
        .services
        .genres
        .detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Genre {} not found", id)))
}

/// Create a genre, or return the one that already has this name
#[utoipa::path(
    post,
    path = "/genres",
    tag = "genres",
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 200, description = "A genre with this name already exists", body = Genre),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.genres.create(&raw).await?;
    Ok(create_response(outcome))
}

/// Update a genre
#[utoipa::path(
    put,
    path = "/genres/{id}",
    tag = "genres",
    params(
        ("id" = String, Path, description = "Genre ID")
    ),
    responses(
        (status = 200, description = "Genre updated", body = Genre),
        (status = 404, description = "Genre not found"),
        (status = 422, description = "Invalid input")
    )
)]
pub async fn update_genre(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.genres.update(&id, &raw).await?;
    Ok(update_response("Genre", id.as_str(), outcome))
}

/// Show what deleting a genre would affect
#[utoipa::path(
    get,
    path = "/genres/{id}/delete",
    tag = "genres",
    params(
        ("id" = String, Path, description = "Genre ID")
    ),
    responses(
        (status = 200, description = "Genre and the books filed under it"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre_preview(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DeletePreview<Genre>>> {
    state
        .services
        .genres
        .delete_preview(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Genre {} not found", id)))
}

/// Delete a genre that no book references
#[utoipa::path(
    delete,
    path = "/genres/{id}",
    tag = "genres",
    params(
        ("id" = String, Path, description = "Genre ID"),
        DeleteQuery
    ),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 400, description = "Deletion not confirmed"),
        (status = 404, description = "Genre not found"),
        (status = 409, description = "Books still reference the genre", body = BlockedBody)
    )
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Response> {
    let outcome = state.services.genres.delete(&id, query.confirm).await?;
    Ok(delete_response("Genre", id.as_str(), outcome))
}
