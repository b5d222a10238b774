//! Book instance endpoints

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookInstance, BookInstanceView, EntityId, RawInput},
    services::catalog::DeletePreview,
    AppState,
};

use super::{create_response, delete_response, update_response, DeleteQuery};

/// List every copy with its book
#[utoipa::path(
    get,
    path = "/bookinstances",
    tag = "bookinstances",
    responses(
        (status = 200, description = "All copies", body = Vec<BookInstanceView>)
    )
)]
pub async fn list_book_instances(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BookInstanceView>>> {
    Ok(Json(state.services.book_instances.list().await?))
}

#[utoipa::path(
    get,
    path = "/bookinstances/{id}",
    tag = "bookinstances",
    params(
        ("id" = String, Path, description = "Book instance ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = BookInstanceView),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn get_book_instance(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<BookInstanceView>> {
    state
        .services
        .book_instances
        .detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
}

/// Books a copy can be filed under
#[utoipa::path(
    get,
    path = "/bookinstances/options",
    tag = "bookinstances",
    responses(
        (status = 200, description = "Books sorted by title", body = Vec<Book>)
    )
)]
pub async fn book_choices(State(state): State<AppState>) -> AppResult<Json<Vec<Book>>> {
    Ok(Json(state.services.book_instances.book_choices().await?))
}

#[utoipa::path(
    post,
    path = "/bookinstances",
    tag = "bookinstances",
    responses(
        (status = 201, description = "Copy created", body = BookInstance),
        (status = 422, description = "Invalid input or unknown book")
    )
)]
pub async fn create_book_instance(
    State(state): State<AppState>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.book_instances.create(&raw).await?;
    Ok(create_response(outcome))
}

#[utoipa::path(
    put,
    path = "/bookinstances/{id}",
    tag = "bookinstances",
    params(
        ("id" = String, Path, description = "Book instance ID")
    ),
    responses(
        (status = 200, description = "Copy updated", body = BookInstance),
        (status = 404, description = "Book instance not found"),
        (status = 422, description = "Invalid input or unknown book")
    )
)]
pub async fn update_book_instance(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(raw): Json<RawInput>,
) -> AppResult<Response> {
    let outcome = state.services.book_instances.update(&id, &raw).await?;
    Ok(update_response("Book instance", id.as_str(), outcome))
}

#[utoipa::path(
    get,
    path = "/bookinstances/{id}/delete",
    tag = "bookinstances",
    params(
        ("id" = String, Path, description = "Book instance ID")
    ),
    responses(
        (status = 200, description = "The copy; copies never have dependents"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn delete_book_instance_preview(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> AppResult<Json<DeletePreview<BookInstance>>> {
    state
        .services
        .book_instances
        .delete_preview(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
}

#[utoipa::path(
    delete,
    path = "/bookinstances/{id}",
    tag = "bookinstances",
    params(
        ("id" = String, Path, description = "Book instance ID"),
        DeleteQuery
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 400, description = "Deletion not confirmed"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn delete_book_instance(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Response> {
    let outcome = state.services.book_instances.delete(&id, query.confirm).await?;
    Ok(delete_response("Book instance", id.as_str(), outcome))
}
