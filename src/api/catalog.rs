//! Catalog home endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, services::catalog::CatalogCounts, AppState};

/// Record counts for the catalog home page
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog counts", body = CatalogCounts),
        (status = 500, description = "Store unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<CatalogCounts>> {
    Ok(Json(state.services.catalog.dashboard().await?))
}
