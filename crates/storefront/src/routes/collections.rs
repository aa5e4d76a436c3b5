//! Collection handlers. Reads are public; writes are admin-only.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::Serialize;

use threadline_core::CollectionId;

use crate::error::Result;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireAuth;
use crate::models::{Collection, CollectionFilter, CollectionInput};
use crate::services::CatalogService;
use crate::state::AppState;

/// Build the collections router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/collections", get(index).post(create))
        .route("/collections/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Collections; featured first, then newest year, then name.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn index(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<CollectionFilter>,
) -> Result<Json<Vec<Collection>>> {
    let collections = CatalogService::new(state.store())
        .list_collections(filter)
        .await?;
    Ok(Json(collections))
}

/// # Errors
///
/// Returns 404 for an unknown collection.
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<CollectionId>,
) -> Result<Json<Collection>> {
    let collection = CatalogService::new(state.store())
        .get_collection(id)
        .await?;
    Ok(Json(collection))
}

/// # Errors
///
/// Returns 403 for non-admins and 400 for invalid or duplicate names.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<CollectionInput>,
) -> Result<(StatusCode, Json<Collection>)> {
    let collection = CatalogService::new(state.store())
        .create_collection(&user, body)
        .await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

/// # Errors
///
/// Returns 403 for non-admins, 400 for invalid or duplicate names and 404
/// for an unknown collection.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<CollectionId>,
    AppJson(body): AppJson<CollectionInput>,
) -> Result<Json<Collection>> {
    let collection = CatalogService::new(state.store())
        .update_collection(&user, id, body)
        .await?;
    Ok(Json(collection))
}

/// # Errors
///
/// Returns 403 for non-admins, 400 while active products use it and 404 for
/// an unknown collection.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<CollectionId>,
) -> Result<Json<MessageResponse>> {
    CatalogService::new(state.store())
        .delete_collection(&user, id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Collection deleted successfully",
    }))
}
