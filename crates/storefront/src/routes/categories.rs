//! Category and subcategory handlers. Reads are public; writes are admin-only.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use threadline_core::{CategoryId, SubCategoryId};

use crate::error::Result;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireAuth;
use crate::models::{
    Category, CategoryInput, CategoryView, SubCategory, SubCategoryInput, SubCategoryView,
};
use crate::services::CatalogService;
use crate::state::AppState;

/// Build the categories router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(show_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route(
            "/subcategories",
            get(list_sub_categories).post(create_sub_category),
        )
        .route(
            "/subcategories/{id}",
            get(show_sub_category)
                .put(update_sub_category)
                .delete(delete_sub_category),
        )
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_true")]
    pub active_only: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// =============================================================================
// Categories
// =============================================================================

/// Categories with their subcategories; `?active_only=false` includes
/// inactive ones.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list_categories(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Vec<CategoryView>>> {
    let categories = CatalogService::new(state.store())
        .list_categories(query.active_only)
        .await?;
    Ok(Json(categories))
}

/// # Errors
///
/// Returns 404 for an unknown category.
pub async fn show_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<CategoryId>,
) -> Result<Json<CategoryView>> {
    let category = CatalogService::new(state.store()).get_category(id).await?;
    Ok(Json(category))
}

/// # Errors
///
/// Returns 403 for non-admins and 400 for invalid or duplicate names.
pub async fn create_category(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = CatalogService::new(state.store())
        .create_category(&user, body)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// # Errors
///
/// Returns 403 for non-admins, 400 for invalid or duplicate names and 404
/// for an unknown category.
pub async fn update_category(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<CategoryId>,
    AppJson(body): AppJson<CategoryInput>,
) -> Result<Json<Category>> {
    let category = CatalogService::new(state.store())
        .update_category(&user, id, body)
        .await?;
    Ok(Json(category))
}

/// # Errors
///
/// Returns 403 for non-admins, 400 while the category is in use and 404 for
/// an unknown category.
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<CategoryId>,
) -> Result<Json<MessageResponse>> {
    CatalogService::new(state.store())
        .delete_category(&user, id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Category deleted successfully",
    }))
}

// =============================================================================
// Subcategories
// =============================================================================

/// Subcategories with their parent's name.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list_sub_categories(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Vec<SubCategoryView>>> {
    let subs = CatalogService::new(state.store())
        .list_sub_categories(query.active_only)
        .await?;
    Ok(Json(subs))
}

/// # Errors
///
/// Returns 404 for an unknown subcategory.
pub async fn show_sub_category(
    State(state): State<AppState>,
    AppPath(id): AppPath<SubCategoryId>,
) -> Result<Json<SubCategoryView>> {
    let sub = CatalogService::new(state.store())
        .get_sub_category(id)
        .await?;
    Ok(Json(sub))
}

/// # Errors
///
/// Returns 403 for non-admins and 400 for an unknown parent or a name already
/// used within it.
pub async fn create_sub_category(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<SubCategoryInput>,
) -> Result<(StatusCode, Json<SubCategory>)> {
    let sub = CatalogService::new(state.store())
        .create_sub_category(&user, body)
        .await?;
    Ok((StatusCode::CREATED, Json(sub)))
}

/// # Errors
///
/// As [`create_sub_category`], plus 404 for an unknown subcategory.
pub async fn update_sub_category(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<SubCategoryId>,
    AppJson(body): AppJson<SubCategoryInput>,
) -> Result<Json<SubCategory>> {
    let sub = CatalogService::new(state.store())
        .update_sub_category(&user, id, body)
        .await?;
    Ok(Json(sub))
}

/// # Errors
///
/// Returns 403 for non-admins, 400 while active products use it and 404 for
/// an unknown subcategory.
pub async fn delete_sub_category(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<SubCategoryId>,
) -> Result<Json<MessageResponse>> {
    CatalogService::new(state.store())
        .delete_sub_category(&user, id)
        .await?;
    Ok(Json(MessageResponse {
        message: "SubCategory deleted successfully",
    }))
}
