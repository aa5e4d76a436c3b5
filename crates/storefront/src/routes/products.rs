//! Product route handlers: browsing, search, admin CRUD and likes.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use threadline_core::{CategoryId, CollectionId, Price, ProductId, Size, SubCategoryId};

use crate::error::{AppError, Result};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::RequireAuth;
use crate::models::{
    DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, Product, ProductFilter, ProductInput, ProductSearch,
    ProductSort, ProductView,
};
use crate::services::CatalogService;
use crate::state::AppState;

/// Shared caches may serve the listing for a minute, stale for five more.
const LISTING_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=300";

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index).post(create))
        .route("/products/advanced", get(search))
        .route("/products/{id}", get(show).put(update).delete(remove))
        .route("/products/{id}/like", post(like))
        .route("/users/likes", get(liked))
}

/// Search query string. `sizes` and `colors` are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub category: Option<CategoryId>,
    pub sub_category: Option<SubCategoryId>,
    pub collection: Option<CollectionId>,
    #[serde(default)]
    pub featured: bool,
    pub sizes: Option<String>,
    pub colors: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

impl TryFrom<SearchQuery> for ProductSearch {
    type Error = AppError;

    fn try_from(query: SearchQuery) -> Result<Self> {
        let sizes = split_list(query.sizes.as_deref())
            .map(str::parse::<Size>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let colors = split_list(query.colors.as_deref())
            .map(str::to_owned)
            .collect();
        let limit = match query.limit {
            None | Some(0) => DEFAULT_SEARCH_LIMIT,
            Some(limit) => limit.min(MAX_SEARCH_LIMIT),
        };

        Ok(Self {
            filter: ProductFilter {
                category: query.category,
                sub_category: query.sub_category,
                collection: query.collection,
                featured: query.featured,
            },
            sizes,
            colors,
            min_price: query.min_price,
            max_price: query.max_price,
            text: query.search,
            sort: ProductSort::from_param(query.sort.as_deref()),
            limit,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub message: &'static str,
    pub likes: i32,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Active products, newest first, optionally filtered.
///
/// # Errors
///
/// Returns 408 when the listing exceeds the configured timeout.
pub async fn index(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<ProductFilter>,
) -> Result<Response> {
    let products = CatalogService::new(state.store())
        .list_products(filter, state.config().product_list_timeout)
        .await?;

    Ok(cacheable(products))
}

/// Active products by size, color, price range and text, sorted and
/// capped.
///
/// # Errors
///
/// Returns 400 for an unknown size or malformed price and 408 when the search
/// exceeds the configured timeout.
pub async fn search(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Response> {
    let search = ProductSearch::try_from(query)?;
    let products = CatalogService::new(state.store())
        .search_products(search, state.config().product_list_timeout)
        .await?;

    Ok(cacheable(products))
}

fn cacheable(products: Vec<ProductView>) -> Response {
    let mut response = Json(products).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(LISTING_CACHE_CONTROL),
    );
    response
}

/// One product with its references resolved. Inactive products are still
/// returned.
///
/// # Errors
///
/// Returns 404 for an unknown product.
pub async fn show(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<ProductView>> {
    let product = CatalogService::new(state.store()).get_product(id).await?;
    Ok(Json(product))
}

/// Admin: create a product.
///
/// # Errors
///
/// Returns 403 for non-admins and 400 for invalid fields or references.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<ProductInput>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let product = CatalogService::new(state.store())
        .create_product(&user, body)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Admin: replace a product's fields.
///
/// # Errors
///
/// Returns 403 for non-admins, 400 for invalid input and 404 for an unknown
/// product.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<ProductId>,
    AppJson(body): AppJson<ProductInput>,
) -> Result<Json<ProductView>> {
    let product = CatalogService::new(state.store())
        .update_product(&user, id, body)
        .await?;
    Ok(Json(product))
}

/// Admin: deactivate a product.
///
/// # Errors
///
/// Returns 403 for non-admins and 404 for an unknown product.
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<MessageResponse>> {
    CatalogService::new(state.store())
        .delete_product(&user, id)
        .await?;
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}

/// Like or unlike a product.
///
/// # Errors
///
/// Returns 404 for an unknown product.
pub async fn like(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppPath(id): AppPath<ProductId>,
    AppJson(body): AppJson<LikeRequest>,
) -> Result<Json<LikeResponse>> {
    let outcome = CatalogService::new(state.store())
        .set_like(user.id, id, body.liked)
        .await?;
    Ok(Json(LikeResponse {
        message: if outcome.liked {
            "Product liked"
        } else {
            "Product unliked"
        },
        likes: outcome.likes,
    }))
}

/// Products the caller likes.
///
/// # Errors
///
/// Returns 401 without a session user.
pub async fn liked(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Product>>> {
    let products = CatalogService::new(state.store())
        .liked_products(user.id)
        .await?;
    Ok(Json(products))
}
