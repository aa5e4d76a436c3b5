//! Catalog queries: categories, subcategories, collections, products, likes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;

use threadline_core::{
    CategoryId, CollectionId, Price, ProductId, Season, Size, SubCategoryId, UserId,
};

use super::{PgStore, still_referenced, unique_violation};
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{
    CatalogRef, Category, CategoryInput, CategoryView, Collection, CollectionFilter,
    CollectionInput, ColorVariant, LikeOutcome, NewProduct, Product, ProductDraft, ProductFilter,
    ProductSearch, ProductSort, ProductView, SizeStock, SubCategory, SubCategoryInput,
    SubCategoryView,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
    image: Option<String>,
    sort_order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image,
            sort_order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubCategoryRow {
    id: SubCategoryId,
    name: String,
    category_id: CategoryId,
    description: Option<String>,
    image: Option<String>,
    sort_order: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubCategoryRow> for SubCategory {
    fn from(row: SubCategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category_id: row.category_id,
            description: row.description,
            image: row.image,
            sort_order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubCategoryViewRow {
    #[sqlx(flatten)]
    sub_category: SubCategoryRow,
    category_name: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct CollectionRow {
    id: CollectionId,
    name: String,
    description: Option<String>,
    image: Option<String>,
    season: Season,
    year: i32,
    is_active: bool,
    is_featured: bool,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CollectionRow> for Collection {
    fn from(row: CollectionRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image,
            season: row.season,
            year: row.year,
            is_active: row.is_active,
            is_featured: row.is_featured,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Price,
    original_price: Option<Price>,
    category_id: CategoryId,
    sub_category_id: Option<SubCategoryId>,
    collection_id: Option<CollectionId>,
    sizes: Json<Vec<SizeStock>>,
    colors: Json<Vec<ColorVariant>>,
    featured_image: Option<String>,
    likes: i32,
    tags: Vec<String>,
    is_active: bool,
    is_featured: bool,
    sku: String,
    seo_url: String,
    meta_title: Option<String>,
    meta_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            original_price: row.original_price,
            category_id: row.category_id,
            sub_category_id: row.sub_category_id,
            collection_id: row.collection_id,
            sizes: row.sizes.0,
            colors: row.colors.0,
            featured_image: row.featured_image,
            likes: row.likes,
            tags: row.tags,
            is_active: row.is_active,
            is_featured: row.is_featured,
            sku: row.sku,
            seo_url: row.seo_url,
            meta_title: row.meta_title,
            meta_description: row.meta_description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductViewRow {
    #[sqlx(flatten)]
    product: ProductRow,
    category_name: Option<String>,
    sub_category_name: Option<String>,
    collection_name: Option<String>,
}

impl From<ProductViewRow> for ProductView {
    fn from(row: ProductViewRow) -> Self {
        Self {
            product: row.product.into(),
            category_name: row.category_name,
            sub_category_name: row.sub_category_name,
            collection_name: row.collection_name,
        }
    }
}

const CATEGORY_COLUMNS: &str =
    "id, name, description, image, sort_order, is_active, created_at, updated_at";

const SUB_CATEGORY_COLUMNS: &str = "s.id, s.name, s.category_id, s.description, s.image, \
     s.sort_order, s.is_active, s.created_at, s.updated_at";

const COLLECTION_COLUMNS: &str = "id, name, description, image, season, year, is_active, \
     is_featured, start_date, end_date, created_at, updated_at";

pub(super) const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, \
     p.original_price, p.category_id, p.sub_category_id, p.collection_id, p.sizes, p.colors, \
     p.featured_image, p.likes, p.tags, p.is_active, p.is_featured, p.sku, p.seo_url, \
     p.meta_title, p.meta_description, p.created_at, p.updated_at";

const PRODUCT_VIEW_FROM: &str = r"
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN sub_categories s ON s.id = p.sub_category_id
    LEFT JOIN collections k ON k.id = p.collection_id
";

fn product_view_select() -> String {
    format!(
        "SELECT {PRODUCT_COLUMNS}, c.name AS category_name, s.name AS sub_category_name, \
         k.name AS collection_name {PRODUCT_VIEW_FROM}"
    )
}

// =============================================================================
// Queries
// =============================================================================

impl PgStore {
    async fn sub_categories_of(
        &self,
        categories: &[CategoryId],
        active_only: bool,
    ) -> Result<HashMap<CategoryId, Vec<SubCategory>>, RepositoryError> {
        let raw: Vec<i32> = categories.iter().map(CategoryId::as_i32).collect();
        let rows = sqlx::query_as::<_, SubCategoryRow>(&format!(
            r"
            SELECT {SUB_CATEGORY_COLUMNS}
            FROM sub_categories s
            WHERE s.category_id = ANY($1) AND (NOT $2 OR s.is_active)
            ORDER BY s.sort_order, s.name
            "
        ))
        .bind(&raw)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<CategoryId, Vec<SubCategory>> = HashMap::new();
        for row in rows {
            grouped.entry(row.category_id).or_default().push(row.into());
        }
        Ok(grouped)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    async fn list_categories(&self, active_only: bool) -> Result<Vec<CategoryView>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            r"
            SELECT {CATEGORY_COLUMNS}
            FROM categories
            WHERE NOT $1 OR is_active
            ORDER BY sort_order, name
            "
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<CategoryId> = rows.iter().map(|r| r.id).collect();
        let mut subs = self.sub_categories_of(&ids, active_only).await?;

        Ok(rows
            .into_iter()
            .map(|row| CategoryView {
                sub_categories: subs.remove(&row.id).unwrap_or_default(),
                category: row.into(),
            })
            .collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryView>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut subs = self.sub_categories_of(&[id], false).await?;
        Ok(Some(CategoryView {
            sub_categories: subs.remove(&id).unwrap_or_default(),
            category: row.into(),
        }))
    }

    async fn category_name_exists(
        &self,
        name: &str,
        except: Option<CategoryId>,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM categories
                WHERE lower(name) = lower($1) AND ($2::int IS NULL OR id <> $2)
            )
            ",
        )
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_category(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r"
            INSERT INTO categories (name, description, image, sort_order, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "category"))?;

        Ok(row.into())
    }

    async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            r"
            UPDATE categories
            SET name = $2, description = $3, image = $4, sort_order = $5, is_active = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "category"))?;

        Ok(row.map(Into::into))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| still_referenced(e, "category"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_sub_categories(&self, category: CategoryId) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sub_categories WHERE category_id = $1")
                .bind(category)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Subcategories
    // -------------------------------------------------------------------------

    async fn list_sub_categories(
        &self,
        active_only: bool,
    ) -> Result<Vec<SubCategoryView>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubCategoryViewRow>(&format!(
            r"
            SELECT {SUB_CATEGORY_COLUMNS}, c.name AS category_name
            FROM sub_categories s
            LEFT JOIN categories c ON c.id = s.category_id
            WHERE NOT $1 OR s.is_active
            ORDER BY s.sort_order, s.name
            "
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| SubCategoryView {
                sub_category: r.sub_category.into(),
                category_name: r.category_name,
            })
            .collect())
    }

    async fn get_sub_category(
        &self,
        id: SubCategoryId,
    ) -> Result<Option<SubCategoryView>, RepositoryError> {
        let row = sqlx::query_as::<_, SubCategoryViewRow>(&format!(
            r"
            SELECT {SUB_CATEGORY_COLUMNS}, c.name AS category_name
            FROM sub_categories s
            LEFT JOIN categories c ON c.id = s.category_id
            WHERE s.id = $1
            "
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| SubCategoryView {
            sub_category: r.sub_category.into(),
            category_name: r.category_name,
        }))
    }

    async fn sub_category_name_exists(
        &self,
        category: CategoryId,
        name: &str,
        except: Option<SubCategoryId>,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM sub_categories
                WHERE category_id = $1 AND lower(name) = lower($2)
                  AND ($3::int IS NULL OR id <> $3)
            )
            ",
        )
        .bind(category)
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_sub_category(
        &self,
        input: &SubCategoryInput,
    ) -> Result<SubCategory, RepositoryError> {
        let row = sqlx::query_as::<_, SubCategoryRow>(&format!(
            r"
            INSERT INTO sub_categories AS s
                (name, category_id, description, image, sort_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SUB_CATEGORY_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(input.category)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "subcategory"))?;

        Ok(row.into())
    }

    async fn update_sub_category(
        &self,
        id: SubCategoryId,
        input: &SubCategoryInput,
    ) -> Result<Option<SubCategory>, RepositoryError> {
        let row = sqlx::query_as::<_, SubCategoryRow>(&format!(
            r"
            UPDATE sub_categories s
            SET name = $2, category_id = $3, description = $4, image = $5, sort_order = $6,
                is_active = $7, updated_at = NOW()
            WHERE s.id = $1
            RETURNING {SUB_CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.category)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "subcategory"))?;

        Ok(row.map(Into::into))
    }

    async fn delete_sub_category(&self, id: SubCategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sub_categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------------

    async fn list_collections(
        &self,
        filter: &CollectionFilter,
    ) -> Result<Vec<Collection>, RepositoryError> {
        let rows = sqlx::query_as::<_, CollectionRow>(&format!(
            r"
            SELECT {COLLECTION_COLUMNS}
            FROM collections
            WHERE (NOT $1 OR is_active)
              AND (NOT $2 OR is_featured)
              AND ($3::season IS NULL OR season = $3)
            ORDER BY is_featured DESC, year DESC, name
            "
        ))
        .bind(filter.active_only)
        .bind(filter.featured)
        .bind(filter.season)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn collection_name_exists(
        &self,
        name: &str,
        except: Option<CollectionId>,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM collections
                WHERE lower(name) = lower($1) AND ($2::int IS NULL OR id <> $2)
            )
            ",
        )
        .bind(name)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_collection(
        &self,
        input: &CollectionInput,
        year: i32,
    ) -> Result<Collection, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            r"
            INSERT INTO collections
                (name, description, image, season, year, is_active, is_featured,
                 start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLLECTION_COLUMNS}
            "
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.season)
        .bind(year)
        .bind(input.is_active)
        .bind(input.is_featured)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "collection"))?;

        Ok(row.into())
    }

    async fn update_collection(
        &self,
        id: CollectionId,
        input: &CollectionInput,
        year: i32,
    ) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, CollectionRow>(&format!(
            r"
            UPDATE collections
            SET name = $2, description = $3, image = $4, season = $5, year = $6,
                is_active = $7, is_featured = $8, start_date = $9, end_date = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLLECTION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.image)
        .bind(input.season)
        .bind(year)
        .bind(input.is_active)
        .bind(input.is_featured)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "collection"))?;

        Ok(row.map(Into::into))
    }

    async fn delete_collection(&self, id: CollectionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_active_products(&self, node: CatalogRef) -> Result<i64, RepositoryError> {
        let (column, id) = match node {
            CatalogRef::Category(id) => ("category_id", id.as_i32()),
            CatalogRef::SubCategory(id) => ("sub_category_id", id.as_i32()),
            CatalogRef::Collection(id) => ("collection_id", id.as_i32()),
        };
        let count = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM products WHERE is_active AND {column} = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductView>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductViewRow>(&format!(
            r"
            {select}
            WHERE p.is_active
              AND ($1::int IS NULL OR p.category_id = $1)
              AND ($2::int IS NULL OR p.sub_category_id = $2)
              AND ($3::int IS NULL OR p.collection_id = $3)
              AND (NOT $4 OR p.is_featured)
            ORDER BY p.created_at DESC, p.id DESC
            ",
            select = product_view_select()
        ))
        .bind(filter.category)
        .bind(filter.sub_category)
        .bind(filter.collection)
        .bind(filter.featured)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search_products(
        &self,
        search: &ProductSearch,
    ) -> Result<Vec<ProductView>, RepositoryError> {
        let order_by = match search.sort {
            ProductSort::Newest => "p.created_at DESC, p.id DESC",
            ProductSort::PriceLow => "p.price ASC, p.created_at DESC, p.id DESC",
            ProductSort::PriceHigh => "p.price DESC, p.created_at DESC, p.id DESC",
            ProductSort::Name => "lower(p.name) ASC, p.created_at DESC, p.id DESC",
        };
        let sizes: Vec<&str> = search.sizes.iter().map(Size::as_str).collect();

        let rows = sqlx::query_as::<_, ProductViewRow>(&format!(
            r"
            {select}
            WHERE p.is_active
              AND ($1::int IS NULL OR p.category_id = $1)
              AND ($2::int IS NULL OR p.sub_category_id = $2)
              AND ($3::int IS NULL OR p.collection_id = $3)
              AND (NOT $4 OR p.is_featured)
              AND (cardinality($5::text[]) = 0 OR EXISTS (
                    SELECT 1 FROM jsonb_array_elements(p.sizes) e
                    WHERE e->>'size' = ANY($5)))
              AND (cardinality($6::text[]) = 0 OR EXISTS (
                    SELECT 1 FROM jsonb_array_elements(p.colors) e
                    WHERE lower(e->>'name') = ANY($6)))
              AND ($7::numeric IS NULL OR p.price >= $7)
              AND ($8::numeric IS NULL OR p.price <= $8)
              AND ($9::text IS NULL
                   OR strpos(lower(p.name), $9) > 0
                   OR strpos(lower(p.description), $9) > 0
                   OR EXISTS (SELECT 1 FROM unnest(p.tags) t WHERE strpos(lower(t), $9) > 0))
            ORDER BY {order_by}
            LIMIT $10
            ",
            select = product_view_select()
        ))
        .bind(search.filter.category)
        .bind(search.filter.sub_category)
        .bind(search.filter.collection)
        .bind(search.filter.featured)
        .bind(&sizes)
        .bind(search.color_keys())
        .bind(search.min_price)
        .bind(search.max_price)
        .bind(search.needle())
        .bind(i64::from(search.limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductView>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductViewRow>(&format!(
            "{select} WHERE p.id = $1",
            select = product_view_select()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ANY($1)"
        ))
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.id, Product::from(row)))
            .collect())
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let draft = &product.draft;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO products AS p
                (name, description, price, original_price, category_id, sub_category_id,
                 collection_id, sizes, colors, featured_image, tags, is_active, is_featured,
                 sku, seo_url, meta_title, meta_description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.original_price)
        .bind(draft.category_id)
        .bind(draft.sub_category_id)
        .bind(draft.collection_id)
        .bind(Json(&draft.sizes))
        .bind(Json(&draft.colors))
        .bind(&draft.featured_image)
        .bind(&draft.tags)
        .bind(draft.is_active)
        .bind(draft.is_featured)
        .bind(&product.sku)
        .bind(&product.seo_url)
        .bind(&draft.meta_title)
        .bind(&draft.meta_description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "sku"))?;

        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE products p
            SET name = $2, description = $3, price = $4, original_price = $5,
                category_id = $6, sub_category_id = $7, collection_id = $8, sizes = $9,
                colors = $10, featured_image = $11, tags = $12, is_active = $13,
                is_featured = $14, meta_title = $15, meta_description = $16,
                updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.original_price)
        .bind(draft.category_id)
        .bind(draft.sub_category_id)
        .bind(draft.collection_id)
        .bind(Json(&draft.sizes))
        .bind(Json(&draft.colors))
        .bind(&draft.featured_image)
        .bind(&draft.tags)
        .bind(draft.is_active)
        .bind(draft.is_featured)
        .bind(&draft.meta_title)
        .bind(&draft.meta_description)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn deactivate_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Likes
    // -------------------------------------------------------------------------

    async fn set_like(
        &self,
        user: UserId,
        product: ProductId,
        liked: bool,
    ) -> Result<Option<LikeOutcome>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, i32>("SELECT likes FROM products WHERE id = $1 FOR UPDATE")
            .bind(product)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(mut likes) = exists else {
            return Ok(None);
        };

        let changed = if liked {
            sqlx::query(
                r"
                INSERT INTO product_likes (user_id, product_id) VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
        } else {
            sqlx::query("DELETE FROM product_likes WHERE user_id = $1 AND product_id = $2")
        }
        .bind(user)
        .bind(product)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if changed {
            likes = sqlx::query_scalar::<_, i32>(
                r"
                UPDATE products SET likes = GREATEST(likes + $2, 0)
                WHERE id = $1
                RETURNING likes
                ",
            )
            .bind(product)
            .bind(if liked { 1_i32 } else { -1 })
            .fetch_one(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(LikeOutcome { liked, likes }))
    }

    async fn liked_products(&self, user: UserId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM product_likes l
            JOIN products p ON p.id = l.product_id
            WHERE l.user_id = $1
            ORDER BY l.created_at DESC
            "
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
