//! Catalog records: products, categories, subcategories and collections.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use threadline_core::{CategoryId, CollectionId, Price, ProductId, Season, Size, SubCategoryId};

const fn default_true() -> bool {
    true
}

// =============================================================================
// Products
// =============================================================================

/// Stock on hand for one size of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeStock {
    pub size: Size,
    #[serde(default)]
    pub stock: u32,
}

/// A color a product comes in, with its gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorVariant {
    pub name: String,
    pub hex: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A persisted product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub original_price: Option<Price>,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub collection_id: Option<CollectionId>,
    pub sizes: Vec<SizeStock>,
    pub colors: Vec<ColorVariant>,
    pub featured_image: Option<String>,
    pub likes: i32,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub sku: String,
    pub seo_url: String,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock for `size`, or `None` when the product is not offered in it.
    #[must_use]
    pub fn stock_for(&self, size: Size) -> Option<u32> {
        self.sizes.iter().find(|s| s.size == size).map(|s| s.stock)
    }
}

/// Product with its category, subcategory and collection names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub sub_category_name: Option<String>,
    pub collection_name: Option<String>,
}

/// Request body for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    pub category: CategoryId,
    #[serde(default)]
    pub sub_category: Option<SubCategoryId>,
    #[serde(default)]
    pub collection: Option<CollectionId>,
    #[serde(default)]
    pub sizes: Vec<SizeStock>,
    #[serde(default)]
    pub colors: Vec<ColorVariant>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
}

/// Validated product fields, ready to persist.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub original_price: Option<Price>,
    pub category_id: CategoryId,
    pub sub_category_id: Option<SubCategoryId>,
    pub collection_id: Option<CollectionId>,
    pub sizes: Vec<SizeStock>,
    pub colors: Vec<ColorVariant>,
    pub featured_image: String,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// A draft plus the identifiers generated once at creation.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub draft: ProductDraft,
    pub sku: String,
    pub seo_url: String,
}

/// Product listing filter. Only active products are ever listed.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<CategoryId>,
    pub sub_category: Option<SubCategoryId>,
    pub collection: Option<CollectionId>,
    #[serde(default)]
    pub featured: bool,
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        product.is_active
            && self.category.is_none_or(|c| product.category_id == c)
            && self
                .sub_category
                .is_none_or(|s| product.sub_category_id == Some(s))
            && self
                .collection
                .is_none_or(|c| product.collection_id == Some(c))
            && (!self.featured || product.is_featured)
    }
}

/// Order of search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    Name,
}

impl ProductSort {
    /// Unknown or missing values sort newest first.
    #[must_use]
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            Some("price-low") => Self::PriceLow,
            Some("price-high") => Self::PriceHigh,
            Some("name") => Self::Name,
            _ => Self::Newest,
        }
    }
}

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: u32 = 100;

/// Most search results one request may ask for.
pub const MAX_SEARCH_LIMIT: u32 = 500;

/// Product search: the listing filter plus size, color, price and text
/// criteria. Empty lists and `None` bounds match everything.
#[derive(Debug, Clone)]
pub struct ProductSearch {
    pub filter: ProductFilter,
    /// Products offered in any of these sizes.
    pub sizes: Vec<Size>,
    /// Products coming in any of these colors, compared case-insensitively.
    pub colors: Vec<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    /// Case-insensitive substring of the name, description or a tag.
    pub text: Option<String>,
    pub sort: ProductSort,
    pub limit: u32,
}

impl Default for ProductSearch {
    fn default() -> Self {
        Self {
            filter: ProductFilter::default(),
            sizes: Vec::new(),
            colors: Vec::new(),
            min_price: None,
            max_price: None,
            text: None,
            sort: ProductSort::default(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl ProductSearch {
    /// Lowercase search text, `None` when blank.
    #[must_use]
    pub fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// Lowercase color names.
    #[must_use]
    pub fn color_keys(&self) -> Vec<String> {
        self.colors.iter().map(|c| c.trim().to_lowercase()).collect()
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let colors = self.color_keys();
        let needle = self.needle();

        self.filter.matches(product)
            && (self.sizes.is_empty()
                || product.sizes.iter().any(|s| self.sizes.contains(&s.size)))
            && (colors.is_empty()
                || product
                    .colors
                    .iter()
                    .any(|c| colors.contains(&c.name.to_lowercase())))
            && self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
            && needle.is_none_or(|needle| {
                product.name.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
                    || product
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(&needle))
            })
    }
}

/// Like counter after a like/unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes: i32,
}

/// A catalog node that products can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogRef {
    Category(CategoryId),
    SubCategory(SubCategoryId),
    Collection(CollectionId),
}

impl CatalogRef {
    #[must_use]
    pub fn is_referenced_by(&self, product: &Product) -> bool {
        match *self {
            Self::Category(id) => product.category_id == id,
            Self::SubCategory(id) => product.sub_category_id == Some(id),
            Self::Collection(id) => product.collection_id == Some(id),
        }
    }
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with its subcategories.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: Category,
    pub sub_categories: Vec<SubCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

// =============================================================================
// Subcategories
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub name: String,
    pub category_id: CategoryId,
    pub description: Option<String>,
    pub image: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subcategory with its parent's name.
#[derive(Debug, Clone, Serialize)]
pub struct SubCategoryView {
    #[serde(flatten)]
    pub sub_category: SubCategory,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubCategoryInput {
    pub name: String,
    pub category: CategoryId,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

// =============================================================================
// Collections
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub season: Season,
    pub year: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub season: Season,
    /// Defaults to the current year.
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl CollectionInput {
    /// The submitted year, or the current one.
    #[must_use]
    pub fn resolved_year(&self) -> i32 {
        self.year.unwrap_or_else(|| Utc::now().year())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CollectionFilter {
    #[serde(default = "default_true")]
    pub active_only: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub season: Option<Season>,
}

impl Default for CollectionFilter {
    fn default() -> Self {
        Self {
            active_only: true,
            featured: false,
            season: None,
        }
    }
}

impl CollectionFilter {
    #[must_use]
    pub fn matches(&self, collection: &Collection) -> bool {
        (!self.active_only || collection.is_active)
            && (!self.featured || collection.is_featured)
            && self.season.is_none_or(|s| collection.season == s)
    }
}
