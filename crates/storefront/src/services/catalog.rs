//! Catalog administration and browsing.
//!
//! Reads are public. Writes require the admin role and return
//! `AppError::Forbidden` otherwise.

use std::time::Duration;

use rand::Rng;
use tracing::instrument;

use threadline_core::{
    CategoryId, CollectionId, ProductId, SubCategoryId, UserId, seo_slug, sku_prefix,
};

use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};
use crate::models::{
    CatalogRef, Category, CategoryInput, CategoryView, Collection, CollectionFilter,
    CollectionInput, CurrentUser, LikeOutcome, NewProduct, Product, ProductDraft, ProductFilter,
    ProductInput, ProductSearch, ProductView, SubCategory, SubCategoryInput, SubCategoryView,
};

const MAX_PRODUCT_NAME_CHARS: usize = 200;
const MAX_PRODUCT_DESCRIPTION_CHARS: usize = 2000;
const MAX_NODE_NAME_CHARS: usize = 100;
const MAX_NODE_DESCRIPTION_CHARS: usize = 500;

/// Attempts at finding an unused SKU.
const SKU_ATTEMPTS: usize = 5;

fn require_admin(actor: &CurrentUser) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

/// Trimmed, non-empty and at most `max` characters.
fn required_text(value: &str, label: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{label} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{label} cannot be more than {max} characters"
        )));
    }
    Ok(value.to_owned())
}

fn optional_text(value: Option<&String>, label: &str, max: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{label} cannot be more than {max} characters"
        ))),
        _ => Ok(()),
    }
}

fn generate_sku(category_name: Option<&str>) -> String {
    let number: u16 = rand::rng().random_range(1000..10000);
    format!("{}-{number}", sku_prefix(category_name))
}

fn not_found(what: &str) -> AppError {
    AppError::NotFound(format!("{what} not found"))
}

pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Categories ordered by sort order then name, each with its
    /// subcategories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_categories(&self, active_only: bool) -> Result<Vec<CategoryView>> {
        Ok(self.store.list_categories(active_only).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown category.
    pub async fn get_category(&self, id: CategoryId) -> Result<CategoryView> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| not_found("Category"))
    }

    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins, `AppError::Validation`
    /// for bad fields and `AppError::DuplicateName` on a name clash.
    #[instrument(skip(self, actor, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        actor: &CurrentUser,
        input: CategoryInput,
    ) -> Result<Category> {
        require_admin(actor)?;
        let input = Self::check_category(input)?;
        if self.store.category_name_exists(&input.name, None).await? {
            return Err(duplicate_category());
        }

        let category = self
            .store
            .insert_category(&input)
            .await
            .map_err(|e| on_conflict(e, duplicate_category))?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// As [`Self::create_category`], plus `AppError::NotFound` for an unknown
    /// category.
    #[instrument(skip(self, actor, input))]
    pub async fn update_category(
        &self,
        actor: &CurrentUser,
        id: CategoryId,
        input: CategoryInput,
    ) -> Result<Category> {
        require_admin(actor)?;
        let input = Self::check_category(input)?;
        if self.store.category_name_exists(&input.name, Some(id)).await? {
            return Err(duplicate_category());
        }

        self.store
            .update_category(id, &input)
            .await
            .map_err(|e| on_conflict(e, duplicate_category))?
            .ok_or_else(|| not_found("Category"))
    }

    /// Delete a category with no active products and no subcategories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` while anything references the
    /// category and `AppError::NotFound` for an unknown one.
    #[instrument(skip(self, actor))]
    pub async fn delete_category(&self, actor: &CurrentUser, id: CategoryId) -> Result<()> {
        require_admin(actor)?;
        if self
            .store
            .count_active_products(CatalogRef::Category(id))
            .await?
            > 0
        {
            return Err(invalid(
                "Cannot delete category with active products. Deactivate the category instead.",
            ));
        }
        if self.store.count_sub_categories(id).await? > 0 {
            return Err(invalid(
                "Cannot delete category with subcategories. Delete or reassign subcategories first.",
            ));
        }

        let deleted = self.store.delete_category(id).await.map_err(|e| {
            on_conflict(e, || {
                invalid("Cannot delete category while inactive products still use it")
            })
        })?;
        if !deleted {
            return Err(not_found("Category"));
        }
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    fn check_category(mut input: CategoryInput) -> Result<CategoryInput> {
        input.name = required_text(&input.name, "Category name", MAX_NODE_NAME_CHARS)?;
        optional_text(
            input.description.as_ref(),
            "Description",
            MAX_NODE_DESCRIPTION_CHARS,
        )?;
        Ok(input)
    }

    // =========================================================================
    // Subcategories
    // =========================================================================

    /// Subcategories with their parent's name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_sub_categories(&self, active_only: bool) -> Result<Vec<SubCategoryView>> {
        Ok(self.store.list_sub_categories(active_only).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown subcategory.
    pub async fn get_sub_category(&self, id: SubCategoryId) -> Result<SubCategoryView> {
        self.store
            .get_sub_category(id)
            .await?
            .ok_or_else(|| not_found("SubCategory"))
    }

    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins, `AppError::Validation`
    /// for bad fields or an unknown parent and `AppError::DuplicateName` when
    /// the parent already has a subcategory of that name.
    #[instrument(skip(self, actor, input), fields(name = %input.name))]
    pub async fn create_sub_category(
        &self,
        actor: &CurrentUser,
        input: SubCategoryInput,
    ) -> Result<SubCategory> {
        require_admin(actor)?;
        let input = self.check_sub_category(input, None).await?;

        let sub = self
            .store
            .insert_sub_category(&input)
            .await
            .map_err(|e| on_conflict(e, duplicate_sub_category))?;
        tracing::info!(sub_category_id = %sub.id, "SubCategory created");
        Ok(sub)
    }

    /// # Errors
    ///
    /// As [`Self::create_sub_category`], plus `AppError::NotFound` for an
    /// unknown subcategory.
    #[instrument(skip(self, actor, input))]
    pub async fn update_sub_category(
        &self,
        actor: &CurrentUser,
        id: SubCategoryId,
        input: SubCategoryInput,
    ) -> Result<SubCategory> {
        require_admin(actor)?;
        let input = self.check_sub_category(input, Some(id)).await?;

        self.store
            .update_sub_category(id, &input)
            .await
            .map_err(|e| on_conflict(e, duplicate_sub_category))?
            .ok_or_else(|| not_found("SubCategory"))
    }

    /// Delete a subcategory no active product uses. Inactive products keep
    /// their category and lose the subcategory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` while active products reference it and
    /// `AppError::NotFound` for an unknown one.
    #[instrument(skip(self, actor))]
    pub async fn delete_sub_category(&self, actor: &CurrentUser, id: SubCategoryId) -> Result<()> {
        require_admin(actor)?;
        if self
            .store
            .count_active_products(CatalogRef::SubCategory(id))
            .await?
            > 0
        {
            return Err(invalid(
                "Cannot delete subcategory with active products. Deactivate the subcategory instead.",
            ));
        }
        if !self.store.delete_sub_category(id).await? {
            return Err(not_found("SubCategory"));
        }
        tracing::info!(sub_category_id = %id, "SubCategory deleted");
        Ok(())
    }

    async fn check_sub_category(
        &self,
        mut input: SubCategoryInput,
        except: Option<SubCategoryId>,
    ) -> Result<SubCategoryInput> {
        input.name = required_text(&input.name, "SubCategory name", MAX_NODE_NAME_CHARS)?;
        optional_text(
            input.description.as_ref(),
            "Description",
            MAX_NODE_DESCRIPTION_CHARS,
        )?;
        if self.store.get_category(input.category).await?.is_none() {
            return Err(invalid("Category not found"));
        }
        if self
            .store
            .sub_category_name_exists(input.category, &input.name, except)
            .await?
        {
            return Err(duplicate_sub_category());
        }
        Ok(input)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_collections(&self, filter: CollectionFilter) -> Result<Vec<Collection>> {
        Ok(self.store.list_collections(&filter).await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown collection.
    pub async fn get_collection(&self, id: CollectionId) -> Result<Collection> {
        self.store
            .get_collection(id)
            .await?
            .ok_or_else(|| not_found("Collection"))
    }

    /// The year defaults to the current one.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins, `AppError::Validation`
    /// for bad fields and `AppError::DuplicateName` on a name clash.
    #[instrument(skip(self, actor, input), fields(name = %input.name))]
    pub async fn create_collection(
        &self,
        actor: &CurrentUser,
        input: CollectionInput,
    ) -> Result<Collection> {
        require_admin(actor)?;
        let input = self.check_collection(input, None).await?;

        let collection = self
            .store
            .insert_collection(&input, input.resolved_year())
            .await
            .map_err(|e| on_conflict(e, duplicate_collection))?;
        tracing::info!(collection_id = %collection.id, "Collection created");
        Ok(collection)
    }

    /// # Errors
    ///
    /// As [`Self::create_collection`], plus `AppError::NotFound` for an
    /// unknown collection.
    #[instrument(skip(self, actor, input))]
    pub async fn update_collection(
        &self,
        actor: &CurrentUser,
        id: CollectionId,
        input: CollectionInput,
    ) -> Result<Collection> {
        require_admin(actor)?;
        let input = self.check_collection(input, Some(id)).await?;

        self.store
            .update_collection(id, &input, input.resolved_year())
            .await
            .map_err(|e| on_conflict(e, duplicate_collection))?
            .ok_or_else(|| not_found("Collection"))
    }

    /// Delete a collection no active product uses.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` while active products reference it and
    /// `AppError::NotFound` for an unknown one.
    #[instrument(skip(self, actor))]
    pub async fn delete_collection(&self, actor: &CurrentUser, id: CollectionId) -> Result<()> {
        require_admin(actor)?;
        if self
            .store
            .count_active_products(CatalogRef::Collection(id))
            .await?
            > 0
        {
            return Err(invalid(
                "Cannot delete collection with active products. Deactivate the collection instead.",
            ));
        }
        if !self.store.delete_collection(id).await? {
            return Err(not_found("Collection"));
        }
        tracing::info!(collection_id = %id, "Collection deleted");
        Ok(())
    }

    async fn check_collection(
        &self,
        mut input: CollectionInput,
        except: Option<CollectionId>,
    ) -> Result<CollectionInput> {
        input.name = required_text(&input.name, "Collection name", MAX_NODE_NAME_CHARS)?;
        optional_text(
            input.description.as_ref(),
            "Description",
            MAX_NODE_DESCRIPTION_CHARS,
        )?;
        if let (Some(start), Some(end)) = (input.start_date, input.end_date)
            && end < start
        {
            return Err(invalid("End date must be after start date"));
        }
        if self
            .store
            .collection_name_exists(&input.name, except)
            .await?
        {
            return Err(duplicate_collection());
        }
        Ok(input)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Active products matching `filter`, newest first. Gives up after
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` when the read takes longer than `timeout`.
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        timeout: Duration,
    ) -> Result<Vec<ProductView>> {
        bounded(timeout, self.store.list_products(&filter)).await
    }

    /// Active products matching `search`, in its sort order and capped at
    /// its limit. Gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` when the read takes longer than `timeout`.
    #[instrument(skip(self, search), fields(sort = ?search.sort, limit = search.limit))]
    pub async fn search_products(
        &self,
        search: ProductSearch,
        timeout: Duration,
    ) -> Result<Vec<ProductView>> {
        bounded(timeout, self.store.search_products(&search)).await
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown product.
    pub async fn get_product(&self, id: ProductId) -> Result<ProductView> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| not_found("Product"))
    }

    /// Create a product with a generated SKU and SEO slug.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins and `AppError::Validation`
    /// for bad fields, unknown references or when no free SKU is found.
    #[instrument(skip(self, actor, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        actor: &CurrentUser,
        input: ProductInput,
    ) -> Result<ProductView> {
        require_admin(actor)?;
        let (draft, category_name) = self.check_product(input).await?;
        let seo_url = seo_slug(&draft.name);

        let mut new_product = NewProduct {
            sku: generate_sku(category_name.as_deref()),
            seo_url,
            draft,
        };
        let mut attempt = 1;
        let product = loop {
            match self.store.insert_product(&new_product).await {
                Ok(product) => break product,
                Err(RepositoryError::Conflict(_)) if attempt < SKU_ATTEMPTS => {
                    attempt += 1;
                    new_product.sku = generate_sku(category_name.as_deref());
                }
                Err(RepositoryError::Conflict(_)) => {
                    return Err(invalid("Product with this SKU already exists"));
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");
        self.get_product(product.id).await
    }

    /// Replace a product's editable fields. SKU and slug are kept.
    ///
    /// # Errors
    ///
    /// As [`Self::create_product`], plus `AppError::NotFound` for an unknown
    /// product.
    #[instrument(skip(self, actor, input))]
    pub async fn update_product(
        &self,
        actor: &CurrentUser,
        id: ProductId,
        input: ProductInput,
    ) -> Result<ProductView> {
        require_admin(actor)?;
        let (draft, _) = self.check_product(input).await?;

        let product = self
            .store
            .update_product(id, &draft)
            .await?
            .ok_or_else(|| not_found("Product"))?;
        self.get_product(product.id).await
    }

    /// Products are never removed, only deactivated.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown product.
    #[instrument(skip(self, actor))]
    pub async fn delete_product(&self, actor: &CurrentUser, id: ProductId) -> Result<()> {
        require_admin(actor)?;
        if !self.store.deactivate_product(id).await? {
            return Err(not_found("Product"));
        }
        tracing::info!(product_id = %id, "Product deactivated");
        Ok(())
    }

    /// Validate references and field rules. Returns the draft and the
    /// category name for SKU generation.
    async fn check_product(&self, input: ProductInput) -> Result<(ProductDraft, Option<String>)> {
        let name = required_text(&input.name, "Product name", MAX_PRODUCT_NAME_CHARS)?;
        let description = required_text(
            &input.description,
            "Product description",
            MAX_PRODUCT_DESCRIPTION_CHARS,
        )?;

        let category = self
            .store
            .get_category(input.category)
            .await?
            .ok_or_else(|| invalid("Category not found"))?;
        if let Some(sub_id) = input.sub_category {
            let belongs = self
                .store
                .get_sub_category(sub_id)
                .await?
                .is_some_and(|s| s.sub_category.category_id == input.category);
            if !belongs {
                return Err(invalid(
                    "SubCategory not found or does not belong to the selected category",
                ));
            }
        }
        if let Some(collection_id) = input.collection
            && self.store.get_collection(collection_id).await?.is_none()
        {
            return Err(invalid("Collection not found"));
        }

        if !input.price.is_storable() || input.original_price.is_some_and(|p| !p.is_storable()) {
            return Err(invalid("Price is too large"));
        }

        if input.colors.is_empty() {
            return Err(invalid("At least one color is required"));
        }
        if input.colors.iter().any(|c| c.images.is_empty()) {
            return Err(invalid("Each color must have at least one image"));
        }
        let featured_image = input
            .featured_image
            .filter(|f| !f.trim().is_empty())
            .or_else(|| input.colors.first().and_then(|c| c.images.first()).cloned())
            .ok_or_else(|| invalid("At least one product image is required"))?;

        let draft = ProductDraft {
            name,
            description,
            price: input.price,
            original_price: input.original_price,
            category_id: input.category,
            sub_category_id: input.sub_category,
            collection_id: input.collection,
            sizes: input.sizes,
            colors: input.colors,
            featured_image,
            tags: input.tags,
            is_active: input.is_active,
            is_featured: input.is_featured,
            meta_title: input.meta_title,
            meta_description: input.meta_description,
        };
        Ok((draft, Some(category.category.name)))
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Like or unlike. Repeating the same call changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown product.
    #[instrument(skip(self))]
    pub async fn set_like(
        &self,
        user: UserId,
        product: ProductId,
        liked: bool,
    ) -> Result<LikeOutcome> {
        self.store
            .set_like(user, product, liked)
            .await?
            .ok_or_else(|| not_found("Product"))
    }

    /// Products the user likes, most recent like first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn liked_products(&self, user: UserId) -> Result<Vec<Product>> {
        Ok(self.store.liked_products(user).await?)
    }
}

/// Await a product read for at most `timeout`.
async fn bounded(
    timeout: Duration,
    read: impl Future<Output = std::result::Result<Vec<ProductView>, RepositoryError>>,
) -> Result<Vec<ProductView>> {
    match tokio::time::timeout(timeout, read).await {
        Ok(products) => Ok(products?),
        Err(_) => {
            tracing::warn!(?timeout, "Product listing timed out");
            Err(AppError::Timeout)
        }
    }
}

fn duplicate_category() -> AppError {
    AppError::DuplicateName("Category with this name already exists".to_string())
}

fn duplicate_sub_category() -> AppError {
    AppError::DuplicateName("SubCategory with this name already exists in this category".to_string())
}

fn duplicate_collection() -> AppError {
    AppError::DuplicateName("Collection with this name already exists".to_string())
}

/// Map a store conflict to `conflict()`, anything else through the usual
/// conversion.
fn on_conflict(err: RepositoryError, conflict: impl FnOnce() -> AppError) -> AppError {
    match err {
        RepositoryError::Conflict(_) => conflict(),
        other => other.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::response::IntoResponse;
    use rust_decimal::Decimal;
    use threadline_core::{Email, Price, Season, Size, UserRole};

    use super::*;
    use crate::db::MemoryStore;
    use crate::db::memory::tests::seed_product;
    use crate::models::{ColorVariant, SizeStock};

    fn admin() -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: Email::parse("admin@example.com").unwrap(),
            role: UserRole::Admin,
        }
    }

    fn customer() -> CurrentUser {
        CurrentUser {
            id: UserId::new(2),
            email: Email::parse("c@example.com").unwrap(),
            role: UserRole::Customer,
        }
    }

    fn category(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.into(),
            description: None,
            image: None,
            sort_order: 0,
            is_active: true,
        }
    }

    fn collection(name: &str) -> CollectionInput {
        CollectionInput {
            name: name.into(),
            description: None,
            image: None,
            season: Season::Summer,
            year: None,
            is_active: true,
            is_featured: false,
            start_date: None,
            end_date: None,
        }
    }

    fn product(category: CategoryId) -> ProductInput {
        ProductInput {
            name: "Linen Shirt (Slim Fit)".into(),
            description: "Breathable".into(),
            price: Price::new(Decimal::new(4900, 2)).unwrap(),
            original_price: None,
            category,
            sub_category: None,
            collection: None,
            sizes: vec![SizeStock {
                size: Size::M,
                stock: 4,
            }],
            colors: vec![ColorVariant {
                name: "White".into(),
                hex: "#ffffff".into(),
                images: vec!["white-front.jpg".into(), "white-back.jpg".into()],
            }],
            featured_image: None,
            tags: vec!["linen".into()],
            is_active: true,
            is_featured: false,
            meta_title: None,
            meta_description: None,
        }
    }

    #[test]
    fn test_generated_sku_shape() {
        let sku = generate_sku(Some("Dresses"));
        let (prefix, number) = sku.split_once('-').unwrap();
        assert_eq!(prefix, "DRE");
        assert!((1000..10000).contains(&number.parse::<u16>().unwrap()));
        assert!(generate_sku(None).starts_with("GEN-"));
    }

    #[tokio::test]
    async fn test_writes_require_admin() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);

        let err = service
            .create_category(&customer(), category("Shirts"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(service.list_categories(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_names_clash_case_insensitively() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let shirts = service
            .create_category(&admin(), category(" Shirts "))
            .await
            .unwrap();
        assert_eq!(shirts.name, "Shirts");

        let err = service
            .create_category(&admin(), category("SHIRTS"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateName(_)));

        // Renaming to its own name is fine.
        service
            .update_category(&admin(), shirts.id, category("shirts"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_category_delete_guards() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 1)]).await;

        let err = service
            .delete_category(&admin(), product.category_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("active products")));

        service.delete_product(&admin(), product.id).await.unwrap();
        let sub = service
            .create_sub_category(
                &admin(),
                SubCategoryInput {
                    name: "Oxford".into(),
                    category: product.category_id,
                    description: None,
                    image: None,
                    sort_order: 0,
                    is_active: true,
                },
            )
            .await
            .unwrap();
        let err = service
            .delete_category(&admin(), product.category_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("subcategories")));

        service.delete_sub_category(&admin(), sub.id).await.unwrap();
        assert!(matches!(
            service.delete_sub_category(&admin(), sub.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sub_category_needs_existing_parent() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let err = service
            .create_sub_category(
                &admin(),
                SubCategoryInput {
                    name: "Oxford".into(),
                    category: CategoryId::new(99),
                    description: None,
                    image: None,
                    sort_order: 0,
                    is_active: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Category not found"));
    }

    #[tokio::test]
    async fn test_collection_year_defaults_and_names_clash() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let summer = service
            .create_collection(&admin(), collection("Summer Edit"))
            .await
            .unwrap();
        assert_eq!(summer.year, collection("x").resolved_year());

        assert!(matches!(
            service
                .create_collection(&admin(), collection("summer edit"))
                .await,
            Err(AppError::DuplicateName(_))
        ));

        let listed = service
            .list_collections(CollectionFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_create_product_derives_identifiers() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let shirts = service
            .create_category(&admin(), category("Shirts"))
            .await
            .unwrap();

        let view = service
            .create_product(&admin(), product(shirts.id))
            .await
            .unwrap();
        assert!(view.product.sku.starts_with("SHI-"));
        assert_eq!(view.product.seo_url, "linen-shirt-slim-fit");
        assert_eq!(view.product.featured_image.as_deref(), Some("white-front.jpg"));
        assert_eq!(view.category_name.as_deref(), Some("Shirts"));
    }

    #[tokio::test]
    async fn test_product_reference_and_image_rules() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let shirts = service
            .create_category(&admin(), category("Shirts"))
            .await
            .unwrap();

        let err = service
            .create_product(&admin(), product(CategoryId::new(99)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Category not found"));

        let mut foreign_sub = product(shirts.id);
        foreign_sub.sub_category = Some(SubCategoryId::new(99));
        let err = service
            .create_product(&admin(), foreign_sub)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("SubCategory not found")));

        let mut no_colors = product(shirts.id);
        no_colors.colors.clear();
        let err = service.create_product(&admin(), no_colors).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "At least one color is required"));

        let mut bare_color = product(shirts.id);
        bare_color.colors[0].images.clear();
        let err = service.create_product(&admin(), bare_color).await.unwrap_err();
        assert!(
            matches!(err, AppError::Validation(ref m) if m == "Each color must have at least one image")
        );
    }

    #[tokio::test]
    async fn test_prices_beyond_storage_rejected() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let shirts = service
            .create_category(&admin(), category("Shirts"))
            .await
            .unwrap();

        let mut pricey = product(shirts.id);
        pricey.price = Price::new(Decimal::new(10_000_000_000, 0)).unwrap();
        let err = service.create_product(&admin(), pricey).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Price is too large"));

        let mut was_pricey = product(shirts.id);
        was_pricey.original_price = Some(Price::new(Decimal::MAX).unwrap());
        let err = service.create_product(&admin(), was_pricey).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Price is too large"));

        let mut at_limit = product(shirts.id);
        at_limit.price = Price::MAX_STORED;
        at_limit.sizes.push(SizeStock {
            size: Size::L,
            stock: 2,
        });
        let view = service.create_product(&admin(), at_limit).await.unwrap();
        assert_eq!(view.product.price, Price::MAX_STORED);
    }

    #[tokio::test]
    async fn test_deleted_products_leave_listing() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 1)]).await;
        let timeout = Duration::from_secs(5);

        assert_eq!(
            service
                .list_products(ProductFilter::default(), timeout)
                .await
                .unwrap()
                .len(),
            1
        );
        service.delete_product(&admin(), product.id).await.unwrap();
        assert!(
            service
                .list_products(ProductFilter::default(), timeout)
                .await
                .unwrap()
                .is_empty()
        );
        // Still reachable directly.
        assert!(!service.get_product(product.id).await.unwrap().product.is_active);
    }

    #[tokio::test]
    async fn test_slow_listing_times_out() {
        let store = MemoryStore::new().with_listing_latency(Duration::from_millis(200));
        seed_product(&store, "SHI-0001", &[(Size::M, 1)]).await;
        let service = CatalogService::new(&store);

        let err = service
            .list_products(ProductFilter::default(), Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout));
        assert_eq!(
            err.into_response().status(),
            axum::http::StatusCode::REQUEST_TIMEOUT
        );

        let err = service
            .search_products(ProductSearch::default(), Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout));

        // Given enough time the same store answers.
        let found = service
            .search_products(ProductSearch::default(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_likes_are_idempotent() {
        let store = MemoryStore::new();
        let service = CatalogService::new(&store);
        let product = seed_product(&store, "SHI-0001", &[(Size::M, 1)]).await;
        let user = UserId::new(5);

        assert_eq!(service.set_like(user, product.id, true).await.unwrap().likes, 1);
        assert_eq!(service.set_like(user, product.id, true).await.unwrap().likes, 1);
        assert_eq!(service.liked_products(user).await.unwrap().len(), 1);
        assert_eq!(service.set_like(user, product.id, false).await.unwrap().likes, 0);
        assert_eq!(service.set_like(user, product.id, false).await.unwrap().likes, 0);

        assert!(matches!(
            service.set_like(user, ProductId::new(999), true).await,
            Err(AppError::NotFound(_))
        ));
    }
}
