use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;

use threadline_core::{CategoryId, CollectionId, ProductId, SubCategoryId, UserId};

use super::{MemoryState, MemoryStore};
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{
    CatalogRef, Category, CategoryInput, CategoryView, Collection, CollectionFilter,
    CollectionInput, LikeOutcome, NewProduct, Product, ProductDraft, ProductFilter, ProductSearch,
    ProductSort, ProductView, SubCategory, SubCategoryInput, SubCategoryView,
};

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn conflict(what: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("{what} already exists"))
}

impl MemoryState {
    fn sub_categories_of(&self, category: CategoryId, active_only: bool) -> Vec<SubCategory> {
        let mut subs: Vec<SubCategory> = self
            .sub_categories
            .values()
            .filter(|s| s.category_id == category && (!active_only || s.is_active))
            .cloned()
            .collect();
        subs.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
        subs
    }

    fn category_view(&self, category: &Category, active_only: bool) -> CategoryView {
        CategoryView {
            category: category.clone(),
            sub_categories: self.sub_categories_of(category.id, active_only),
        }
    }

    fn sub_category_view(&self, sub: &SubCategory) -> SubCategoryView {
        SubCategoryView {
            sub_category: sub.clone(),
            category_name: self.categories.get(&sub.category_id).map(|c| c.name.clone()),
        }
    }

    fn product_view(&self, product: &Product) -> ProductView {
        ProductView {
            product: product.clone(),
            category_name: self.categories.get(&product.category_id).map(|c| c.name.clone()),
            sub_category_name: product
                .sub_category_id
                .and_then(|id| self.sub_categories.get(&id))
                .map(|s| s.name.clone()),
            collection_name: product
                .collection_id
                .and_then(|id| self.collections.get(&id))
                .map(|c| c.name.clone()),
        }
    }

    fn category_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| Some(c.id) != except && same_name(&c.name, name))
    }

    fn sub_category_taken(
        &self,
        category: CategoryId,
        name: &str,
        except: Option<SubCategoryId>,
    ) -> bool {
        self.sub_categories.values().any(|s| {
            Some(s.id) != except && s.category_id == category && same_name(&s.name, name)
        })
    }

    fn collection_taken(&self, name: &str, except: Option<CollectionId>) -> bool {
        self.collections
            .values()
            .any(|c| Some(c.id) != except && same_name(&c.name, name))
    }
}

fn apply_draft(product: &mut Product, draft: &ProductDraft) {
    product.name.clone_from(&draft.name);
    product.description.clone_from(&draft.description);
    product.price = draft.price;
    product.original_price = draft.original_price;
    product.category_id = draft.category_id;
    product.sub_category_id = draft.sub_category_id;
    product.collection_id = draft.collection_id;
    product.sizes.clone_from(&draft.sizes);
    product.colors.clone_from(&draft.colors);
    product.featured_image = Some(draft.featured_image.clone());
    product.tags.clone_from(&draft.tags);
    product.is_active = draft.is_active;
    product.is_featured = draft.is_featured;
    product.meta_title.clone_from(&draft.meta_title);
    product.meta_description.clone_from(&draft.meta_description);
}

#[async_trait]
impl CatalogStore for MemoryStore {
    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    async fn list_categories(&self, active_only: bool) -> Result<Vec<CategoryView>, RepositoryError> {
        let state = self.state.read().await;
        let mut categories: Vec<&Category> = state
            .categories
            .values()
            .filter(|c| !active_only || c.is_active)
            .collect();
        categories.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));

        Ok(categories
            .into_iter()
            .map(|c| state.category_view(c, active_only))
            .collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<CategoryView>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .categories
            .get(&id)
            .map(|c| state.category_view(c, false)))
    }

    async fn category_name_exists(
        &self,
        name: &str,
        except: Option<CategoryId>,
    ) -> Result<bool, RepositoryError> {
        Ok(self.state.read().await.category_taken(name, except))
    }

    async fn insert_category(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let mut state = self.state.write().await;
        if state.category_taken(&input.name, None) {
            return Err(conflict("category"));
        }

        let now = Utc::now();
        let category = Category {
            id: CategoryId::new(state.next_id()),
            name: input.name.clone(),
            description: input.description.clone(),
            image: input.image.clone(),
            sort_order: input.sort_order,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Option<Category>, RepositoryError> {
        let mut state = self.state.write().await;
        if state.category_taken(&input.name, Some(id)) {
            return Err(conflict("category"));
        }

        Ok(state.categories.get_mut(&id).map(|c| {
            c.name.clone_from(&input.name);
            c.description.clone_from(&input.description);
            c.image.clone_from(&input.image);
            c.sort_order = input.sort_order;
            c.is_active = input.is_active;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let referenced = state.sub_categories.values().any(|s| s.category_id == id)
            || state.products.values().any(|p| p.category_id == id);
        if referenced {
            return Err(RepositoryError::Conflict(
                "category is still referenced".to_owned(),
            ));
        }
        Ok(state.categories.remove(&id).is_some())
    }

    async fn count_sub_categories(&self, category: CategoryId) -> Result<i64, RepositoryError> {
        let state = self.state.read().await;
        let count = state
            .sub_categories
            .values()
            .filter(|s| s.category_id == category)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    // -------------------------------------------------------------------------
    // Subcategories
    // -------------------------------------------------------------------------

    async fn list_sub_categories(
        &self,
        active_only: bool,
    ) -> Result<Vec<SubCategoryView>, RepositoryError> {
        let state = self.state.read().await;
        let mut subs: Vec<&SubCategory> = state
            .sub_categories
            .values()
            .filter(|s| !active_only || s.is_active)
            .collect();
        subs.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));

        Ok(subs.into_iter().map(|s| state.sub_category_view(s)).collect())
    }

    async fn get_sub_category(
        &self,
        id: SubCategoryId,
    ) -> Result<Option<SubCategoryView>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .sub_categories
            .get(&id)
            .map(|s| state.sub_category_view(s)))
    }

    async fn sub_category_name_exists(
        &self,
        category: CategoryId,
        name: &str,
        except: Option<SubCategoryId>,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .sub_category_taken(category, name, except))
    }

    async fn insert_sub_category(
        &self,
        input: &SubCategoryInput,
    ) -> Result<SubCategory, RepositoryError> {
        let mut state = self.state.write().await;
        if !state.categories.contains_key(&input.category) {
            return Err(RepositoryError::NotFound);
        }
        if state.sub_category_taken(input.category, &input.name, None) {
            return Err(conflict("subcategory"));
        }

        let now = Utc::now();
        let sub = SubCategory {
            id: SubCategoryId::new(state.next_id()),
            name: input.name.clone(),
            category_id: input.category,
            description: input.description.clone(),
            image: input.image.clone(),
            sort_order: input.sort_order,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        state.sub_categories.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn update_sub_category(
        &self,
        id: SubCategoryId,
        input: &SubCategoryInput,
    ) -> Result<Option<SubCategory>, RepositoryError> {
        let mut state = self.state.write().await;
        if state.sub_category_taken(input.category, &input.name, Some(id)) {
            return Err(conflict("subcategory"));
        }

        Ok(state.sub_categories.get_mut(&id).map(|s| {
            s.name.clone_from(&input.name);
            s.category_id = input.category;
            s.description.clone_from(&input.description);
            s.image.clone_from(&input.image);
            s.sort_order = input.sort_order;
            s.is_active = input.is_active;
            s.updated_at = Utc::now();
            s.clone()
        }))
    }

    async fn delete_sub_category(&self, id: SubCategoryId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if state.sub_categories.remove(&id).is_none() {
            return Ok(false);
        }
        for product in state.products.values_mut() {
            if product.sub_category_id == Some(id) {
                product.sub_category_id = None;
            }
        }
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------------

    async fn list_collections(
        &self,
        filter: &CollectionFilter,
    ) -> Result<Vec<Collection>, RepositoryError> {
        let state = self.state.read().await;
        let mut collections: Vec<Collection> = state
            .collections
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        collections.sort_by(|a, b| {
            b.is_featured
                .cmp(&a.is_featured)
                .then(b.year.cmp(&a.year))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(collections)
    }

    async fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError> {
        Ok(self.state.read().await.collections.get(&id).cloned())
    }

    async fn collection_name_exists(
        &self,
        name: &str,
        except: Option<CollectionId>,
    ) -> Result<bool, RepositoryError> {
        Ok(self.state.read().await.collection_taken(name, except))
    }

    async fn insert_collection(
        &self,
        input: &CollectionInput,
        year: i32,
    ) -> Result<Collection, RepositoryError> {
        let mut state = self.state.write().await;
        if state.collection_taken(&input.name, None) {
            return Err(conflict("collection"));
        }

        let now = Utc::now();
        let collection = Collection {
            id: CollectionId::new(state.next_id()),
            name: input.name.clone(),
            description: input.description.clone(),
            image: input.image.clone(),
            season: input.season,
            year,
            is_active: input.is_active,
            is_featured: input.is_featured,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: now,
            updated_at: now,
        };
        state.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn update_collection(
        &self,
        id: CollectionId,
        input: &CollectionInput,
        year: i32,
    ) -> Result<Option<Collection>, RepositoryError> {
        let mut state = self.state.write().await;
        if state.collection_taken(&input.name, Some(id)) {
            return Err(conflict("collection"));
        }

        Ok(state.collections.get_mut(&id).map(|c| {
            c.name.clone_from(&input.name);
            c.description.clone_from(&input.description);
            c.image.clone_from(&input.image);
            c.season = input.season;
            c.year = year;
            c.is_active = input.is_active;
            c.is_featured = input.is_featured;
            c.start_date = input.start_date;
            c.end_date = input.end_date;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn delete_collection(&self, id: CollectionId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        if state.collections.remove(&id).is_none() {
            return Ok(false);
        }
        for product in state.products.values_mut() {
            if product.collection_id == Some(id) {
                product.collection_id = None;
            }
        }
        Ok(true)
    }

    async fn count_active_products(&self, node: CatalogRef) -> Result<i64, RepositoryError> {
        let state = self.state.read().await;
        let count = state
            .products
            .values()
            .filter(|p| p.is_active && node.is_referenced_by(p))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductView>, RepositoryError> {
        self.listing_delay().await;
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .rev()
            .filter(|p| filter.matches(p))
            .map(|p| state.product_view(p))
            .collect())
    }

    async fn search_products(
        &self,
        search: &ProductSearch,
    ) -> Result<Vec<ProductView>, RepositoryError> {
        self.listing_delay().await;
        let state = self.state.read().await;
        // Newest first; the stable sorts below keep that as the tiebreak.
        let mut found: Vec<&Product> = state
            .products
            .values()
            .rev()
            .filter(|p| search.matches(p))
            .collect();
        match search.sort {
            ProductSort::Newest => {}
            ProductSort::PriceLow => found.sort_by_key(|p| p.price),
            ProductSort::PriceHigh => found.sort_by_key(|p| Reverse(p.price)),
            ProductSort::Name => found.sort_by_cached_key(|p| p.name.to_lowercase()),
        }

        Ok(found
            .into_iter()
            .take(usize::try_from(search.limit).unwrap_or(usize::MAX))
            .map(|p| state.product_view(p))
            .collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductView>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.products.get(&id).map(|p| state.product_view(p)))
    }

    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        Ok(self.state.read().await.products_for(ids))
    }

    async fn insert_product(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        if state.products.values().any(|p| p.sku == new.sku) {
            return Err(conflict("sku"));
        }

        let now = Utc::now();
        let mut product = Product {
            id: ProductId::new(state.next_id()),
            name: String::new(),
            description: String::new(),
            price: new.draft.price,
            original_price: None,
            category_id: new.draft.category_id,
            sub_category_id: None,
            collection_id: None,
            sizes: Vec::new(),
            colors: Vec::new(),
            featured_image: None,
            likes: 0,
            tags: Vec::new(),
            is_active: true,
            is_featured: false,
            sku: new.sku.clone(),
            seo_url: new.seo_url.clone(),
            meta_title: None,
            meta_description: None,
            created_at: now,
            updated_at: now,
        };
        apply_draft(&mut product, &new.draft);
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.products.get_mut(&id).map(|p| {
            apply_draft(p, draft);
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn deactivate_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state
            .products
            .get_mut(&id)
            .map(|p| {
                p.is_active = false;
                p.updated_at = Utc::now();
            })
            .is_some())
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
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product) {
            return Ok(None);
        }

        let changed = if liked {
            let seq = state.next_id();
            match state.likes.entry((user, product)) {
                std::collections::hash_map::Entry::Occupied(_) => false,
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(seq);
                    true
                }
            }
        } else {
            state.likes.remove(&(user, product)).is_some()
        };

        let Some(p) = state.products.get_mut(&product) else {
            return Ok(None);
        };
        if changed {
            p.likes = if liked { p.likes + 1 } else { (p.likes - 1).max(0) };
        }
        Ok(Some(LikeOutcome {
            liked,
            likes: p.likes,
        }))
    }

    async fn liked_products(&self, user: UserId) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        let mut liked: Vec<(i32, &Product)> = state
            .likes
            .iter()
            .filter(|((u, _), _)| *u == user)
            .filter_map(|((_, p), seq)| state.products.get(p).map(|p| (*seq, p)))
            .collect();
        liked.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(liked.into_iter().map(|(_, p)| p.clone()).collect())
    }
}
