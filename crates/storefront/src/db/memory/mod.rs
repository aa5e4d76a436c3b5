//! In-process implementation of [`Store`](super::Store).
//!
//! All state sits behind one `tokio::sync::RwLock`, so every trait method is
//! atomic with respect to every other. Constraints the `PostgreSQL` schema
//! enforces (unique names, SKUs and review triples, foreign keys) are checked
//! by hand and reported with the same `RepositoryError` variants.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use threadline_core::{
    CategoryId, CollectionId, Email, NotificationId, OrderId, ProductId, ReviewId, SubCategoryId,
    UserId, UserRole,
};

use super::{RepositoryError, Store, UserStore};
use crate::models::{
    CartItem, Category, Collection, NewUser, Notification, Order, Product, ProfileUpdate, Review,
    SubCategory, User, UserSummary,
};

mod carts;
mod catalog;
mod notifications;
mod orders;
mod reviews;

#[derive(Debug)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i32,
    users: BTreeMap<UserId, StoredUser>,
    categories: BTreeMap<CategoryId, Category>,
    sub_categories: BTreeMap<SubCategoryId, SubCategory>,
    collections: BTreeMap<CollectionId, Collection>,
    products: BTreeMap<ProductId, Product>,
    /// Like rows, valued by insertion sequence for newest-first listing.
    likes: HashMap<(UserId, ProductId), i32>,
    carts: HashMap<UserId, Vec<CartItem>>,
    orders: BTreeMap<OrderId, Order>,
    reviews: BTreeMap<ReviewId, Review>,
    notifications: BTreeMap<NotificationId, Notification>,
}

impl MemoryState {
    /// Ids come from one sequence shared by every table.
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn products_for<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ProductId>,
    ) -> HashMap<ProductId, Product> {
        ids.into_iter()
            .filter_map(|id| self.products.get(id).map(|p| (*id, p.clone())))
            .collect()
    }
}

/// Store that keeps everything in memory. Data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    listing_latency: Option<Duration>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every product listing and search by `latency`, to exercise
    /// listing timeouts.
    #[must_use]
    pub fn with_listing_latency(mut self, latency: Duration) -> Self {
        self.listing_latency = Some(latency);
        self
    }

    async fn listing_delay(&self) {
        if let Some(latency) = self.listing_latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.user.email == new.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(state.next_id()),
            email: new.email.clone(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: new.password_hash.clone(),
            },
        );
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|u| u.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.user.email == *email)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }

    async fn set_user_role(
        &self,
        email: &Email,
        role: UserRole,
    ) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state
            .users
            .values_mut()
            .find(|u| u.user.email == *email)
            .map(|u| {
                u.user.role = role;
                u.user.updated_at = Utc::now();
                u.user.clone()
            }))
    }

    async fn set_user_role_by_id(
        &self,
        id: UserId,
        role: UserRole,
    ) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&id).map(|u| {
            u.user.role = role;
            u.user.updated_at = Utc::now();
            u.user.clone()
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.values().map(|u| u.user.clone()).collect())
    }

    async fn password_hash_for(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|u| u.password_hash.clone()))
    }

    async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(stored) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        password_hash.clone_into(&mut stored.password_hash);
        stored.user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.user.id != id && u.user.email == update.email)
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        Ok(state.users.get_mut(&id).map(|u| {
            u.user.email = update.email.clone();
            u.user.first_name.clone_from(&update.first_name);
            u.user.last_name.clone_from(&update.last_name);
            u.user.updated_at = Utc::now();
            u.user.clone()
        }))
    }

    async fn list_admin_ids(&self) -> Result<Vec<UserId>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.user.role.is_admin())
            .map(|u| u.user.id)
            .collect())
    }

    async fn user_summaries(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserSummary>, RepositoryError> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|u| (*id, u.user.summary())))
            .collect())
    }
}
