//! `PostgreSQL` implementation of [`Store`](super::Store).
//!
//! Queries are built at runtime with `sqlx::query_as` into private row types,
//! which are converted into domain types with `TryFrom` so that malformed
//! stored data surfaces as [`RepositoryError::DataCorruption`].

use async_trait::async_trait;
use sqlx::PgPool;

use super::{RepositoryError, Store};

mod carts;
mod catalog;
mod notifications;
mod orders;
mod reviews;
mod users;

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique violation to `RepositoryError::Conflict`.
fn unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Map a foreign key violation to `RepositoryError::Conflict`.
fn still_referenced(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Conflict(format!("{what} is still referenced"));
    }
    RepositoryError::Database(e)
}

/// Convert a stored count or quantity that must be non-negative.
fn non_negative(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}
