//! Subcommand implementations.
//!
//! # Environment Variables
//!
//! - `THREADLINE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

pub mod admin;
pub mod migrate;
pub mod seed;

/// Failure to reach the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load `.env`, then open a pool on the storefront database.
///
/// # Errors
///
/// Returns `ConnectError` if no URL is configured or the connection fails.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("THREADLINE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar("THREADLINE_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(threadline_storefront::db::create_pool(&database_url).await?)
}
