//! Account role commands.
//!
//! Signup always creates customers; admins are made here.

use threadline_core::UserRole;
use threadline_storefront::db::PgStore;
use threadline_storefront::services::{AuthError, AuthService};

use super::{ConnectError, connect};

/// Errors that can occur while changing a role.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Set the role of the account registered under `email`.
///
/// # Errors
///
/// Returns `AdminError` if the email is invalid, no account uses it, or the
/// database is unreachable.
pub async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    let pool = connect().await?;
    let store = PgStore::new(pool.clone());

    let user = AuthService::new(&store).set_role(email, role).await?;

    tracing::info!(
        "Role updated! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    pool.close().await;
    Ok(())
}
