//! Account error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors from signup, login, profile and role changes.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] threadline_core::EmailError),

    /// Unknown email or wrong password. Callers cannot tell which.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    AccountNotFound,

    /// Password change with the wrong current password.
    #[error("Current password is incorrect")]
    IncorrectPassword,

    /// Account administration by a non-admin.
    #[error("Unauthorized")]
    AdminRequired,

    /// Signup with an email that is already registered.
    #[error("email already registered")]
    EmailTaken,

    #[error("{0}")]
    WeakPassword(String),

    /// A blank first or last name at signup.
    #[error("{0} is required")]
    MissingName(&'static str),

    #[error("account store error: {0}")]
    Repository(#[from] RepositoryError),

    /// argon2 failed to hash the password.
    #[error("password hashing failed")]
    PasswordHash,
}
