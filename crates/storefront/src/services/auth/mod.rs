//! Authentication service.
//!
//! Email and password accounts with Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use threadline_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, Store};
use crate::models::{CurrentUser, NewUser, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Account fields a signed-in user may change.
#[derive(Debug, Clone, Copy)]
pub struct Profile<'s> {
    pub email: &'s str,
    pub first_name: &'s str,
    pub last_name: &'s str,
}

/// Account fields submitted at signup.
#[derive(Debug, Clone, Copy)]
pub struct Signup<'s> {
    pub email: &'s str,
    pub password: &'s str,
    pub first_name: &'s str,
    pub last_name: &'s str,
}

/// Authentication service.
///
/// Handles user registration, login, self-service account changes and
/// admin role changes.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::MissingName` if either name is blank.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    #[instrument(skip(self, signup), fields(email = %signup.email))]
    pub async fn signup(&self, signup: Signup<'_>) -> Result<User, AuthError> {
        let email = Email::parse(signup.email)?;
        validate_password(signup.password)?;
        let (first_name, last_name) = validate_names(signup.first_name, signup.last_name)?;

        let password_hash = hash_password(signup.password)?;

        let user = self
            .store
            .create_user(&NewUser {
                email,
                first_name,
                last_name,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .store
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Change the role of the account registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if no account uses the email.
    #[instrument(skip(self))]
    pub async fn set_role(&self, email: &str, role: UserRole) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .store
            .set_user_role(&email, role)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        tracing::info!(user_id = %user.id, %role, "Role changed");
        Ok(user)
    }

    /// Replace the password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if the user is gone.
    /// Returns `AuthError::IncorrectPassword` if `current` does not match.
    /// Returns `AuthError::WeakPassword` if `new` is too short.
    #[instrument(skip(self, current, new))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let password_hash = self
            .store
            .password_hash_for(user_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        verify_password(current, &password_hash).map_err(|_| AuthError::IncorrectPassword)?;
        validate_password(new)?;

        let password_hash = hash_password(new)?;
        if !self.store.set_password_hash(user_id, &password_hash).await? {
            return Err(AuthError::AccountNotFound);
        }

        tracing::info!(%user_id, "Password changed");
        Ok(())
    }

    /// Update the caller's names and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::MissingName` for bad
    /// input, `AuthError::EmailTaken` if another account has the email and
    /// `AuthError::AccountNotFound` if the user is gone.
    #[instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        profile: Profile<'_>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(profile.email)?;
        let (first_name, last_name) = validate_names(profile.first_name, profile.last_name)?;

        let update = ProfileUpdate {
            email,
            first_name,
            last_name,
        };
        let user = self
            .store
            .update_profile(user_id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?
            .ok_or(AuthError::AccountNotFound)?;

        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Every account, for admins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AdminRequired` for non-admins.
    pub async fn list_users(&self, actor: &CurrentUser) -> Result<Vec<User>, AuthError> {
        if !actor.is_admin() {
            return Err(AuthError::AdminRequired);
        }
        Ok(self.store.list_users().await?)
    }

    /// Admin change of another account's role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AdminRequired` for non-admins and
    /// `AuthError::AccountNotFound` for an unknown user.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn update_role(
        &self,
        actor: &CurrentUser,
        user_id: UserId,
        role: UserRole,
    ) -> Result<User, AuthError> {
        if !actor.is_admin() {
            return Err(AuthError::AdminRequired);
        }
        let user = self
            .store
            .set_user_role_by_id(user_id, role)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        tracing::info!(user_id = %user.id, %role, "Role changed");
        Ok(user)
    }
}

/// Both names, trimmed and non-blank.
fn validate_names(first_name: &str, last_name: &str) -> Result<(String, String), AuthError> {
    let first_name = first_name.trim();
    if first_name.is_empty() {
        return Err(AuthError::MissingName("first name"));
    }
    let last_name = last_name.trim();
    if last_name.is_empty() {
        return Err(AuthError::MissingName("last name"));
    }
    Ok((first_name.to_owned(), last_name.to_owned()))
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
