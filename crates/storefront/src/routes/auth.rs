//! Account route handlers: signup, login, logout, the current user's
//! account and admin user management.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use threadline_core::{UserId, UserRole};

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::extract::AppJson;
use crate::middleware::{
    RequireAuth, clear_current_user, refresh_current_user, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::services::{AuthService, Profile, Signup};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/change-password", put(change_password))
        .route("/auth/update-profile", put(update_profile))
        .route("/auth/users", get(list_users).put(update_role))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub user_id: UserId,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub user: User,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create an account. Does not sign the user in.
///
/// # Errors
///
/// Returns 400 for a malformed email, weak password or missing name and 409
/// when the email is already registered.
pub async fn signup(
    State(state): State<AppState>,
    AppJson(body): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = AuthService::new(state.store())
        .signup(Signup {
            email: &body.email,
            password: &body.password,
            first_name: &body.first_name,
            last_name: &body.last_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User created successfully",
            user,
        }),
    ))
}

/// Verify credentials and store the user in the session.
///
/// # Errors
///
/// Returns 401 for unknown emails or wrong passwords.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.store())
        .login(&body.email, &body.password)
        .await?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    add_breadcrumb("auth", "Logged in", None);

    Ok(Json(UserResponse {
        message: "Logged in successfully",
        user,
    }))
}

/// Drop the session.
///
/// # Errors
///
/// Returns 500 if the session store cannot be reached.
pub async fn logout(session: Session) -> Result<Json<MessageResponse>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
    clear_sentry_user();

    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}

/// The signed-in user's account.
///
/// # Errors
///
/// Returns 401 without a session user.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<User>> {
    let user = AuthService::new(state.store()).get_user(current.id).await?;
    Ok(Json(user))
}

/// Change the signed-in user's password.
///
/// # Errors
///
/// Returns 401 without a session user, 400 for a wrong current password or a
/// weak new one and 404 if the account is gone.
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    AppJson(body): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.store())
        .change_password(current.id, &body.current_password, &body.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}

/// Change the signed-in user's names and email. The session picks up the
/// new email.
///
/// # Errors
///
/// Returns 401 without a session user, 400 for a malformed email or blank
/// name, 409 when the email belongs to another account and 404 if the
/// account is gone.
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    AppJson(body): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.store())
        .update_profile(
            current.id,
            Profile {
                email: &body.email,
                first_name: &body.first_name,
                last_name: &body.last_name,
            },
        )
        .await?;

    refresh_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(Json(UserResponse {
        message: "Profile updated successfully",
        user,
    }))
}

/// Every account. Admin only.
///
/// # Errors
///
/// Returns 401 unless the caller is an admin.
pub async fn list_users(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Json<UsersResponse>> {
    let users = AuthService::new(state.store()).list_users(&current).await?;
    Ok(Json(UsersResponse { users }))
}

/// Set another account's role. Admin only.
///
/// # Errors
///
/// Returns 401 unless the caller is an admin, 400 for an unknown role and 404
/// for an unknown user.
pub async fn update_role(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    AppJson(body): AppJson<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>> {
    let user = AuthService::new(state.store())
        .update_role(&current, body.user_id, body.role)
        .await?;
    let role = body.role.to_string();
    add_breadcrumb("auth", "Role changed", Some(&[("role", role.as_str())]));

    Ok(Json(RoleResponse { user }))
}
