//! Integration tests for accounts, sessions and the health endpoints.

use axum::http::{Method, StatusCode};
use serde_json::json;

use threadline_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_signup_login_me_logout() {
    let app = TestApp::new();

    let signup = app
        .post(
            "/auth/signup",
            json!({
                "email": "  Ada@Threadline.Test ",
                "password": PASSWORD,
                "first_name": "Ada",
                "last_name": "Lovelace",
            }),
            None,
        )
        .await;
    assert_eq!(signup.status, StatusCode::CREATED);
    assert_eq!(signup.body["message"], "User created successfully");
    assert_eq!(signup.body["user"]["email"], "ada@threadline.test");
    assert_eq!(signup.body["user"]["role"], "customer");
    assert!(signup.body["user"].get("password_hash").is_none());
    // Signing up does not start a session
    assert!(signup.set_cookie.is_none());

    let user = app.login("ada@threadline.test").await;
    let me = app.get("/auth/me", Some(&user)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["first_name"], "Ada");

    let logout = app
        .request(Method::POST, "/auth/logout", None, Some(&user.cookie))
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["message"], "Logged out successfully");

    let after = app.get("/auth/me", Some(&user)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_rejections() {
    let app = TestApp::new();
    app.customer("ada@threadline.test").await;

    let duplicate = app
        .post(
            "/auth/signup",
            json!({
                "email": "ada@threadline.test",
                "password": PASSWORD,
                "first_name": "Ada",
                "last_name": "Again",
            }),
            None,
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let weak = app
        .post(
            "/auth/signup",
            json!({
                "email": "grace@threadline.test",
                "password": "short",
                "first_name": "Grace",
                "last_name": "Hopper",
            }),
            None,
        )
        .await;
    assert_eq!(weak.status, StatusCode::BAD_REQUEST);

    let bad_email = app
        .post(
            "/auth/signup",
            json!({
                "email": "not-an-email",
                "password": PASSWORD,
                "first_name": "Grace",
                "last_name": "Hopper",
            }),
            None,
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.error(), "Invalid email address");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::new();
    app.customer("ada@threadline.test").await;

    let wrong = app
        .post(
            "/auth/login",
            json!({ "email": "ada@threadline.test", "password": "not-the-password" }),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let unknown = app
        .post(
            "/auth/login",
            json!({ "email": "nobody@threadline.test", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.error(), unknown.error());
}

#[tokio::test]
async fn test_health_and_request_id() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert!(live.headers.contains_key("x-request-id"));

    let ready = app.get("/health/ready", None).await;
    assert_eq!(ready.status, StatusCode::OK);

    let mut request_id = None;
    for _ in 0..2 {
        let response = app.get("/health", None).await;
        let id = response
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        assert_ne!(id, request_id);
        request_id = id;
    }
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let ada = app.customer("ada@threadline.test").await;

    let anonymous = app
        .put(
            "/auth/change-password",
            json!({ "current_password": PASSWORD, "new_password": "a-new-password" }),
            None,
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let wrong = app
        .put(
            "/auth/change-password",
            json!({ "current_password": "not-the-password", "new_password": "a-new-password" }),
            Some(&ada),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.error(), "Current password is incorrect");

    let changed = app
        .put(
            "/auth/change-password",
            json!({ "current_password": PASSWORD, "new_password": "a-new-password" }),
            Some(&ada),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);
    assert_eq!(changed.body["message"], "Password updated successfully");

    let old = app
        .post(
            "/auth/login",
            json!({ "email": "ada@threadline.test", "password": PASSWORD }),
            None,
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = app
        .post(
            "/auth/login",
            json!({ "email": "ada@threadline.test", "password": "a-new-password" }),
            None,
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile_refreshes_session() {
    let app = TestApp::new();
    let ada = app.customer("ada@threadline.test").await;
    app.customer("grace@threadline.test").await;

    let taken = app
        .put(
            "/auth/update-profile",
            json!({ "email": "grace@threadline.test", "first_name": "Ada", "last_name": "King" }),
            Some(&ada),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let updated = app
        .put(
            "/auth/update-profile",
            json!({ "email": "Ada.King@Threadline.Test", "first_name": "Ada", "last_name": "King" }),
            Some(&ada),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["message"], "Profile updated successfully");
    assert_eq!(updated.body["user"]["email"], "ada.king@threadline.test");

    let me = app.get("/auth/me", Some(&ada)).await;
    assert_eq!(me.body["last_name"], "King");

    let relogin = app.login("ada.king@threadline.test").await;
    assert_eq!(relogin.id, ada.id);
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = TestApp::new();
    let admin = app.admin("admin@threadline.test").await;
    let shopper = app.customer("shopper@threadline.test").await;

    let denied = app.get("/auth/users", Some(&shopper)).await;
    assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
    assert_eq!(denied.error(), "Unauthorized");
    let anonymous = app.get("/auth/users", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    let self_promote = app
        .put(
            "/auth/users",
            json!({ "user_id": shopper.id, "role": "admin" }),
            Some(&shopper),
        )
        .await;
    assert_eq!(self_promote.status, StatusCode::UNAUTHORIZED);

    let users = app.get("/auth/users", Some(&admin)).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body["users"].as_array().map(Vec::len), Some(2));
    assert!(users.body["users"][0].get("password_hash").is_none());

    let promoted = app
        .put(
            "/auth/users",
            json!({ "user_id": shopper.id, "role": "admin" }),
            Some(&admin),
        )
        .await;
    assert_eq!(promoted.status, StatusCode::OK);
    assert_eq!(promoted.body["user"]["role"], "admin");

    let unknown = app
        .put(
            "/auth/users",
            json!({ "user_id": 9999, "role": "customer" }),
            Some(&admin),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.error(), "User not found");

    let bad_role = app
        .put(
            "/auth/users",
            json!({ "user_id": shopper.id, "role": "owner" }),
            Some(&admin),
        )
        .await;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);

    // The new role applies from the next login.
    let promoted_session = app.login("shopper@threadline.test").await;
    let users = app.get("/auth/users", Some(&promoted_session)).await;
    assert_eq!(users.status, StatusCode::OK);
}
