//! Notification feed handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde::{Deserialize, Serialize};

use threadline_core::NotificationId;

use crate::error::Result;
use crate::extract::{AppJson, AppQuery};
use crate::middleware::RequireAuth;
use crate::models::NotificationFeed;
use crate::services::NotificationService;
use crate::state::AppState;

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(feed).put(mark_read))
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

/// Either one notification or all of them.
#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub notification_id: Option<NotificationId>,
    #[serde(default)]
    pub mark_all_as_read: bool,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub message: &'static str,
    pub unread_count: i64,
}

/// Newest notifications (default 10) plus the unread count.
///
/// # Errors
///
/// Returns 401 without a session user.
pub async fn feed(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppQuery(query): AppQuery<FeedQuery>,
) -> Result<Json<NotificationFeed>> {
    let feed = NotificationService::new(state.store())
        .feed(user.id, query.limit)
        .await?;
    Ok(Json(feed))
}

/// Mark one or all of the caller's notifications read. A body naming
/// neither only reports the unread count.
///
/// # Errors
///
/// Returns 401 without a session user.
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(body): AppJson<MarkReadRequest>,
) -> Result<Json<MarkReadResponse>> {
    let service = NotificationService::new(state.store());
    let unread_count = match (body.mark_all_as_read, body.notification_id) {
        (true, _) => service.mark_all_read(user.id).await?,
        (false, Some(id)) => service.mark_read(user.id, id).await?,
        (false, None) => service.feed(user.id, Some(1)).await?.unread_count,
    };

    Ok(Json(MarkReadResponse {
        message: "Notifications updated successfully",
        unread_count,
    }))
}
