use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use bandmate_types::api::Claims;
use bandmate_types::models::Notification;

use crate::auth::AppState;
use crate::convert::notification_response;
use crate::error::ApiError;

/// The caller's notifications, newest first. This is the polled catch-up
/// path; connected clients also get them pushed over the gateway.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.list_notifications(&user_id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let notifications: Vec<Notification> = rows.into_iter().map(notification_response).collect();
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let marked = state
        .db
        .mark_notification_read(&notification_id.to_string(), &claims.sub.to_string())?;

    if !marked {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(Json(serde_json::json!({ "success": true })))
}
