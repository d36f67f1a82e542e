use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use bandmate_types::api::{Claims, ConversationResponse, SendMessageRequest};
use bandmate_types::events::GatewayEvent;
use bandmate_types::models::{Message, NotificationKind};

use crate::auth::AppState;
use crate::convert::{message_response, notification_response, parse_timestamp, profile_response};
use crate::error::ApiError;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("Missing fields"));
    }
    if req.receiver_id == claims.sub {
        return Err(ApiError::bad_request("You cannot message yourself"));
    }

    let db = state.clone();
    let mid = Uuid::new_v4().to_string();
    let sender_id = claims.sub.to_string();
    let receiver_id = req.receiver_id.to_string();
    let content = req.content.clone();
    let kind = req.kind;
    let notification_content = format!("New message from {}", claims.username);

    // Message insert and its notification go out in one blocking hop
    let (message_row, notification_row) = tokio::task::spawn_blocking(move || {
        let message_row =
            db.db
                .insert_message(&mid, &sender_id, &receiver_id, &content, kind.as_str())?;
        let notification_row = db.db.insert_notification(
            &Uuid::new_v4().to_string(),
            &receiver_id,
            NotificationKind::Message.as_str(),
            &notification_content,
            Some(&sender_id),
        )?;
        Ok::<_, anyhow::Error>((message_row, notification_row))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    // Echo the stored row back, so the response and the push carry the same
    // timestamp a later history fetch will show
    let message = message_response(message_row);

    // Push to the receiver if they're connected
    state
        .dispatcher
        .send_to_user(
            req.receiver_id,
            GatewayEvent::MessageCreate {
                message: message.clone(),
            },
        )
        .await;
    state
        .dispatcher
        .send_to_user(
            req.receiver_id,
            GatewayEvent::NotificationCreate {
                notification: notification_response(notification_row),
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Full two-way history with another user, oldest first.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(other_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let other = other_id.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.get_conversation(&user_id, &other))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let messages: Vec<Message> = rows.into_iter().map(message_response).collect();
    Ok(Json(messages))
}

/// Matched counterparts with last-message previews, most recently active first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.list_conversations(&user_id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let conversations: Vec<ConversationResponse> = rows
        .into_iter()
        .map(|row| ConversationResponse {
            profile: profile_response(row.profile),
            last_message: row.last_message,
            last_message_time: row.last_message_time.as_deref().map(parse_timestamp),
        })
        .collect();

    Ok(Json(conversations))
}
