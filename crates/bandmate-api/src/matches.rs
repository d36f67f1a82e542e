use axum::{Extension, Json, extract::State, response::IntoResponse};

use bandmate_types::api::{Claims, SwipeRequest, SwipeResponse};
use bandmate_types::events::GatewayEvent;
use bandmate_types::models::Profile;

use crate::auth::AppState;
use crate::convert::{notification_response, profile_response};
use crate::error::ApiError;

/// Record a like/pass on another user. Responds `matched: true` only on the
/// call that completed the mutual like, so the client shows its "You
/// matched!" acknowledgment exactly once.
pub async fn swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.likee_id == claims.sub {
        return Err(ApiError::bad_request("You cannot swipe on yourself"));
    }

    let db = state.clone();
    let liker_id = claims.sub.to_string();
    let likee_id = req.likee_id.to_string();

    // Run blocking DB work off the async runtime
    let outcome = tokio::task::spawn_blocking(move || {
        db.db.record_swipe(&liker_id, &likee_id, req.action)
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let matched = outcome.is_some();

    // Push the freshly written notification pair to whichever participants
    // are connected; everyone else picks it up from GET /notifications
    if let Some(formed) = outcome {
        state
            .dispatcher
            .send_to_user(
                claims.sub,
                GatewayEvent::NotificationCreate {
                    notification: notification_response(formed.for_liker),
                },
            )
            .await;
        state
            .dispatcher
            .send_to_user(
                req.likee_id,
                GatewayEvent::NotificationCreate {
                    notification: notification_response(formed.for_likee),
                },
            )
            .await;
    }

    Ok(Json(SwipeResponse { matched }))
}

/// Counterpart profiles for the caller's matches.
pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.list_matches(&user_id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let profiles: Vec<Profile> = rows.into_iter().map(profile_response).collect();
    Ok(Json(profiles))
}
