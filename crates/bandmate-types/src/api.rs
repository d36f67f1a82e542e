use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MessageKind, Profile, SwipeAction};

// -- JWT Claims --

/// JWT claims shared between bandmate-api (REST middleware) and
/// bandmate-gateway (WebSocket authentication). Canonical definition lives
/// here to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Profiles --

/// Partial profile update — absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub age: Option<u32>,
    pub instruments: Option<Vec<String>>,
    pub genres: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub social_links: Option<Vec<String>>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccountRequest {
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Own profile, including private account fields.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub email: String,
    pub social_links: Vec<String>,
}

// -- Swipes & matches --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwipeRequest {
    pub likee_id: Uuid,
    pub action: SwipeAction,
}

#[derive(Debug, Serialize)]
pub struct SwipeResponse {
    pub matched: bool,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
}

/// A matched counterpart plus a preview of the latest exchange.
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub last_message: Option<String>,
    pub last_message_time: Option<chrono::DateTime<chrono::Utc>>,
}
