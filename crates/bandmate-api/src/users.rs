use axum::{Extension, Json, extract::State, response::IntoResponse};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use bandmate_db::models::{ProfileChanges, UserRow};
use bandmate_types::api::{Claims, MeResponse, UpdateAccountRequest, UpdateProfileRequest};
use bandmate_types::models::Profile;

use crate::auth::AppState;
use crate::convert::{parse_list, parse_uuid};
use crate::error::ApiError;

/// Email providers accepted for account updates.
const ALLOWED_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "hotmail.com",
    "icloud.com",
    "proton.me",
    "aol.com",
];

const DISCOVER_LIMIT: u32 = 20;

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(me_response(user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.instruments.as_ref().is_some_and(|v| v.len() > 5) {
        return Err(ApiError::bad_request("Max 5 instruments"));
    }
    if req.genres.as_ref().is_some_and(|v| v.len() > 5) {
        return Err(ApiError::bad_request("Max 5 genres"));
    }

    let user_id = claims.sub.to_string();

    // Username uniqueness check up front so the caller gets a 409, not a
    // generic constraint failure
    if let Some(username) = &req.username {
        if let Some(existing) = state.db.get_user_by_username(username)? {
            if existing.id != user_id {
                return Err(ApiError::conflict("Username already taken"));
            }
        }
    }

    let changes = ProfileChanges {
        username: req.username,
        nickname: req.nickname,
        bio: req.bio,
        age: req.age,
        instruments: encode_list(req.instruments)?,
        genres: encode_list(req.genres)?,
        interests: encode_list(req.interests)?,
        social_links: encode_list(req.social_links)?,
        profile_picture: req.profile_picture,
    };

    state
        .db
        .update_profile(&user_id, &changes)
        .map_err(|e| ApiError::conflict_on_constraint(e, "Username already taken"))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.is_none() && req.new_password.is_none() {
        return Err(ApiError::bad_request("Nothing to update"));
    }

    if let Some(email) = &req.email {
        let domain = email.split('@').nth(1).unwrap_or("");
        if !ALLOWED_EMAIL_DOMAINS.contains(&domain) {
            return Err(ApiError::bad_request(
                "Email provider not allowed. Please use a major provider.",
            ));
        }
    }

    // Changing either field requires the current password
    let current_password = req
        .current_password
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Current password required"))?;

    let user_id = claims.sub.to_string();
    let user = state
        .db
        .get_user_by_id(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored password hash is invalid: {}", e))?;
    Argon2::default()
        .verify_password(current_password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::bad_request("Invalid current password"))?;

    if let Some(email) = &req.email {
        if let Some(existing) = state.db.get_user_by_email(email)? {
            if existing.id != user_id {
                return Err(ApiError::conflict("Email already exists"));
            }
        }
    }

    let new_hash = match &req.new_password {
        Some(new_password) => {
            validate_password_strength(new_password)?;
            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::default()
                .hash_password(new_password.as_bytes(), &salt)
                .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
                .to_string();
            Some(hash)
        }
        None => None,
    };

    state
        .db
        .update_account(&user_id, req.email.as_deref(), new_hash.as_deref())
        .map_err(|e| ApiError::conflict_on_constraint(e, "Email already exists"))?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Candidates the caller has not swiped on yet.
pub async fn discover(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user_id = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.db.discover(&user_id, DISCOVER_LIMIT))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let profiles: Vec<Profile> = rows.into_iter().map(crate::convert::profile_response).collect();
    Ok(Json(profiles))
}

fn validate_password_strength(password: &str) -> Result<(), ApiError> {
    if password.len() < 7 {
        return Err(ApiError::bad_request(
            "New password must be at least 7 characters long",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "New password must contain at least one number",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::bad_request(
            "New password must contain at least one uppercase letter",
        ));
    }
    Ok(())
}

fn encode_list(list: Option<Vec<String>>) -> Result<Option<String>, ApiError> {
    list.map(|v| serde_json::to_string(&v).map_err(|e| anyhow::anyhow!(e).into()))
        .transpose()
}

fn me_response(user: UserRow) -> MeResponse {
    MeResponse {
        profile: Profile {
            id: parse_uuid(&user.id, "user id"),
            username: user.username,
            nickname: user.nickname,
            bio: user.bio,
            age: user.age,
            instruments: parse_list(user.instruments.as_deref()),
            genres: parse_list(user.genres.as_deref()),
            interests: parse_list(user.interests.as_deref()),
            profile_picture: user.profile_picture,
        },
        email: user.email,
        social_links: parse_list(user.social_links.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::validate_password_strength;

    #[test]
    fn password_strength_rules() {
        assert!(validate_password_strength("Ab1cdef").is_ok());
        assert!(validate_password_strength("Ab1").is_err()); // too short
        assert!(validate_password_strength("Abcdefg").is_err()); // no digit
        assert!(validate_password_strength("ab1cdef").is_err()); // no uppercase
    }
}
