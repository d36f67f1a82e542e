use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Handler-level error taxonomy: validation problems are rejected before any
/// persistence attempt, conflicts mean the requested name/address is taken,
/// and anything from storage surfaces as a generic 500 with no retry.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Map a storage error to Conflict when it is a constraint violation,
    /// so a duplicate insert that races past the pre-check still comes back
    /// as a 409 instead of a 500.
    pub fn conflict_on_constraint(err: anyhow::Error, msg: impl Into<String>) -> Self {
        match err.downcast_ref::<rusqlite::Error>() {
            Some(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(msg.into())
            }
            _ => Self::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Internal(err) => {
                error!("Internal error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use bandmate_db::Database;
    use uuid::Uuid;

    #[test]
    fn duplicate_username_insert_maps_to_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&Uuid::new_v4().to_string(), "flea", "flea@example.com", "hash")
            .unwrap();

        // Same username slipping past any pre-check hits the UNIQUE index
        let err = db
            .create_user(&Uuid::new_v4().to_string(), "flea", "other@example.com", "hash")
            .unwrap_err();

        let mapped = ApiError::conflict_on_constraint(err, "Username or email already exists");
        assert!(matches!(mapped, ApiError::Conflict(_)));
    }

    #[test]
    fn non_constraint_errors_stay_internal() {
        let mapped = ApiError::conflict_on_constraint(anyhow::anyhow!("disk on fire"), "taken");
        assert!(matches!(mapped, ApiError::Internal(_)));
    }
}
