use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use bandmate_db::models::{MessageRow, NotificationRow, ProfileRow};
use bandmate_types::models::{Message, MessageKind, Notification, NotificationKind, Profile};

/// JSON array text from the DB -> list; malformed or missing -> empty.
pub(crate) fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok()).unwrap_or_default()
}

pub(crate) fn parse_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", context, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn profile_response(row: ProfileRow) -> Profile {
    Profile {
        id: parse_uuid(&row.id, "user id"),
        username: row.username,
        nickname: row.nickname,
        bio: row.bio,
        age: row.age,
        instruments: parse_list(row.instruments.as_deref()),
        genres: parse_list(row.genres.as_deref()),
        interests: parse_list(row.interests.as_deref()),
        profile_picture: row.profile_picture,
    }
}

pub(crate) fn message_response(row: MessageRow) -> Message {
    Message {
        id: parse_uuid(&row.id, "message id"),
        sender_id: parse_uuid(&row.sender_id, "sender_id"),
        receiver_id: parse_uuid(&row.receiver_id, "receiver_id"),
        content: row.content,
        kind: match row.kind.as_str() {
            "audio" => MessageKind::Audio,
            _ => MessageKind::Text,
        },
        is_read: row.is_read,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub(crate) fn notification_response(row: NotificationRow) -> Notification {
    Notification {
        id: parse_uuid(&row.id, "notification id"),
        kind: match row.kind.as_str() {
            "match" => NotificationKind::Match,
            _ => NotificationKind::Message,
        },
        content: row.content,
        related_id: row.related_id.as_deref().map(|r| parse_uuid(r, "related_id")),
        is_read: row.is_read,
        created_at: parse_timestamp(&row.created_at),
    }
}
