/// Database row types — these map directly to SQLite rows.
/// Distinct from bandmate-types API models to keep the DB layer independent.
/// The instruments/genres/interests/social_links columns hold JSON array text;
/// decoding happens at the API layer.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub instruments: Option<String>,
    pub genres: Option<String>,
    pub interests: Option<String>,
    pub age: Option<u32>,
    pub social_links: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: String,
}

/// Public subset of a user row, as returned by discovery, match and
/// conversation listings.
pub struct ProfileRow {
    pub id: String,
    pub username: String,
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub age: Option<u32>,
    pub instruments: Option<String>,
    pub genres: Option<String>,
    pub interests: Option<String>,
    pub profile_picture: Option<String>,
}

pub struct ConversationRow {
    pub profile: ProfileRow,
    pub last_message: Option<String>,
    pub last_message_time: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub content: String,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

/// Partial profile update — `None` fields are left unchanged (COALESCE).
/// List fields are pre-encoded JSON array text.
#[derive(Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub age: Option<u32>,
    pub instruments: Option<String>,
    pub genres: Option<String>,
    pub interests: Option<String>,
    pub social_links: Option<String>,
    pub profile_picture: Option<String>,
}
