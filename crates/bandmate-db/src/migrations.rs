use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            nickname        TEXT,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            bio             TEXT,
            instruments     TEXT,
            genres          TEXT,
            interests       TEXT,
            age             INTEGER,
            social_links    TEXT,
            profile_picture TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS swipes (
            liker_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            likee_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            action      TEXT NOT NULL CHECK (action IN ('like', 'pass')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (liker_id, likee_id)
        );

        CREATE INDEX IF NOT EXISTS idx_swipes_likee
            ON swipes(likee_id, liker_id);

        -- user_lo < user_hi, so (A,B) and (B,A) collapse to one row
        CREATE TABLE IF NOT EXISTS matches (
            id          TEXT PRIMARY KEY,
            user_lo     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            user_hi     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_lo, user_hi),
            CHECK (user_lo < user_hi)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            sender_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            kind        TEXT NOT NULL DEFAULT 'text' CHECK (kind IN ('text', 'audio')),
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, receiver_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind        TEXT NOT NULL,
            content     TEXT NOT NULL,
            related_id  TEXT,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
