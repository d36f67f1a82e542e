use crate::models::{ConversationRow, MessageRow, NotificationRow, ProfileChanges, ProfileRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

const USER_COLUMNS: &str = "id, username, nickname, email, password, bio, instruments, genres, \
     interests, age, social_links, profile_picture, created_at";

const PROFILE_COLUMNS: &str =
    "id, username, nickname, bio, age, instruments, genres, interests, profile_picture";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn update_profile(&self, id: &str, changes: &ProfileChanges) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users
                 SET username        = COALESCE(?1, username),
                     nickname        = COALESCE(?2, nickname),
                     bio             = COALESCE(?3, bio),
                     age             = COALESCE(?4, age),
                     instruments     = COALESCE(?5, instruments),
                     genres          = COALESCE(?6, genres),
                     interests       = COALESCE(?7, interests),
                     social_links    = COALESCE(?8, social_links),
                     profile_picture = COALESCE(?9, profile_picture)
                 WHERE id = ?10",
                rusqlite::params![
                    changes.username,
                    changes.nickname,
                    changes.bio,
                    changes.age,
                    changes.instruments,
                    changes.genres,
                    changes.interests,
                    changes.social_links,
                    changes.profile_picture,
                    id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn update_account(
        &self,
        id: &str,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users
                 SET email    = COALESCE(?1, email),
                     password = COALESCE(?2, password)
                 WHERE id = ?3",
                rusqlite::params![email, password_hash, id],
            )?;
            Ok(())
        })
    }

    /// Candidates the user has not yet swiped on, excluding themselves.
    pub fn discover(&self, user_id: &str, limit: u32) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS}
                 FROM users
                 WHERE id != ?1
                   AND id NOT IN (SELECT likee_id FROM swipes WHERE liker_id = ?1)
                 LIMIT ?2"
            ))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    /// Returns the stored row so callers echo the database's own timestamp
    /// instead of computing a slightly different one.
    pub fn insert_message(
        &self,
        id: &str,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        kind: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let created_at = conn.query_row(
                "INSERT INTO messages (id, sender_id, receiver_id, content, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING created_at",
                rusqlite::params![id, sender_id, receiver_id, content, kind],
                |row| row.get(0),
            )?;
            Ok(MessageRow {
                id: id.to_string(),
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                content: content.to_string(),
                kind: kind.to_string(),
                is_read: false,
                created_at,
            })
        })
    }

    /// Full two-way history between two users, oldest first.
    pub fn get_conversation(&self, user_id: &str, other_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, content, kind, is_read, created_at
                 FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, other_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        receiver_id: row.get(2)?,
                        content: row.get(3)?,
                        kind: row.get(4)?,
                        is_read: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Matched counterparts with a preview of the latest exchange, most
    /// recently active first.
    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.nickname, u.bio, u.age, u.instruments,
                        u.genres, u.interests, u.profile_picture,
                        (SELECT content FROM messages
                          WHERE (sender_id = u.id AND receiver_id = ?1)
                             OR (sender_id = ?1 AND receiver_id = u.id)
                          ORDER BY created_at DESC, rowid DESC LIMIT 1) AS last_message,
                        (SELECT created_at FROM messages
                          WHERE (sender_id = u.id AND receiver_id = ?1)
                             OR (sender_id = ?1 AND receiver_id = u.id)
                          ORDER BY created_at DESC, rowid DESC LIMIT 1) AS last_message_time
                 FROM matches m
                 JOIN users u
                   ON u.id = CASE WHEN m.user_lo = ?1 THEN m.user_hi ELSE m.user_lo END
                 WHERE m.user_lo = ?1 OR m.user_hi = ?1
                 ORDER BY last_message_time DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationRow {
                        profile: profile_from_row(row)?,
                        last_message: row.get(9)?,
                        last_message_time: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        kind: &str,
        content: &str,
        related_id: Option<&str>,
    ) -> Result<NotificationRow> {
        self.with_conn_mut(|conn| {
            let created_at = conn.query_row(
                "INSERT INTO notifications (id, user_id, kind, content, related_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING created_at",
                rusqlite::params![id, user_id, kind, content, related_id],
                |row| row.get(0),
            )?;
            Ok(NotificationRow {
                id: id.to_string(),
                user_id: user_id.to_string(),
                kind: kind.to_string(),
                content: content.to_string(),
                related_id: related_id.map(str::to_string),
                is_read: false,
                created_at,
            })
        })
    }

    pub fn list_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, content, related_id, is_read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        content: row.get(3)?,
                        related_id: row.get(4)?,
                        is_read: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Mark a notification read. Scoped to the owner — returns false if no
    /// such notification belongs to this user.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is one of our own identifiers, never user input
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                nickname: row.get(2)?,
                email: row.get(3)?,
                password: row.get(4)?,
                bio: row.get(5)?,
                instruments: row.get(6)?,
                genres: row.get(7)?,
                interests: row.get(8)?,
                age: row.get(9)?,
                social_links: row.get(10)?,
                profile_picture: row.get(11)?,
                created_at: row.get(12)?,
            })
        })
        .optional()?;

    Ok(row)
}

pub(crate) fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        username: row.get(1)?,
        nickname: row.get(2)?,
        bio: row.get(3)?,
        age: row.get(4)?,
        instruments: row.get(5)?,
        genres: row.get(6)?,
        interests: row.get(7)?,
        profile_picture: row.get(8)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::ProfileChanges;
    use crate::Database;
    use bandmate_types::models::SwipeAction;
    use uuid::Uuid;

    fn seed_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, &format!("{username}@example.com"), "hash")
            .unwrap();
        id
    }

    fn set_message_time(db: &Database, id: &str, ts: &str) {
        db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE messages SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![ts, id],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn profile_update_leaves_absent_fields_untouched() {
        let db = Database::open_in_memory().unwrap();
        let id = seed_user(&db, "flea");

        db.update_profile(
            &id,
            &ProfileChanges {
                bio: Some("Slapping da bass.".into()),
                instruments: Some(r#"["Bass","Trumpet"]"#.into()),
                ..Default::default()
            },
        )
        .unwrap();
        db.update_profile(
            &id,
            &ProfileChanges {
                nickname: Some("Flea".into()),
                age: Some(50),
                ..Default::default()
            },
        )
        .unwrap();

        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.bio.as_deref(), Some("Slapping da bass."));
        assert_eq!(user.instruments.as_deref(), Some(r#"["Bass","Trumpet"]"#));
        assert_eq!(user.nickname.as_deref(), Some("Flea"));
        assert_eq!(user.age, Some(50));
    }

    #[test]
    fn discover_excludes_self_and_swiped() {
        let db = Database::open_in_memory().unwrap();
        let me = seed_user(&db, "dave");
        let seen = seed_user(&db, "stevie");
        let fresh = seed_user(&db, "prince");

        db.record_swipe(&me, &seen, SwipeAction::Pass).unwrap();

        let candidates = db.discover(&me, 20).unwrap();
        let ids: Vec<&str> = candidates.iter().map(|p| p.id.as_str()).collect();
        assert!(ids.contains(&fresh.as_str()));
        assert!(!ids.contains(&seen.as_str()));
        assert!(!ids.contains(&me.as_str()));
    }

    #[test]
    fn mark_read_is_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        let nid = Uuid::new_v4().to_string();
        db.insert_notification(&nid, &alice, "message", "New message from bob", Some(&bob))
            .unwrap();

        // Bob cannot mark Alice's notification read
        assert!(!db.mark_notification_read(&nid, &bob).unwrap());
        assert!(db.mark_notification_read(&nid, &alice).unwrap());

        let all = db.list_notifications(&alice).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_read);
    }

    #[test]
    fn conversation_history_is_two_way_and_ascending() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "axl");
        let b = seed_user(&db, "slash");
        let c = seed_user(&db, "duff");

        for (i, (from, to)) in [(&a, &b), (&b, &a), (&a, &c)].iter().enumerate() {
            db.insert_message(
                &Uuid::new_v4().to_string(),
                from,
                to,
                &format!("msg {i}"),
                "text",
            )
            .unwrap();
        }

        let history = db.get_conversation(&a, &b).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "msg 0");
        assert_eq!(history[1].content, "msg 1");
    }

    #[test]
    fn insert_message_echoes_the_stored_timestamp() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "eric");
        let b = seed_user(&db, "ginger");

        let sent = db
            .insert_message(&Uuid::new_v4().to_string(), &a, &b, "hi", "text")
            .unwrap();

        let history = db.get_conversation(&a, &b).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, sent.id);
        assert_eq!(history[0].created_at, sent.created_at);
    }

    #[test]
    fn conversations_order_by_latest_exchange() {
        let db = Database::open_in_memory().unwrap();
        let me = seed_user(&db, "joni");
        let first = seed_user(&db, "neil");
        let second = seed_user(&db, "david");
        let quiet = seed_user(&db, "graham");

        for other in [&first, &second, &quiet] {
            db.record_swipe(&me, other, SwipeAction::Like).unwrap();
            db.record_swipe(other, &me, SwipeAction::Like).unwrap();
        }

        let m1 = db
            .insert_message(&Uuid::new_v4().to_string(), &me, &first, "hello", "text")
            .unwrap();
        let m2 = db
            .insert_message(&Uuid::new_v4().to_string(), &second, &me, "hey", "text")
            .unwrap();
        let m3 = db
            .insert_message(&Uuid::new_v4().to_string(), &first, &me, "still here", "text")
            .unwrap();
        // All inserts land in the same second; pin distinct times so the
        // ordering under test is the timestamps, not insertion luck
        set_message_time(&db, &m1.id, "2026-08-01 10:00:00");
        set_message_time(&db, &m2.id, "2026-08-01 11:00:00");
        set_message_time(&db, &m3.id, "2026-08-01 12:00:00");

        let convos = db.list_conversations(&me).unwrap();
        assert_eq!(convos.len(), 3);
        assert_eq!(convos[0].profile.id, first);
        assert_eq!(convos[0].last_message.as_deref(), Some("still here"));
        assert_eq!(convos[1].profile.id, second);
        assert_eq!(convos[1].last_message.as_deref(), Some("hey"));
        // Matched but never messaged still appears, after the active ones
        assert_eq!(convos[2].profile.id, quiet);
        assert!(convos[2].last_message.is_none());
        assert!(convos[2].last_message_time.is_none());
    }
}
