use anyhow::{Result, bail};
use rusqlite::Transaction;
use tracing::info;
use uuid::Uuid;

use bandmate_types::models::{NotificationKind, SwipeAction};

use crate::models::{NotificationRow, ProfileRow};
use crate::queries::profile_from_row;
use crate::Database;

/// The notification pair written when a mutual like completes.
pub struct MatchFormed {
    pub for_liker: NotificationRow,
    pub for_likee: NotificationRow,
}

impl Database {
    /// Record a swipe by `liker_id` on `likee_id` and form a match if the
    /// reverse like already exists. The swipe insert, match insert and the
    /// two match notifications run in a single transaction, so a crash can
    /// never leave a match without its notification pair.
    ///
    /// Returns `Some` iff this call created the match — the acknowledgment
    /// fires once, on the side completing the mutual like.
    ///
    /// Re-swiping an already-swiped pair is a no-op, not an error: the
    /// client's swipe UI may double-submit and must not see a failure.
    pub fn record_swipe(
        &self,
        liker_id: &str,
        likee_id: &str,
        action: SwipeAction,
    ) -> Result<Option<MatchFormed>> {
        if liker_id == likee_id {
            bail!("user {} cannot swipe on themselves", liker_id);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let outcome = apply_swipe(&tx, liker_id, likee_id, action)?;
            tx.commit()?;
            Ok(outcome)
        })
    }

    /// Counterpart profiles for every match containing `user_id`,
    /// newest match first.
    pub fn list_matches(&self, user_id: &str) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.nickname, u.bio, u.age, u.instruments,
                        u.genres, u.interests, u.profile_picture
                 FROM matches m
                 JOIN users u
                   ON u.id = CASE WHEN m.user_lo = ?1 THEN m.user_hi ELSE m.user_lo END
                 WHERE m.user_lo = ?1 OR m.user_hi = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn apply_swipe(
    tx: &Transaction,
    liker_id: &str,
    likee_id: &str,
    action: SwipeAction,
) -> Result<Option<MatchFormed>> {
    let inserted = tx.execute(
        "INSERT OR IGNORE INTO swipes (liker_id, likee_id, action) VALUES (?1, ?2, ?3)",
        rusqlite::params![liker_id, likee_id, action.as_str()],
    )?;
    if inserted == 0 {
        // This pair already has a recorded decision
        return Ok(None);
    }

    if action == SwipeAction::Pass {
        return Ok(None);
    }

    let reverse_like: bool = tx.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM swipes
             WHERE liker_id = ?1 AND likee_id = ?2 AND action = 'like')",
        rusqlite::params![likee_id, liker_id],
        |row| row.get(0),
    )?;
    if !reverse_like {
        return Ok(None);
    }

    // Canonical order: (min, max) so (A,B) and (B,A) collapse to one row
    let (lo, hi) = if liker_id < likee_id {
        (liker_id, likee_id)
    } else {
        (likee_id, liker_id)
    };

    let created = tx.execute(
        "INSERT OR IGNORE INTO matches (id, user_lo, user_hi) VALUES (?1, ?2, ?3)",
        rusqlite::params![Uuid::new_v4().to_string(), lo, hi],
    )?;
    if created == 0 {
        // Pair already matched (racing completion) — already-matched is
        // success, and must not produce a second notification pair
        return Ok(None);
    }

    let liker_name = display_name(tx, liker_id)?;
    let likee_name = display_name(tx, likee_id)?;

    // Exactly two notifications, one per participant, each pointing at the
    // other via related_id
    let for_likee = insert_match_notification(tx, likee_id, &liker_name, liker_id)?;
    let for_liker = insert_match_notification(tx, liker_id, &likee_name, likee_id)?;

    info!("Match formed between {} and {}", lo, hi);
    Ok(Some(MatchFormed { for_liker, for_likee }))
}

/// Nickname if set, else username.
fn display_name(tx: &Transaction, user_id: &str) -> Result<String> {
    let name = tx.query_row(
        "SELECT COALESCE(nickname, username) FROM users WHERE id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(name)
}

fn insert_match_notification(
    tx: &Transaction,
    recipient_id: &str,
    counterpart_name: &str,
    counterpart_id: &str,
) -> Result<NotificationRow> {
    let id = Uuid::new_v4().to_string();
    let kind = NotificationKind::Match.as_str();
    let content = format!("You matched with {}!", counterpart_name);

    let created_at = tx.query_row(
        "INSERT INTO notifications (id, user_id, kind, content, related_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING created_at",
        rusqlite::params![id, recipient_id, kind, content, counterpart_id],
        |row| row.get(0),
    )?;

    Ok(NotificationRow {
        id,
        user_id: recipient_id.to_string(),
        kind: kind.to_string(),
        content,
        related_id: Some(counterpart_id.to_string()),
        is_read: false,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileChanges;

    fn seed_user(db: &Database, username: &str, nickname: Option<&str>) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, &format!("{username}@example.com"), "hash")
            .unwrap();
        if let Some(nick) = nickname {
            db.update_profile(
                &id,
                &ProfileChanges {
                    nickname: Some(nick.to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        }
        id
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn one_sided_like_creates_nothing() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "jimi_hendrix", None);
        let b = seed_user(&db, "freddie_mercury", None);

        assert!(db.record_swipe(&a, &b, SwipeAction::Like).unwrap().is_none());
        assert_eq!(count(&db, "swipes"), 1);
        assert_eq!(count(&db, "matches"), 0);
        assert_eq!(count(&db, "notifications"), 0);
    }

    #[test]
    fn pass_creates_only_the_swipe_row() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "kurt_cobain", None);
        let b = seed_user(&db, "dave_grohl", None);

        assert!(db.record_swipe(&a, &b, SwipeAction::Pass).unwrap().is_none());
        // Even if B likes A, a pass from A never forms a match
        assert!(db.record_swipe(&b, &a, SwipeAction::Like).unwrap().is_none());
        assert_eq!(count(&db, "matches"), 0);
        assert_eq!(count(&db, "notifications"), 0);
    }

    #[test]
    fn mutual_like_forms_one_match_and_two_notifications() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "jimi_hendrix", Some("Jimi"));
        let b = seed_user(&db, "freddie_mercury", None);

        assert!(db.record_swipe(&a, &b, SwipeAction::Like).unwrap().is_none());
        // B completes the mutual like — only this call reports the match
        let formed = db.record_swipe(&b, &a, SwipeAction::Like).unwrap().unwrap();
        assert_eq!(formed.for_liker.user_id, b);
        assert_eq!(formed.for_likee.user_id, a);

        assert_eq!(count(&db, "matches"), 1);

        let for_a = db.list_notifications(&a).unwrap();
        let for_b = db.list_notifications(&b).unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_b.len(), 1);

        // Each points at the other, naming nickname over username
        assert_eq!(for_a[0].related_id.as_deref(), Some(b.as_str()));
        assert_eq!(for_a[0].content, "You matched with freddie_mercury!");
        assert_eq!(for_a[0].kind, "match");
        assert_eq!(for_b[0].related_id.as_deref(), Some(a.as_str()));
        assert_eq!(for_b[0].content, "You matched with Jimi!");
        assert!(!for_b[0].is_read);
    }

    #[test]
    fn match_row_is_stored_in_canonical_order() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "flea", None);
        let b = seed_user(&db, "slash", None);
        let (lo, hi) = if a < b { (&a, &b) } else { (&b, &a) };

        // Completed by the higher id, so insertion order != canonical order
        db.record_swipe(lo, hi, SwipeAction::Like).unwrap();
        assert!(db.record_swipe(hi, lo, SwipeAction::Like).unwrap().is_some());

        let (stored_lo, stored_hi): (String, String) = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT user_lo, user_hi FROM matches", [], |r| {
                    Ok((r.get(0)?, r.get(1)?))
                })?)
            })
            .unwrap();
        assert_eq!(&stored_lo, lo);
        assert_eq!(&stored_hi, hi);
    }

    #[test]
    fn reswipe_is_an_idempotent_noop() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "stevie_nicks", None);
        let b = seed_user(&db, "tom_petty", None);

        db.record_swipe(&a, &b, SwipeAction::Pass).unwrap();
        // A already has a recorded decision — the like must not overwrite it
        assert!(db.record_swipe(&a, &b, SwipeAction::Like).unwrap().is_none());
        assert!(db.record_swipe(&a, &b, SwipeAction::Like).unwrap().is_none());

        assert_eq!(count(&db, "swipes"), 1);
        let action: String = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT action FROM swipes", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(action, "pass");
    }

    #[test]
    fn retried_completion_does_not_duplicate_match_or_notifications() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "janis_joplin", None);
        let b = seed_user(&db, "bb_king", None);

        db.record_swipe(&a, &b, SwipeAction::Like).unwrap();
        assert!(db.record_swipe(&b, &a, SwipeAction::Like).unwrap().is_some());
        // Retried request after a dropped response
        assert!(db.record_swipe(&b, &a, SwipeAction::Like).unwrap().is_none());

        assert_eq!(count(&db, "matches"), 1);
        assert_eq!(count(&db, "notifications"), 2);
    }

    #[test]
    fn racing_completion_swallows_the_duplicate_match() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "miles_davis", None);
        let b = seed_user(&db, "john_bonham", None);

        db.record_swipe(&a, &b, SwipeAction::Like).unwrap();

        // Another completion won the race: the match row already exists
        // by the time B's like lands
        let (lo, hi) = if a < b { (&a, &b) } else { (&b, &a) };
        db.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO matches (id, user_lo, user_hi) VALUES (?1, ?2, ?3)",
                rusqlite::params![Uuid::new_v4().to_string(), lo, hi],
            )?;
            Ok(())
        })
        .unwrap();

        // No error surfaced, no second match row, no notification pair
        assert!(db.record_swipe(&b, &a, SwipeAction::Like).unwrap().is_none());
        assert_eq!(count(&db, "matches"), 1);
        assert_eq!(count(&db, "notifications"), 0);
    }

    #[test]
    fn self_swipe_is_rejected_before_persisting() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "prince", None);

        assert!(db.record_swipe(&a, &a, SwipeAction::Like).is_err());
        assert_eq!(count(&db, "swipes"), 0);
    }

    #[test]
    fn list_matches_shows_the_counterpart_on_both_sides() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "robert_plant", None);
        let b = seed_user(&db, "jimmy_page", Some("Jimmy"));
        let c = seed_user(&db, "john_paul_jones", None);

        db.record_swipe(&a, &b, SwipeAction::Like).unwrap();
        db.record_swipe(&b, &a, SwipeAction::Like).unwrap();
        // One-sided: c liked a, no match
        db.record_swipe(&c, &a, SwipeAction::Like).unwrap();

        let for_a = db.list_matches(&a).unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].id, b);
        assert_eq!(for_a[0].nickname.as_deref(), Some("Jimmy"));

        let for_b = db.list_matches(&b).unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].id, a);

        assert!(db.list_matches(&c).unwrap().is_empty());
    }
}
