use anyhow::Result;
use kaizen_types::models::{Buddy, BuddyRequest, BuddyRequestOutcome};
use rusqlite::{Connection, TransactionBehavior, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{BUDDY_REQUEST_COLUMNS, buddy_request_from_row, get_timestamp};

impl Database {
    // -- Buddies --

    /// Pair the user with the oldest pending request from someone without an
    /// active match, or queue a request. Lookup, match insert and request
    /// updates share one immediate transaction, so two concurrent requests
    /// cannot both claim the same partner.
    pub fn request_buddy(&self, user_id: i64) -> Result<BuddyRequestOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(buddy) = query_active_buddy(&tx, user_id)? {
                return Ok(BuddyRequestOutcome::AlreadyMatched(buddy));
            }
            if query_pending_request(&tx, user_id)?.is_some() {
                return Ok(BuddyRequestOutcome::AlreadyPending);
            }

            let waiting: Option<(i64, i64)> = tx
                .query_row(
                    "SELECT b.id, b.user_id FROM buddy_requests b
                     WHERE b.status = 'pending' AND b.user_id != ?1
                       AND NOT EXISTS (
                           SELECT 1 FROM buddy_matches bm
                           WHERE bm.status = 'active'
                             AND (bm.user1_id = b.user_id OR bm.user2_id = b.user_id)
                       )
                     ORDER BY b.created_at, b.id
                     LIMIT 1",
                    [user_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((_, partner_id)) = waiting else {
                tx.execute("INSERT INTO buddy_requests (user_id) VALUES (?1)", [user_id])?;
                tx.commit()?;
                return Ok(BuddyRequestOutcome::Queued);
            };

            let (user1, user2) = if user_id < partner_id {
                (user_id, partner_id)
            } else {
                (partner_id, user_id)
            };
            tx.execute(
                "INSERT INTO buddy_matches (user1_id, user2_id) VALUES (?1, ?2)",
                params![user1, user2],
            )?;
            tx.execute(
                "INSERT INTO buddy_requests (user_id, status, matched_at)
                 VALUES (?1, 'matched', datetime('now'))",
                [user_id],
            )?;
            tx.execute(
                "UPDATE buddy_requests SET status = 'matched', matched_at = datetime('now')
                 WHERE status = 'pending' AND user_id IN (?1, ?2)",
                params![user1, user2],
            )?;

            let buddy = query_active_buddy(&tx, user_id)?
                .ok_or_else(|| anyhow::anyhow!("match for user {} missing after insert", user_id))?;
            tx.commit()?;
            Ok(BuddyRequestOutcome::Matched(buddy))
        })
    }

    pub fn get_buddy(&self, user_id: i64) -> Result<Option<Buddy>> {
        self.with_conn(|conn| query_active_buddy(conn, user_id))
    }

    pub fn get_pending_buddy_request(&self, user_id: i64) -> Result<Option<BuddyRequest>> {
        self.with_conn(|conn| query_pending_request(conn, user_id))
    }

    /// Withdraw a pending request. Returns false if there was none.
    pub fn cancel_buddy_request(&self, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE buddy_requests SET status = 'cancelled'
                 WHERE user_id = ?1 AND status = 'pending'",
                [user_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// End the active match and return the former partner.
    pub fn end_buddy_match(&self, user_id: i64) -> Result<Option<Buddy>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(buddy) = query_active_buddy(&tx, user_id)? else {
                return Ok(None);
            };
            tx.execute(
                "UPDATE buddy_matches SET status = 'ended', ended_at = datetime('now') WHERE id = ?1",
                [buddy.match_id],
            )?;
            tx.commit()?;
            Ok(Some(buddy))
        })
    }
}

fn query_active_buddy(conn: &Connection, user_id: i64) -> Result<Option<Buddy>> {
    conn.query_row(
        "SELECT bm.id, bm.matched_at, u.id, u.telegram_id, u.first_name, u.username
         FROM buddy_matches bm
         JOIN users u
           ON u.id = CASE WHEN bm.user1_id = ?1 THEN bm.user2_id ELSE bm.user1_id END
         WHERE (bm.user1_id = ?1 OR bm.user2_id = ?1) AND bm.status = 'active'
         ORDER BY bm.id DESC
         LIMIT 1",
        [user_id],
        |row| {
            Ok(Buddy {
                match_id: row.get(0)?,
                matched_at: get_timestamp(row, 1)?,
                user_id: row.get(2)?,
                telegram_id: row.get(3)?,
                first_name: row.get(4)?,
                username: row.get(5)?,
            })
        },
    )
    .optional()
}

fn query_pending_request(conn: &Connection, user_id: i64) -> Result<Option<BuddyRequest>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM buddy_requests b
             WHERE b.user_id = ?1 AND b.status = 'pending'
             ORDER BY b.id DESC LIMIT 1",
            BUDDY_REQUEST_COLUMNS
        ),
        [user_id],
        buddy_request_from_row,
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use kaizen_types::models::{BuddyRequestOutcome, BuddyRequestStatus};

    fn users(db: &Database, n: i64) -> Vec<i64> {
        (1..=n)
            .map(|i| db.upsert_user(i, None, Some(&format!("U{}", i))).unwrap().id)
            .collect()
    }

    #[test]
    fn second_request_matches_first() {
        let db = Database::open_in_memory().unwrap();
        let ids = users(&db, 2);

        assert_eq!(db.request_buddy(ids[0]).unwrap(), BuddyRequestOutcome::Queued);
        let BuddyRequestOutcome::Matched(partner) = db.request_buddy(ids[1]).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(partner.user_id, ids[0]);

        // both sides see each other
        assert_eq!(db.get_buddy(ids[0]).unwrap().unwrap().user_id, ids[1]);
        assert_eq!(db.get_buddy(ids[1]).unwrap().unwrap().user_id, ids[0]);

        // no pending rows remain
        assert!(db.get_pending_buddy_request(ids[0]).unwrap().is_none());
        assert!(db.get_pending_buddy_request(ids[1]).unwrap().is_none());
    }

    #[test]
    fn repeat_requests_are_reported() {
        let db = Database::open_in_memory().unwrap();
        let ids = users(&db, 2);
        db.request_buddy(ids[0]).unwrap();
        assert_eq!(db.request_buddy(ids[0]).unwrap(), BuddyRequestOutcome::AlreadyPending);

        db.request_buddy(ids[1]).unwrap();
        assert!(matches!(
            db.request_buddy(ids[0]).unwrap(),
            BuddyRequestOutcome::AlreadyMatched(_)
        ));
    }

    #[test]
    fn matched_users_are_not_offered_again() {
        let db = Database::open_in_memory().unwrap();
        let ids = users(&db, 4);
        db.request_buddy(ids[0]).unwrap();
        db.request_buddy(ids[1]).unwrap();

        assert_eq!(db.request_buddy(ids[2]).unwrap(), BuddyRequestOutcome::Queued);
        let BuddyRequestOutcome::Matched(p) = db.request_buddy(ids[3]).unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(p.user_id, ids[2]);
    }

    #[test]
    fn cancel_and_end() {
        let db = Database::open_in_memory().unwrap();
        let ids = users(&db, 3);

        db.request_buddy(ids[0]).unwrap();
        assert!(db.cancel_buddy_request(ids[0]).unwrap());
        assert!(!db.cancel_buddy_request(ids[0]).unwrap());
        // cancelled request is not matchable
        assert_eq!(db.request_buddy(ids[1]).unwrap(), BuddyRequestOutcome::Queued);

        db.request_buddy(ids[2]).unwrap();
        let ended = db.end_buddy_match(ids[1]).unwrap().unwrap();
        assert_eq!(ended.user_id, ids[2]);
        assert!(db.get_buddy(ids[2]).unwrap().is_none());
        assert!(db.end_buddy_match(ids[1]).unwrap().is_none());
    }

    #[test]
    fn pending_request_row_is_typed() {
        let db = Database::open_in_memory().unwrap();
        let ids = users(&db, 1);
        db.request_buddy(ids[0]).unwrap();
        let req = db.get_pending_buddy_request(ids[0]).unwrap().unwrap();
        assert_eq!(req.status, BuddyRequestStatus::Pending);
        assert!(req.matched_at.is_none());
    }
}
