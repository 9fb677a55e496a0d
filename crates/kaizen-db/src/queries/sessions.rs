use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::OptionalExt;
use crate::Database;
use crate::models::format_timestamp;

impl Database {
    // -- Conversation sessions --

    /// Raw `(kind, payload)` of the user's session, if any.
    pub fn load_session(&self, telegram_id: i64) -> Result<Option<(String, String)>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT kind, payload FROM sessions WHERE telegram_id = ?1",
                [telegram_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
    }

    pub fn save_session(&self, telegram_id: i64, kind: &str, payload: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (telegram_id, kind, payload) VALUES (?1, ?2, ?3)
                 ON CONFLICT(telegram_id) DO UPDATE SET
                     kind = excluded.kind,
                     payload = excluded.payload,
                     updated_at = datetime('now')",
                params![telegram_id, kind, payload],
            )?;
            Ok(())
        })
    }

    pub fn delete_session(&self, telegram_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE telegram_id = ?1", [telegram_id])?;
            Ok(())
        })
    }

    /// Drop sessions untouched since `cutoff`. Returns how many were removed.
    pub fn purge_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE updated_at < ?1",
                [format_timestamp(cutoff)],
            )?;
            Ok(n)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::{Duration, Utc};

    #[test]
    fn save_load_delete() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_session(1).unwrap().is_none());

        db.save_session(1, "checkin", "{\"a\":1}").unwrap();
        db.save_session(1, "checkin", "{\"a\":2}").unwrap();
        let (kind, payload) = db.load_session(1).unwrap().unwrap();
        assert_eq!(kind, "checkin");
        assert_eq!(payload, "{\"a\":2}");

        db.delete_session(1).unwrap();
        assert!(db.load_session(1).unwrap().is_none());
    }

    #[test]
    fn purge_uses_cutoff() {
        let db = Database::open_in_memory().unwrap();
        db.save_session(1, "onboarding", "{}").unwrap();
        assert_eq!(db.purge_sessions_before(Utc::now() - Duration::hours(1)).unwrap(), 0);
        assert_eq!(db.purge_sessions_before(Utc::now() + Duration::hours(1)).unwrap(), 1);
    }
}
