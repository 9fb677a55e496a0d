use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use kaizen_types::models::User;
use rusqlite::{Connection, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{USER_COLUMNS, format_date, get_date, user_from_row};

impl Database {
    // -- Users --

    /// Create the user on first contact, refresh names on later contact.
    pub fn upsert_user(
        &self,
        telegram_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<User> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (telegram_id, username, first_name) VALUES (?1, ?2, ?3)
                 ON CONFLICT(telegram_id) DO UPDATE SET
                     username = excluded.username,
                     first_name = excluded.first_name,
                     updated_at = datetime('now')",
                params![telegram_id, username, first_name],
            )?;
            query_user_by_telegram_id(conn, telegram_id)?
                .ok_or_else(|| anyhow::anyhow!("user {} vanished after upsert", telegram_id))
        })
    }

    pub fn get_user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_telegram_id(conn, telegram_id))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS),
                [id],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn set_reminder_hour(&self, user_id: i64, hour: Option<u8>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET reminder_hour = ?2, updated_at = datetime('now') WHERE id = ?1",
                params![user_id, hour],
            )?;
            Ok(())
        })
    }

    pub fn set_timezone(&self, user_id: i64, timezone: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET timezone = ?2, updated_at = datetime('now') WHERE id = ?1",
                params![user_id, timezone],
            )?;
            Ok(())
        })
    }

    /// Persist onboarding in one transaction: the collected tasks, the
    /// reminder choice and a one-line commitment summary.
    pub fn complete_onboarding(
        &self,
        user_id: i64,
        tasks: &[String],
        reminder_hour: Option<u8>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut insert = tx.prepare("INSERT INTO tasks (user_id, name) VALUES (?1, ?2)")?;
                for name in tasks {
                    insert.execute(params![user_id, name])?;
                }
            }
            tx.execute(
                "UPDATE users SET reminder_hour = ?2, commitment = ?3, updated_at = datetime('now')
                 WHERE id = ?1",
                params![user_id, reminder_hour, tasks.join(", ")],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    // -- Streak freezes --

    /// Spend one freeze on `date`. Returns false when none are left. Every
    /// frozen day is kept, so earlier freezes go on bridging their gaps.
    pub fn use_streak_freeze(&self, user_id: i64, date: NaiveDate) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE users
                 SET streak_freezes_available = streak_freezes_available - 1,
                     freeze_used_on_date = ?2,
                     updated_at = datetime('now')
                 WHERE id = ?1 AND streak_freezes_available > 0",
                params![user_id, format_date(date)],
            )?;
            if changed == 1 {
                tx.execute(
                    "INSERT OR IGNORE INTO streak_freezes (user_id, freeze_date) VALUES (?1, ?2)",
                    params![user_id, format_date(date)],
                )?;
            }
            tx.commit()?;
            Ok(changed == 1)
        })
    }

    pub fn frozen_days(&self, user_id: i64) -> Result<BTreeSet<NaiveDate>> {
        self.with_conn(|conn| query_frozen_days(conn, user_id))
    }

    /// Give every user whose last reset is a week old (or who never had one)
    /// their weekly freeze back. Returns how many users were reset.
    pub fn reset_weekly_freezes(&self, today: NaiveDate) -> Result<usize> {
        let cutoff = today - Duration::days(7);
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users
                 SET streak_freezes_available = 1,
                     last_freeze_reset_date = ?1,
                     updated_at = datetime('now')
                 WHERE last_freeze_reset_date IS NULL OR last_freeze_reset_date <= ?2",
                params![format_date(today), format_date(cutoff)],
            )?;
            Ok(changed)
        })
    }
}

pub(crate) fn query_frozen_days(conn: &Connection, user_id: i64) -> Result<BTreeSet<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT freeze_date FROM streak_freezes WHERE user_id = ?1")?;
    let days = stmt
        .query_map([user_id], |row| get_date(row, 0))?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    Ok(days)
}

pub(crate) fn query_user_by_telegram_id(conn: &Connection, telegram_id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users u WHERE u.telegram_id = ?1", USER_COLUMNS),
        [telegram_id],
        user_from_row,
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn upsert_creates_then_refreshes() {
        let db = Database::open_in_memory().unwrap();
        let first = db.upsert_user(100, Some("kai"), Some("Kai")).unwrap();
        assert_eq!(first.timezone, "UTC");
        assert_eq!(first.streak_freezes_available, 1);
        assert_eq!(first.reminder_hour, None);

        let again = db.upsert_user(100, Some("kai_new"), Some("Kai")).unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.username.as_deref(), Some("kai_new"));
    }

    #[test]
    fn onboarding_writes_tasks_and_reminder() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, Some("Ana")).unwrap();
        db.complete_onboarding(user.id, &["Read".into(), "Run 5k".into()], Some(20))
            .unwrap();

        let user = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(user.reminder_hour, Some(20));
        assert_eq!(user.commitment.as_deref(), Some("Read, Run 5k"));
        assert_eq!(db.get_active_tasks(user.id).unwrap().len(), 2);
    }

    #[test]
    fn freeze_is_spent_once() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, None).unwrap();
        assert!(db.use_streak_freeze(user.id, d(2024, 5, 10)).unwrap());
        assert!(!db.use_streak_freeze(user.id, d(2024, 5, 11)).unwrap());

        let user = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(user.streak_freezes_available, 0);
        assert_eq!(user.freeze_used_on_date, Some(d(2024, 5, 10)));
    }

    #[test]
    fn earlier_frozen_days_are_kept() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, None).unwrap();
        assert!(db.use_streak_freeze(user.id, d(2024, 5, 3)).unwrap());
        db.reset_weekly_freezes(d(2024, 5, 4)).unwrap();
        assert!(db.use_streak_freeze(user.id, d(2024, 5, 10)).unwrap());

        let frozen: Vec<_> = db.frozen_days(user.id).unwrap().into_iter().collect();
        assert_eq!(frozen, vec![d(2024, 5, 3), d(2024, 5, 10)]);
        let user = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(user.freeze_used_on_date, Some(d(2024, 5, 10)));
    }

    #[test]
    fn weekly_reset_respects_cutoff() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, None).unwrap();
        db.use_streak_freeze(user.id, d(2024, 5, 1)).unwrap();

        // never reset before
        assert_eq!(db.reset_weekly_freezes(d(2024, 5, 1)).unwrap(), 1);
        // six days later: too soon
        db.use_streak_freeze(user.id, d(2024, 5, 2)).unwrap();
        assert_eq!(db.reset_weekly_freezes(d(2024, 5, 7)).unwrap(), 0);
        // seven days later: due
        assert_eq!(db.reset_weekly_freezes(d(2024, 5, 8)).unwrap(), 1);

        let user = db.get_user(user.id).unwrap().unwrap();
        assert_eq!(user.streak_freezes_available, 1);
        assert_eq!(user.last_freeze_reset_date, Some(d(2024, 5, 8)));
    }

    #[test]
    fn timezone_update() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, None).unwrap();
        db.set_timezone(user.id, "Asia/Tokyo").unwrap();
        db.set_reminder_hour(user.id, Some(8)).unwrap();
        let user = db.get_user_by_telegram_id(1).unwrap().unwrap();
        assert_eq!(user.timezone, "Asia/Tokyo");
        assert_eq!(user.reminder_hour, Some(8));
    }
}
