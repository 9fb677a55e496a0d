use anyhow::Result;
use chrono::{DateTime, Utc};
use kaizen_types::models::Reminder;
use rusqlite::params;

use crate::Database;
use crate::models::{REMINDER_COLUMNS, format_timestamp, reminder_from_row};

impl Database {
    // -- Ad-hoc reminders --

    pub fn create_reminder(
        &self,
        user_id: i64,
        telegram_id: i64,
        title: &str,
        description: Option<&str>,
        at: DateTime<Utc>,
        calendar_event_id: Option<&str>,
    ) -> Result<Reminder> {
        self.with_conn_mut(|conn| {
            let id: i64 = conn.query_row(
                "INSERT INTO reminders
                     (user_id, telegram_id, title, description, reminder_time, calendar_event_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id",
                params![
                    user_id,
                    telegram_id,
                    title,
                    description,
                    format_timestamp(at),
                    calendar_event_id
                ],
                |row| row.get(0),
            )?;
            let reminder = conn.query_row(
                &format!("SELECT {} FROM reminders r WHERE r.id = ?1", REMINDER_COLUMNS),
                [id],
                reminder_from_row,
            )?;
            Ok(reminder)
        })
    }

    /// Unsent reminders due at or before `now`, oldest first.
    pub fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reminders r
                 WHERE r.is_sent = 0 AND r.reminder_time <= ?1
                 ORDER BY r.reminder_time",
                REMINDER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([format_timestamp(now)], reminder_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn mark_reminder_sent(&self, id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE reminders SET is_sent = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Upcoming reminders for a user, soonest first.
    pub fn pending_reminders(&self, user_id: i64) -> Result<Vec<Reminder>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM reminders r
                 WHERE r.user_id = ?1 AND r.is_sent = 0
                 ORDER BY r.reminder_time",
                REMINDER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([user_id], reminder_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn due_reminders_fire_once() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(7, None, None).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();

        let soon = db
            .create_reminder(user.id, 7, "Stretch", None, now - Duration::minutes(1), None)
            .unwrap();
        db.create_reminder(user.id, 7, "Call mom", Some("Sunday call"), now + Duration::hours(1), None)
            .unwrap();

        let due = db.due_reminders(now).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, soon.id);
        assert_eq!(due[0].reminder_time, now - Duration::minutes(1));

        db.mark_reminder_sent(soon.id).unwrap();
        assert!(db.due_reminders(now).unwrap().is_empty());
        assert_eq!(db.pending_reminders(user.id).unwrap().len(), 1);
    }
}
