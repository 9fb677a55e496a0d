use anyhow::Result;
use chrono::NaiveDate;
use kaizen_types::models::{Checkin, CheckinRecord, ReminderCandidate, StreakHistory};
use rusqlite::{Connection, params};

use super::OptionalExt;
use super::users::query_frozen_days;
use crate::Database;
use crate::models::{CHECKIN_COLUMNS, checkin_from_row, format_date, get_date, get_opt_date};

/// Distinct days a user has checked in, across all groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckinTotals {
    pub total_days: u32,
    pub completed_days: u32,
    pub last_checkin: Option<NaiveDate>,
}

impl Database {
    // -- Check-ins --

    /// Upsert the day's check-in and one completion row per task, atomically.
    /// A second submission for the same (user, group, day) overwrites the
    /// first; the latest `completed` wins.
    pub fn record_checkin(
        &self,
        user_id: i64,
        group_id: i64,
        date: NaiveDate,
        completed: bool,
        completions: &[(i64, bool)],
    ) -> Result<Checkin> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let checkin_id: i64 = tx.query_row(
                "INSERT INTO checkins (user_id, group_id, check_date, completed)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, group_id, check_date) DO UPDATE SET
                     completed = excluded.completed,
                     checked_in_at = datetime('now')
                 RETURNING id",
                params![user_id, group_id, format_date(date), completed],
                |row| row.get(0),
            )?;

            {
                let mut upsert = tx.prepare(
                    "INSERT INTO task_completions (task_id, checkin_id, completed)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(task_id, checkin_id) DO UPDATE SET completed = excluded.completed",
                )?;
                for (task_id, done) in completions {
                    upsert.execute(params![task_id, checkin_id, done])?;
                }
            }

            let checkin = tx.query_row(
                &format!("SELECT {} FROM checkins c WHERE c.id = ?1", CHECKIN_COLUMNS),
                [checkin_id],
                checkin_from_row,
            )?;
            tx.commit()?;
            Ok(checkin)
        })
    }

    pub fn get_checkin(&self, user_id: i64, group_id: i64, date: NaiveDate) -> Result<Option<Checkin>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM checkins c
                     WHERE c.user_id = ?1 AND c.group_id = ?2 AND c.check_date = ?3",
                    CHECKIN_COLUMNS
                ),
                params![user_id, group_id, format_date(date)],
                checkin_from_row,
            )
            .optional()
        })
    }

    /// The user's check-ins in every group on or after `since`, newest first.
    pub fn get_checkin_history(&self, user_id: i64, since: NaiveDate) -> Result<Vec<CheckinRecord>> {
        self.with_conn(|conn| query_history(conn, user_id, Some(since)))
    }

    /// The whole check-in history and every frozen day, read together so a
    /// streak of any length can be computed.
    pub fn streak_history(&self, user_id: i64) -> Result<StreakHistory> {
        self.with_conn(|conn| {
            Ok(StreakHistory {
                records: query_history(conn, user_id, None)?,
                frozen: query_frozen_days(conn, user_id)?,
            })
        })
    }

    pub fn checkin_totals(&self, user_id: i64) -> Result<CheckinTotals> {
        self.with_conn(|conn| {
            let totals = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(done), 0), MAX(check_date)
                 FROM (
                     SELECT check_date, MAX(completed) AS done
                     FROM checkins WHERE user_id = ?1
                     GROUP BY check_date
                 )",
                [user_id],
                |row| {
                    Ok(CheckinTotals {
                        total_days: row.get(0)?,
                        completed_days: row.get(1)?,
                        last_checkin: get_opt_date(row, 2)?,
                    })
                },
            )?;
            Ok(totals)
        })
    }

    // -- Reminder sweep --

    /// Users whose reminder hour is `hour`, who have at least one active task
    /// and at least one active group without a check-in on `date`. Pending
    /// groups are listed oldest membership first.
    pub fn reminder_candidates(&self, hour: u8, date: NaiveDate) -> Result<Vec<ReminderCandidate>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.telegram_id, u.first_name, u.commitment, m.group_id
                 FROM users u
                 JOIN memberships m ON m.user_id = u.id
                 JOIN groups g ON g.id = m.group_id AND g.is_active = 1
                 WHERE u.reminder_hour = ?1
                   AND EXISTS (SELECT 1 FROM tasks t WHERE t.user_id = u.id AND t.active = 1)
                   AND NOT EXISTS (
                       SELECT 1 FROM checkins c
                       WHERE c.user_id = u.id AND c.group_id = m.group_id AND c.check_date = ?2
                   )
                 ORDER BY u.id, m.joined_at, m.id",
            )?;

            let mut candidates: Vec<ReminderCandidate> = Vec::new();
            let mut rows = stmt.query(params![hour, format_date(date)])?;
            while let Some(row) = rows.next()? {
                let user_id: i64 = row.get(0)?;
                let group_id: i64 = row.get(4)?;
                match candidates.last_mut() {
                    Some(last) if last.user_id == user_id => last.pending_group_ids.push(group_id),
                    _ => candidates.push(ReminderCandidate {
                        user_id,
                        telegram_id: row.get(1)?,
                        first_name: row.get(2)?,
                        commitment: row.get(3)?,
                        pending_group_ids: vec![group_id],
                    }),
                }
            }
            Ok(candidates)
        })
    }
}

fn query_history(conn: &Connection, user_id: i64, since: Option<NaiveDate>) -> Result<Vec<CheckinRecord>> {
    let mut stmt = conn.prepare(
        "SELECT check_date, completed FROM checkins
         WHERE user_id = ?1 AND (?2 IS NULL OR check_date >= ?2)
         ORDER BY check_date DESC",
    )?;
    let rows = stmt
        .query_map(params![user_id, since.map(format_date)], |row| {
            Ok(CheckinRecord {
                date: get_date(row, 0)?,
                completed: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn setup() -> (Database, i64, i64, Vec<i64>) {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, Some("Ana")).unwrap();
        let group = db.upsert_group(-1, "Dojo", None, "ABC123").unwrap();
        db.join_group(user.id, group.id).unwrap();
        let tasks = vec![
            db.add_task(user.id, "Read").unwrap().id,
            db.add_task(user.id, "Run").unwrap().id,
        ];
        (db, user.id, group.id, tasks)
    }

    #[test]
    fn resubmission_overwrites() {
        let (db, user, group, tasks) = setup();
        let first = db
            .record_checkin(user, group, d(10), false, &[(tasks[0], true), (tasks[1], false)])
            .unwrap();
        let second = db
            .record_checkin(user, group, d(10), true, &[(tasks[0], true), (tasks[1], true)])
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.completed);
        let history = db.get_checkin_history(user, d(1)).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].completed);

        let stats = db.task_stats(user, d(1)).unwrap();
        assert_eq!(stats.len(), 2);
        assert!(stats.iter().all(|s| s.total == 1 && s.completed == 1));
    }

    #[test]
    fn streak_history_has_no_window() {
        let (db, user, group, _) = setup();
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        for n in 0..600 {
            db.record_checkin(user, group, start + chrono::Duration::days(n), true, &[])
                .unwrap();
        }
        db.use_streak_freeze(user, d(10)).unwrap();

        let history = db.streak_history(user).unwrap();
        assert_eq!(history.records.len(), 600);
        assert_eq!(history.records[0].date, start + chrono::Duration::days(599));
        assert!(history.frozen.contains(&d(10)));
    }

    #[test]
    fn failed_completion_rolls_back_checkin() {
        let (db, user, group, _) = setup();
        // task 999 does not exist, so the foreign key rejects the batch
        let result = db.record_checkin(user, group, d(10), true, &[(999, true)]);
        assert!(result.is_err());
        assert!(db.get_checkin(user, group, d(10)).unwrap().is_none());
    }

    #[test]
    fn totals_dedupe_days() {
        let (db, user, group, _) = setup();
        let other = db.upsert_group(-2, "Gym", None, "GYM000").unwrap();
        db.join_group(user, other.id).unwrap();

        db.record_checkin(user, group, d(9), false, &[]).unwrap();
        db.record_checkin(user, other.id, d(9), true, &[]).unwrap();
        db.record_checkin(user, group, d(10), false, &[]).unwrap();

        let totals = db.checkin_totals(user).unwrap();
        assert_eq!(totals.total_days, 2);
        assert_eq!(totals.completed_days, 1);
        assert_eq!(totals.last_checkin, Some(d(10)));
    }

    #[test]
    fn sweep_candidates_skip_checked_in_groups() {
        let (db, user, group, _) = setup();
        let other = db.upsert_group(-2, "Gym", None, "GYM000").unwrap();
        db.join_group(user, other.id).unwrap();
        db.set_reminder_hour(user, Some(20)).unwrap();

        let all = db.reminder_candidates(20, d(10)).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].pending_group_ids, vec![group, other.id]);

        db.record_checkin(user, group, d(10), true, &[]).unwrap();
        let rest = db.reminder_candidates(20, d(10)).unwrap();
        assert_eq!(rest[0].pending_group_ids, vec![other.id]);

        db.record_checkin(user, other.id, d(10), false, &[]).unwrap();
        assert!(db.reminder_candidates(20, d(10)).unwrap().is_empty());
        assert!(db.reminder_candidates(8, d(11)).unwrap().is_empty());
    }

    #[test]
    fn sweep_skips_users_without_tasks() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(5, None, None).unwrap();
        let group = db.upsert_group(-5, "Dojo", None, "XYZ789").unwrap();
        db.join_group(user.id, group.id).unwrap();
        db.set_reminder_hour(user.id, Some(8)).unwrap();
        assert!(db.reminder_candidates(8, d(10)).unwrap().is_empty());
    }
}
