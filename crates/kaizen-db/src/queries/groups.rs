use anyhow::Result;
use chrono::NaiveDate;
use kaizen_types::models::{Group, MemberDay, User};
use rusqlite::{Connection, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{GROUP_COLUMNS, USER_COLUMNS, format_date, group_from_row, user_from_row};

impl Database {
    // -- Groups --

    /// Register a chat the bot was added to (or re-activate it). The invite
    /// code is only used when the group is new.
    pub fn upsert_group(
        &self,
        telegram_chat_id: i64,
        name: &str,
        created_by: Option<i64>,
        invite_code: &str,
    ) -> Result<Group> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO groups (telegram_chat_id, name, created_by, invite_code)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(telegram_chat_id) DO UPDATE SET
                     name = excluded.name,
                     is_active = 1",
                params![telegram_chat_id, name, created_by, invite_code],
            )?;
            query_group_by_chat(conn, telegram_chat_id)?
                .ok_or_else(|| anyhow::anyhow!("group {} vanished after upsert", telegram_chat_id))
        })
    }

    pub fn get_group(&self, id: i64) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM groups g WHERE g.id = ?1", GROUP_COLUMNS),
                [id],
                group_from_row,
            )
            .optional()
        })
    }

    pub fn get_group_by_chat(&self, telegram_chat_id: i64) -> Result<Option<Group>> {
        self.with_conn(|conn| query_group_by_chat(conn, telegram_chat_id))
    }

    pub fn get_group_by_invite_code(&self, code: &str) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM groups g WHERE g.invite_code = ?1 AND g.is_active = 1",
                    GROUP_COLUMNS
                ),
                [code.trim().to_uppercase()],
                group_from_row,
            )
            .optional()
        })
    }

    pub fn invite_code_exists(&self, code: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM groups WHERE invite_code = ?1",
                [code],
                |row| row.get(0),
            )?;
            Ok(n > 0)
        })
    }

    /// Bot was removed from the chat. Memberships and history stay.
    pub fn deactivate_group(&self, telegram_chat_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE groups SET is_active = 0 WHERE telegram_chat_id = ?1 AND is_active = 1",
                [telegram_chat_id],
            )?;
            Ok(changed == 1)
        })
    }

    // -- Memberships --

    /// Returns false if the user was already a member.
    pub fn join_group(&self, user_id: i64, group_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO memberships (user_id, group_id) VALUES (?1, ?2)",
                params![user_id, group_id],
            )?;
            Ok(changed == 1)
        })
    }

    /// Active groups the user belongs to, oldest membership first.
    pub fn get_user_groups(&self, user_id: i64) -> Result<Vec<Group>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM groups g
                 JOIN memberships m ON m.group_id = g.id
                 WHERE m.user_id = ?1 AND g.is_active = 1
                 ORDER BY m.joined_at, m.id",
                GROUP_COLUMNS
            ))?;
            let rows = stmt
                .query_map([user_id], group_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_group_members(&self, group_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users u
                 JOIN memberships m ON m.user_id = u.id
                 WHERE m.group_id = ?1
                 ORDER BY m.joined_at, m.id",
                USER_COLUMNS
            ))?;
            let rows = stmt
                .query_map([group_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every member of the group with their check-in state for `date`.
    pub fn group_day_summary(&self, group_id: i64, date: NaiveDate) -> Result<Vec<MemberDay>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, COALESCE(u.first_name, u.username, 'Someone'), c.completed
                 FROM memberships m
                 JOIN users u ON u.id = m.user_id
                 LEFT JOIN checkins c
                     ON c.user_id = u.id AND c.group_id = m.group_id AND c.check_date = ?2
                 WHERE m.group_id = ?1
                 ORDER BY m.joined_at, m.id",
            )?;
            let rows = stmt
                .query_map(params![group_id, format_date(date)], |row| {
                    Ok(MemberDay {
                        user_id: row.get(0)?,
                        display_name: row.get(1)?,
                        completed: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_group_by_chat(conn: &Connection, telegram_chat_id: i64) -> Result<Option<Group>> {
    conn.query_row(
        &format!("SELECT {} FROM groups g WHERE g.telegram_chat_id = ?1", GROUP_COLUMNS),
        [telegram_chat_id],
        group_from_row,
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::NaiveDate;

    #[test]
    fn upsert_keeps_invite_code_and_reactivates() {
        let db = Database::open_in_memory().unwrap();
        let g = db.upsert_group(-100, "Dojo", None, "ABC123").unwrap();
        assert!(g.is_active);

        assert!(db.deactivate_group(-100).unwrap());
        assert!(!db.get_group(g.id).unwrap().unwrap().is_active);

        let again = db.upsert_group(-100, "Dojo 2", None, "ZZZ999").unwrap();
        assert_eq!(again.id, g.id);
        assert_eq!(again.invite_code, "ABC123");
        assert_eq!(again.name, "Dojo 2");
        assert!(again.is_active);
    }

    #[test]
    fn invite_lookup_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.upsert_group(-1, "Dojo", None, "ABC123").unwrap();
        assert!(db.get_group_by_invite_code(" abc123 ").unwrap().is_some());
        assert!(db.get_group_by_invite_code("NOPE00").unwrap().is_none());
        assert!(db.invite_code_exists("ABC123").unwrap());
    }

    #[test]
    fn membership_is_unique() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, Some("Ana")).unwrap();
        let g = db.upsert_group(-1, "Dojo", Some(user.id), "ABC123").unwrap();

        assert!(db.join_group(user.id, g.id).unwrap());
        assert!(!db.join_group(user.id, g.id).unwrap());
        assert_eq!(db.get_user_groups(user.id).unwrap().len(), 1);
        assert_eq!(db.get_group_members(g.id).unwrap().len(), 1);

        db.deactivate_group(-1).unwrap();
        assert!(db.get_user_groups(user.id).unwrap().is_empty());
    }

    #[test]
    fn day_summary_marks_pending_members() {
        let db = Database::open_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let ana = db.upsert_user(1, None, Some("Ana")).unwrap();
        let ben = db.upsert_user(2, Some("ben"), None).unwrap();
        let g = db.upsert_group(-1, "Dojo", None, "ABC123").unwrap();
        db.join_group(ana.id, g.id).unwrap();
        db.join_group(ben.id, g.id).unwrap();
        db.record_checkin(ana.id, g.id, today, true, &[]).unwrap();

        let summary = db.group_day_summary(g.id, today).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].completed, Some(true));
        assert_eq!(summary[1].display_name, "ben");
        assert_eq!(summary[1].completed, None);
    }
}
