use anyhow::Result;
use chrono::NaiveDate;
use kaizen_types::models::{Task, TaskStat};
use rusqlite::{Connection, params};

use super::OptionalExt;
use crate::Database;
use crate::models::{TASK_COLUMNS, format_date, task_from_row};

impl Database {
    // -- Tasks --

    pub fn get_active_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        self.with_conn(|conn| query_active_tasks(conn, user_id))
    }

    pub fn add_task(&self, user_id: i64, name: &str) -> Result<Task> {
        self.with_conn_mut(|conn| {
            let id: i64 = conn.query_row(
                "INSERT INTO tasks (user_id, name) VALUES (?1, ?2) RETURNING id",
                params![user_id, name],
                |row| row.get(0),
            )?;
            let task = conn.query_row(
                &format!("SELECT {} FROM tasks t WHERE t.id = ?1", TASK_COLUMNS),
                [id],
                task_from_row,
            )?;
            Ok(task)
        })
    }

    /// Soft delete. Only the owner's own active task is touched; returns the
    /// task name when something was removed.
    pub fn deactivate_task(&self, user_id: i64, task_id: i64) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            conn.query_row(
                "UPDATE tasks SET active = 0
                 WHERE id = ?1 AND user_id = ?2 AND active = 1
                 RETURNING name",
                params![task_id, user_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Per-task completion counts for check-ins on or after `since`.
    /// Inactive tasks with history in the range are included.
    pub fn task_stats(&self, user_id: i64, since: NaiveDate) -> Result<Vec<TaskStat>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, COUNT(tc.id), COALESCE(SUM(tc.completed), 0)
                 FROM tasks t
                 JOIN task_completions tc ON tc.task_id = t.id
                 JOIN checkins c ON c.id = tc.checkin_id
                 WHERE t.user_id = ?1 AND c.check_date >= ?2
                 GROUP BY t.id, t.name
                 ORDER BY t.id",
            )?;
            let rows = stmt
                .query_map(params![user_id, format_date(since)], |row| {
                    Ok(TaskStat {
                        task_id: row.get(0)?,
                        name: row.get(1)?,
                        total: row.get(2)?,
                        completed: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_active_tasks(conn: &Connection, user_id: i64) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM tasks t WHERE t.user_id = ?1 AND t.active = 1 ORDER BY t.id",
        TASK_COLUMNS
    ))?;
    let rows = stmt
        .query_map([user_id], task_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn soft_delete_checks_owner() {
        let db = Database::open_in_memory().unwrap();
        let ana = db.upsert_user(1, None, Some("Ana")).unwrap();
        let ben = db.upsert_user(2, None, Some("Ben")).unwrap();
        let task = db.add_task(ana.id, "Meditate").unwrap();

        assert_eq!(db.deactivate_task(ben.id, task.id).unwrap(), None);
        assert_eq!(
            db.deactivate_task(ana.id, task.id).unwrap().as_deref(),
            Some("Meditate")
        );
        assert_eq!(db.deactivate_task(ana.id, task.id).unwrap(), None);
        assert!(db.get_active_tasks(ana.id).unwrap().is_empty());
    }

    #[test]
    fn tasks_come_back_in_creation_order() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_user(1, None, None).unwrap();
        db.add_task(user.id, "First").unwrap();
        db.add_task(user.id, "Second").unwrap();
        let names: Vec<String> = db
            .get_active_tasks(user.id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["First", "Second"]);
    }
}
