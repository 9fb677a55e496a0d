//! Row mappers: every query hands its rows to one of these and gets a typed
//! `kaizen_types` model back. Column order follows the `*_COLUMNS` lists.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use kaizen_types::models::{
    BuddyRequest, BuddyRequestStatus, Checkin, Group, Reminder, Task, User,
};
use rusqlite::Row;
use rusqlite::types::Type;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const USER_COLUMNS: &str = "u.id, u.telegram_id, u.username, u.first_name, u.commitment, \
     u.reminder_hour, u.timezone, u.streak_freezes_available, u.last_freeze_reset_date, \
     u.freeze_used_on_date, u.created_at";

pub const GROUP_COLUMNS: &str =
    "g.id, g.telegram_chat_id, g.name, g.created_by, g.invite_code, g.is_active, g.created_at";

pub const TASK_COLUMNS: &str = "t.id, t.user_id, t.name, t.active, t.created_at";

pub const CHECKIN_COLUMNS: &str =
    "c.id, c.user_id, c.group_id, c.check_date, c.completed, c.checked_in_at";

pub const REMINDER_COLUMNS: &str = "r.id, r.user_id, r.telegram_id, r.title, r.description, \
     r.reminder_time, r.calendar_event_id, r.is_sent";

pub const BUDDY_REQUEST_COLUMNS: &str = "b.id, b.user_id, b.status, b.created_at, b.matched_at";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    match NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(_) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e)),
    }
}

pub(crate) fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn get_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_timestamp(idx, &s)
}

pub(crate) fn get_opt_timestamp(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| parse_timestamp(idx, &s)).transpose()
}

pub fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        commitment: row.get(4)?,
        reminder_hour: row.get(5)?,
        timezone: row.get(6)?,
        streak_freezes_available: row.get(7)?,
        last_freeze_reset_date: get_opt_date(row, 8)?,
        freeze_used_on_date: get_opt_date(row, 9)?,
        created_at: get_timestamp(row, 10)?,
    })
}

pub fn group_from_row(row: &Row) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        telegram_chat_id: row.get(1)?,
        name: row.get(2)?,
        created_by: row.get(3)?,
        invite_code: row.get(4)?,
        is_active: row.get(5)?,
        created_at: get_timestamp(row, 6)?,
    })
}

pub fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        active: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
    })
}

pub fn checkin_from_row(row: &Row) -> rusqlite::Result<Checkin> {
    Ok(Checkin {
        id: row.get(0)?,
        user_id: row.get(1)?,
        group_id: row.get(2)?,
        check_date: get_date(row, 3)?,
        completed: row.get(4)?,
        checked_in_at: get_timestamp(row, 5)?,
    })
}

pub fn reminder_from_row(row: &Row) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        telegram_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        reminder_time: get_timestamp(row, 5)?,
        calendar_event_id: row.get(6)?,
        is_sent: row.get(7)?,
    })
}

pub fn buddy_request_from_row(row: &Row) -> rusqlite::Result<BuddyRequest> {
    let status: String = row.get(2)?;
    let status = BuddyRequestStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown buddy request status {:?}", status).into(),
        )
    })?;
    Ok(BuddyRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        status,
        created_at: get_timestamp(row, 3)?,
        matched_at: get_opt_timestamp(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn timestamps_accept_sqlite_and_rfc3339() {
        let conn = Connection::open_in_memory().unwrap();
        let (a, b) = conn
            .query_row(
                "SELECT '2024-05-01 10:20:30', '2024-05-01T10:20:30Z'",
                [],
                |row| Ok((get_timestamp(row, 0)?, get_timestamp(row, 1)?)),
            )
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(format_timestamp(a), "2024-05-01 10:20:30");
    }

    #[test]
    fn bad_dates_are_conversion_errors() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT 'yesterday'", [], |row| get_date(row, 0))
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(0, _, _)));

        let none = conn
            .query_row("SELECT NULL", [], |row| get_opt_date(row, 0))
            .unwrap();
        assert_eq!(none, None);
    }
}
