use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                       INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id              INTEGER NOT NULL UNIQUE,
                username                 TEXT,
                first_name               TEXT,
                commitment               TEXT,
                reminder_hour            INTEGER CHECK (reminder_hour BETWEEN 0 AND 23),
                timezone                 TEXT NOT NULL DEFAULT 'UTC',
                streak_freezes_available INTEGER NOT NULL DEFAULT 1,
                last_freeze_reset_date   TEXT,
                freeze_used_on_date      TEXT,
                created_at               TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at               TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE groups (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_chat_id INTEGER NOT NULL UNIQUE,
                name             TEXT NOT NULL,
                created_by       INTEGER REFERENCES users(id),
                invite_code      TEXT NOT NULL UNIQUE,
                is_active        INTEGER NOT NULL DEFAULT 1,
                created_at       TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE memberships (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id   INTEGER NOT NULL REFERENCES users(id),
                group_id  INTEGER NOT NULL REFERENCES groups(id),
                joined_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (user_id, group_id)
            );

            CREATE TABLE tasks (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(id),
                name       TEXT NOT NULL,
                active     INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_tasks_user ON tasks(user_id, active);

            CREATE TABLE checkins (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       INTEGER NOT NULL REFERENCES users(id),
                group_id      INTEGER NOT NULL REFERENCES groups(id),
                check_date    TEXT NOT NULL,
                completed     INTEGER NOT NULL,
                checked_in_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (user_id, group_id, check_date)
            );

            CREATE INDEX idx_checkins_user_date ON checkins(user_id, check_date);

            CREATE TABLE task_completions (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id    INTEGER NOT NULL REFERENCES tasks(id),
                checkin_id INTEGER NOT NULL REFERENCES checkins(id) ON DELETE CASCADE,
                completed  INTEGER NOT NULL,
                UNIQUE (task_id, checkin_id)
            );

            CREATE TABLE buddy_requests (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id    INTEGER NOT NULL REFERENCES users(id),
                status     TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                matched_at TEXT
            );

            CREATE INDEX idx_buddy_requests_status ON buddy_requests(status, created_at);

            CREATE TABLE buddy_matches (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                user1_id   INTEGER NOT NULL REFERENCES users(id),
                user2_id   INTEGER NOT NULL REFERENCES users(id),
                status     TEXT NOT NULL DEFAULT 'active',
                matched_at TEXT NOT NULL DEFAULT (datetime('now')),
                ended_at   TEXT,
                CHECK (user1_id < user2_id)
            );

            CREATE TABLE reminders (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id           INTEGER NOT NULL REFERENCES users(id),
                telegram_id       INTEGER NOT NULL,
                title             TEXT NOT NULL,
                description       TEXT,
                reminder_time     TEXT NOT NULL,
                calendar_event_id TEXT,
                is_sent           INTEGER NOT NULL DEFAULT 0,
                created_at        TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_reminders_due ON reminders(is_sent, reminder_time);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (conversation sessions)");
        conn.execute_batch(
            "
            CREATE TABLE sessions (
                telegram_id INTEGER PRIMARY KEY,
                kind        TEXT NOT NULL,
                payload     TEXT NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    if version < 3 {
        info!("Running migration v3 (streak freeze days)");
        conn.execute_batch(
            "
            CREATE TABLE streak_freezes (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                freeze_date TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (user_id, freeze_date)
            );

            INSERT INTO streak_freezes (user_id, freeze_date)
                SELECT id, freeze_used_on_date FROM users
                WHERE freeze_used_on_date IS NOT NULL;

            INSERT INTO schema_version (version) VALUES (3);
            ",
        )?;
    }

    Ok(())
}
