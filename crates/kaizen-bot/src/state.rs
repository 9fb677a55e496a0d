use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::error;

use kaizen_ai::Integrations;
use kaizen_core::dates::DEFAULT_REMINDER_HOURS;
use kaizen_db::Database;
use kaizen_session::{RateLimiter, Session, SessionStore};
use kaizen_types::models::User;
use kaizen_types::{BotError, BotResult, Prerequisite};

use crate::messenger::{Keyboard, Messenger, Sender};

pub type AppState = Arc<Bot>;

/// Telegram refuses messages longer than 4096 characters.
const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Clone)]
pub struct BotSettings {
    /// UTC hours at which the daily reminder sweep runs, and the only hours
    /// a user may pick.
    pub reminder_hours: Vec<u8>,
    pub clock: fn() -> DateTime<Utc>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            reminder_hours: DEFAULT_REMINDER_HOURS.to_vec(),
            clock: Utc::now,
        }
    }
}

/// Everything a handler needs. Cheap to share behind an `Arc`.
pub struct Bot {
    pub db: Arc<Database>,
    pub sessions: Arc<dyn SessionStore>,
    pub messenger: Arc<dyn Messenger>,
    pub ai: Arc<Integrations>,
    pub limiter: RateLimiter,
    pub settings: BotSettings,
    pub(crate) sweep_lock: tokio::sync::Mutex<()>,
}

impl Bot {
    pub fn new(
        db: Arc<Database>,
        sessions: Arc<dyn SessionStore>,
        messenger: Arc<dyn Messenger>,
        ai: Arc<Integrations>,
        settings: BotSettings,
    ) -> Self {
        Self {
            db,
            sessions,
            messenger,
            ai,
            limiter: RateLimiter::new(),
            settings,
            sweep_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.settings.clock)()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Run a blocking database call off the async runtime.
    pub(crate) async fn db<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                anyhow::anyhow!("database task failed: {}", e)
            })?
    }

    pub(crate) async fn say(&self, chat_id: i64, text: &str) -> BotResult<()> {
        self.messenger.send(chat_id, text, None).await?;
        Ok(())
    }

    pub(crate) async fn say_with(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> BotResult<()> {
        self.messenger.send(chat_id, text, Some(keyboard)).await?;
        Ok(())
    }

    /// Send text that may exceed one message, split on line boundaries.
    pub(crate) async fn say_long(&self, chat_id: i64, text: &str) -> BotResult<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            self.messenger.send(chat_id, &chunk, None).await?;
        }
        Ok(())
    }

    /// Replace the message a button sits on, or send a fresh one when
    /// Telegram no longer has it.
    pub(crate) async fn replace(
        &self,
        chat_id: i64,
        message: Option<(i64, i32)>,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> BotResult<()> {
        match message {
            Some((chat, message_id)) => self.messenger.edit(chat, message_id, text, keyboard).await?,
            None => {
                self.messenger.send(chat_id, text, keyboard).await?;
            }
        }
        Ok(())
    }

    /// Create or refresh the user row for whoever sent the update.
    pub(crate) async fn upsert_sender(&self, from: &Sender) -> BotResult<User> {
        let from = from.clone();
        let user = self
            .db(move |db| {
                db.upsert_user(
                    from.telegram_id,
                    from.username.as_deref(),
                    from.first_name.as_deref(),
                )
            })
            .await?;
        Ok(user)
    }

    pub(crate) async fn require_user(&self, telegram_id: i64) -> BotResult<User> {
        self.db(move |db| db.get_user_by_telegram_id(telegram_id))
            .await?
            .ok_or(BotError::Prerequisite(Prerequisite::Account))
    }

    pub(crate) async fn session(&self, telegram_id: i64) -> BotResult<Option<Session>> {
        Ok(self.sessions.get(telegram_id).await?)
    }
}

/// Split on newlines so no chunk exceeds `max_chars`. A single line longer
/// than the limit is cut at a char boundary.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let mut line = line;
        let mut line_len = line.chars().count();

        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        while line_len > max_chars {
            let cut = line
                .char_indices()
                .nth(max_chars)
                .map_or(line.len(), |(idx, _)| idx);
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
            line_len -= max_chars;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_message("hello\nworld", 100), vec!["hello\nworld"]);
    }

    #[test]
    fn splits_on_lines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n", "cccc"]);
    }

    #[test]
    fn long_line_is_cut_on_char_boundary() {
        let text = "é".repeat(25);
        let chunks = split_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(split_message("", 10).is_empty());
    }
}
