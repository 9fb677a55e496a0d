use kaizen_core::checkin::{MAX_TASKS, validate_task_name};
use kaizen_session::Session;
use kaizen_types::models::Task;
use kaizen_types::{BotError, BotResult, Prerequisite};
use tracing::info;

use crate::keyboards;
use crate::messenger::{Chat, IncomingCallback, Sender};
use crate::router::Toast;
use crate::state::Bot;

fn task_list(tasks: &[Task]) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn too_many() -> BotError {
    BotError::validation(format!(
        "❌ You've reached the maximum of {} tasks!\n\nRemove a task first using /removetask to add a new one.",
        MAX_TASKS
    ))
}

impl Bot {
    // -- /addtask --

    pub(crate) async fn add_task(&self, chat: &Chat, from: &Sender, name: Option<String>) -> BotResult<()> {
        if !chat.is_private() {
            return Err(BotError::Prerequisite(Prerequisite::PrivateChat));
        }
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let current = self.db(move |db| db.get_active_tasks(user_id)).await?;
        if current.len() >= MAX_TASKS {
            return Err(too_many());
        }

        if let Some(name) = name {
            return self.insert_task(chat.id, user_id, &name).await;
        }

        self.sessions.put(from.telegram_id, Session::AddingTask).await?;
        self.say(
            chat.id,
            &format!(
                "➕ Add a new task\n\nYou have {}/{} tasks.\n\nType your new task (e.g. \"Read 20 pages\")",
                current.len(),
                MAX_TASKS
            ),
        )
        .await
    }

    /// Next text after a bare `/addtask`. An invalid name keeps the prompt
    /// open.
    pub(crate) async fn task_name_text(&self, chat: &Chat, from: &Sender, text: &str) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        self.insert_task(chat.id, user.id, text).await?;
        self.sessions.clear(from.telegram_id).await?;
        Ok(())
    }

    async fn insert_task(&self, chat_id: i64, user_id: i64, raw: &str) -> BotResult<()> {
        let name = validate_task_name(raw).map_err(|e| BotError::validation(e.to_string()))?;

        let tasks = self
            .db(move |db| {
                if db.get_active_tasks(user_id)?.len() >= MAX_TASKS {
                    return Ok(None);
                }
                db.add_task(user_id, &name)?;
                db.get_active_tasks(user_id).map(Some)
            })
            .await?
            .ok_or_else(too_many)?;
        info!(user_id, count = tasks.len(), "Task added");

        self.say(
            chat_id,
            &format!(
                "✅ Task added!\n\nYour tasks ({}/{}):\n{}\n\nUse /checkin to track your progress!",
                tasks.len(),
                MAX_TASKS,
                task_list(&tasks)
            ),
        )
        .await
    }

    // -- /removetask --

    pub(crate) async fn remove_task_menu(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let tasks = self.db(move |db| db.get_active_tasks(user_id)).await?;
        if tasks.is_empty() {
            return Err(BotError::Prerequisite(Prerequisite::Tasks));
        }
        self.say_with(
            chat.id,
            "🗑️ Remove a task\n\nSelect a task to remove:",
            keyboards::remove_tasks(&tasks),
        )
        .await
    }

    pub(crate) async fn remove_task(&self, cb: &IncomingCallback, task_id: i64) -> BotResult<Toast> {
        let user = self.require_user(cb.from.telegram_id).await?;
        let user_id = user.id;
        let (removed, remaining) = self
            .db(move |db| {
                let removed = db.deactivate_task(user_id, task_id)?;
                Ok((removed, db.get_active_tasks(user_id)?))
            })
            .await?;

        let Some(name) = removed else {
            return Ok(Some("That task is already gone.".into()));
        };
        info!(user_id, task_id, "Task removed");

        let text = if remaining.is_empty() {
            format!(
                "✅ Task removed: {}\n\nYou have no active tasks. Use /addtask to add new tasks.",
                name
            )
        } else {
            format!(
                "✅ Task removed: {}\n\nYour remaining tasks:\n{}",
                name,
                task_list(&remaining)
            )
        };
        let chat_id = cb.message.map_or(cb.from.telegram_id, |(chat_id, _)| chat_id);
        self.replace(chat_id, cb.message, &text, None).await?;
        Ok(Some("Task removed!".into()))
    }
}
