use kaizen_core::checkin::{MAX_TASKS, Onboarding, OnboardingError};
use kaizen_core::dates::{format_hour_12, parse_reminder_hour};
use kaizen_session::Session;
use kaizen_types::{BotError, BotResult, Prerequisite};
use tracing::info;

use crate::keyboards;
use crate::messenger::{Chat, IncomingCallback, Sender};
use crate::router::Toast;
use crate::state::Bot;

const WELCOME: &str = "🎌 Welcome to Kaizen!\n\n\
    改善 (Kaizen) means continuous improvement: small steps, taken every day.\n\n\
    I'll help you stick to your daily tasks, check in with your group and build a streak.";

const REMINDER_PROMPT: &str = "⏰ When should I remind you to check in? (UTC)";

fn numbered(tasks: &[String]) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Bot {
    // -- /start --

    pub(crate) async fn start(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        if !chat.is_private() {
            return Err(BotError::Prerequisite(Prerequisite::PrivateChat));
        }
        let user = self.upsert_sender(from).await?;
        let user_id = user.id;
        let tasks = self.db(move |db| db.get_active_tasks(user_id)).await?;

        if !tasks.is_empty() {
            let names: Vec<String> = tasks.into_iter().map(|t| t.name).collect();
            let text = format!(
                "Welcome back, {}! 👋\n\nYour daily tasks:\n{}\n\n\
                 Use /checkin to check in today, or /view to see your progress.\n\n\
                 Manage your tasks: /addtask or /removetask",
                user.display_name(),
                numbered(&names)
            );
            return self.say(chat.id, &text).await;
        }

        self.sessions
            .put(from.telegram_id, Session::Onboarding(Onboarding::default()))
            .await?;
        info!(user = from.telegram_id, "Onboarding started");

        self.say(chat.id, WELCOME).await?;
        self.say(
            chat.id,
            &format!(
                "🎯 Let's set up your daily tasks!\n\n\
                 You can commit to up to {} daily tasks.\n\n\
                 Type your first task (e.g. \"Exercise for 30 minutes\")",
                MAX_TASKS
            ),
        )
        .await
    }

    pub(crate) async fn onboarding_text(
        &self,
        chat: &Chat,
        from: &Sender,
        mut onboarding: Onboarding,
        text: &str,
    ) -> BotResult<()> {
        // Typing a time instead of tapping a button is fine too
        if let Onboarding::AwaitingReminder { tasks } = &onboarding {
            let Some(hour) = parse_reminder_hour(text, &self.settings.reminder_hours) else {
                return self
                    .say_with(
                        chat.id,
                        "Please pick one of the reminder times below.",
                        keyboards::reminder_hours(&self.settings.reminder_hours, true),
                    )
                    .await;
            };
            return self.finish_onboarding(chat.id, from, tasks.clone(), Some(hour)).await;
        }

        let count = onboarding
            .add_task(text)
            .map_err(|e| BotError::validation(e.to_string()))?;

        if onboarding.is_full() {
            onboarding
                .finish_tasks()
                .map_err(|e| BotError::validation(e.to_string()))?;
            let listed = numbered(onboarding.tasks());
            self.sessions
                .put(from.telegram_id, Session::Onboarding(onboarding))
                .await?;
            self.say(
                chat.id,
                &format!(
                    "✅ Tasks added:\n{}\n\nYou've reached the maximum of {} tasks!",
                    listed, MAX_TASKS
                ),
            )
            .await?;
            return self
                .say_with(
                    chat.id,
                    REMINDER_PROMPT,
                    keyboards::reminder_hours(&self.settings.reminder_hours, true),
                )
                .await;
        }

        let listed = numbered(onboarding.tasks());
        self.sessions
            .put(from.telegram_id, Session::Onboarding(onboarding))
            .await?;
        self.say_with(
            chat.id,
            &format!(
                "✅ Task {} added!\n\nCurrent tasks:\n{}\n\nType another task or click Done to continue.",
                count, listed
            ),
            keyboards::tasks_done(count),
        )
        .await
    }

    pub(crate) async fn tasks_done(&self, cb: &IncomingCallback) -> BotResult<Toast> {
        let Some(Session::Onboarding(mut onboarding)) = self.session(cb.from.telegram_id).await?
        else {
            return Ok(Some("Please start with /start".into()));
        };

        match onboarding.finish_tasks() {
            Ok(()) => {}
            Err(OnboardingError::NoTasks) => return Ok(Some("Please add at least one task first!".into())),
            Err(_) => return Ok(Some("Please start with /start".into())),
        }

        let text = format!("✅ Your tasks:\n{}", numbered(onboarding.tasks()));
        self.sessions
            .put(cb.from.telegram_id, Session::Onboarding(onboarding))
            .await?;

        let chat_id = cb.message.map_or(cb.from.telegram_id, |(chat_id, _)| chat_id);
        self.replace(chat_id, cb.message, &text, None).await?;
        self.say_with(
            chat_id,
            REMINDER_PROMPT,
            keyboards::reminder_hours(&self.settings.reminder_hours, true),
        )
        .await?;
        Ok(Some("Great!".into()))
    }

    /// Reminder keyboard: finishes onboarding, or changes the hour for an
    /// existing user (`/remind`).
    pub(crate) async fn reminder_hour_picked(&self, cb: &IncomingCallback, hour: Option<u8>) -> BotResult<Toast> {
        if let Some(h) = hour {
            if !self.settings.reminder_hours.contains(&h) {
                return Ok(Some("That time is no longer available.".into()));
            }
        }
        let chat_id = cb.message.map_or(cb.from.telegram_id, |(chat_id, _)| chat_id);

        match self.session(cb.from.telegram_id).await? {
            Some(Session::Onboarding(Onboarding::AwaitingReminder { tasks })) => {
                self.finish_onboarding(chat_id, &cb.from, tasks, hour).await?;
                Ok(Some("All set!".into()))
            }
            Some(Session::Onboarding(_)) => Ok(Some("Add your tasks first, then tap Done.".into())),
            _ => {
                let user = self.require_user(cb.from.telegram_id).await?;
                let user_id = user.id;
                self.db(move |db| db.set_reminder_hour(user_id, hour)).await?;
                self.replace(chat_id, cb.message, &reminder_confirmation(hour), None)
                    .await?;
                Ok(Some("Saved".into()))
            }
        }
    }

    async fn finish_onboarding(
        &self,
        chat_id: i64,
        from: &Sender,
        tasks: Vec<String>,
        hour: Option<u8>,
    ) -> BotResult<()> {
        let user = self.upsert_sender(from).await?;
        let user_id = user.id;
        let saved = tasks.clone();
        self.db(move |db| db.complete_onboarding(user_id, &saved, hour))
            .await?;
        self.sessions.clear(from.telegram_id).await?;
        info!(user = from.telegram_id, tasks = tasks.len(), "Onboarding complete");

        let reminder = hour.map_or_else(|| "off".to_string(), |h| format!("{} UTC", format_hour_12(h)));
        let text = format!(
            "🎉 You're all set!\n\n\
             Your daily tasks:\n{}\n\n\
             Daily reminder: {}\n\n\
             Next steps:\n\
             1. Add me to a Telegram group with friends 👥\n\
             2. Use /checkin daily to track your progress 📝\n\
             3. Build your streak! 🔥\n\n\
             Commands:\n\
             /checkin - Daily check-in\n\
             /view - See your progress\n\
             /addtask - Add more tasks\n\
             /removetask - Remove a task\n\n\
             Let's build consistency together! 改善",
            numbered(&tasks),
            reminder
        );
        self.say(chat_id, &text).await
    }
}

pub(crate) fn reminder_confirmation(hour: Option<u8>) -> String {
    match hour {
        Some(h) => format!("⏰ Daily reminder set for {} UTC.", format_hour_12(h)),
        None => "🔕 Daily reminders turned off.".to_string(),
    }
}
