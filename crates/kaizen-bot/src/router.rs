use tracing::{debug, error, info, warn};

use kaizen_session::{Feature, Session};
use kaizen_types::callbacks::{AutomationItem, MenuItem};
use kaizen_types::{BotError, BotResult, CallbackAction};

use crate::commands::Command;
use crate::messenger::{Chat, IncomingCallback, IncomingMessage, MembershipChange, Sender};
use crate::state::Bot;

/// What a callback handler wants shown in the small toast above the
/// keyboard.
pub(crate) type Toast = Option<String>;

impl Bot {
    /// Entry point for every incoming message. Errors are logged and turned
    /// into a reply; nothing propagates to the transport.
    pub async fn handle_message(&self, msg: IncomingMessage) {
        let result = match msg.text.as_deref().and_then(Command::parse) {
            Some(cmd) => {
                debug!(command = cmd.name(), user = msg.from.telegram_id, "Command");
                self.dispatch_command(&msg.chat, &msg.from, cmd).await
            }
            None => self.dispatch_plain(&msg).await,
        };

        if let Err(e) = result {
            self.report_error(msg.chat.id, msg.from.telegram_id, &e).await;
        }
    }

    pub async fn handle_callback(&self, cb: IncomingCallback) {
        let Some(action) = CallbackAction::parse(&cb.data) else {
            debug!(data = %cb.data, "Unknown callback data");
            self.answer(&cb.id, Some("Unknown action")).await;
            return;
        };

        match self.dispatch_callback(&cb, action).await {
            Ok(toast) => self.answer(&cb.id, toast.as_deref()).await,
            Err(e) => {
                log_error(cb.from.telegram_id, &e);
                self.answer(&cb.id, Some(&e.user_message())).await;
            }
        }
    }

    pub async fn handle_membership(&self, change: MembershipChange) {
        let (chat_id, result) = match change {
            MembershipChange::Added { chat, by } => (chat.id, self.bot_added(&chat, &by).await),
            MembershipChange::Removed { chat_id } => (chat_id, self.bot_removed(chat_id).await),
        };
        if let Err(e) = result {
            error!("Membership update for chat {} failed: {}", chat_id, e);
        }
    }

    async fn dispatch_command(&self, chat: &Chat, from: &Sender, cmd: Command) -> BotResult<()> {
        match cmd {
            Command::Start => self.start(chat, from).await,
            Command::Checkin => {
                self.limiter.check(from.telegram_id, Feature::Checkin)?;
                self.checkin(chat, from).await
            }
            Command::AddTask(name) => self.add_task(chat, from, name).await,
            Command::RemoveTask => self.remove_task_menu(chat, from).await,
            Command::View => self.view(chat, from).await,
            Command::Stats => self.stats(chat, from).await,
            Command::Groups => self.groups(chat, from).await,
            Command::Join(code) => self.join(chat, from, code).await,
            Command::Quote => self.quote(chat).await,
            Command::Today => self.today_summary(chat).await,
            Command::Leaderboard => self.leaderboard(chat).await,
            Command::Remind(arg) => self.remind(chat, from, arg).await,
            Command::RemindMe(arg) => self.remind_me(chat, from, arg).await,
            Command::Freeze(arg) => self.freeze(chat, from, arg).await,
            Command::Buddy(arg) => self.buddy(chat, from, arg).await,
            Command::Timezone(arg) => self.timezone(chat, from, arg).await,
            Command::Report => self.report(chat, from).await,
            Command::Insights => {
                self.limiter.check(from.telegram_id, Feature::Insights)?;
                self.insights(chat, from).await
            }
            Command::Ask(question) => {
                self.limiter.check(from.telegram_id, Feature::Ask)?;
                self.ask(chat, from, question).await
            }
            Command::Research(topic) => self.research(chat, from, topic).await,
            Command::Scrape(url) => self.scrape(chat, from, url).await,
            Command::Calendar => self.calendar_menu(chat).await,
            Command::Automate => self.automate(chat).await,
            Command::RateLimits => self.rate_limits(chat, from).await,
            Command::Cancel => self.cancel(chat, from).await,
            Command::Help => self.help(chat).await,
            Command::Menu => self.menu(chat).await,
            Command::Unknown(name) => {
                debug!("Ignoring unknown command /{}", name);
                if chat.is_private() {
                    self.say(chat.id, "🤔 I don't know that command. Try /help.").await?;
                }
                Ok(())
            }
        }
    }

    /// Free text and voice notes, routed by whatever the user is in the
    /// middle of.
    async fn dispatch_plain(&self, msg: &IncomingMessage) -> BotResult<()> {
        if let Some(voice) = &msg.voice {
            if !msg.chat.is_private() {
                return Ok(());
            }
            self.limiter.check(msg.from.telegram_id, Feature::Voice)?;
            return self.voice(&msg.chat, &msg.from, voice).await;
        }

        let Some(text) = msg.text.as_deref() else {
            return Ok(());
        };
        if !msg.chat.is_private() {
            return Ok(());
        }

        match self.session(msg.from.telegram_id).await? {
            Some(Session::Onboarding(onboarding)) => {
                self.onboarding_text(&msg.chat, &msg.from, onboarding, text).await
            }
            Some(Session::AddingTask) => self.task_name_text(&msg.chat, &msg.from, text).await,
            Some(Session::Automation(step)) => {
                self.automation_text(&msg.chat, &msg.from, step, text).await
            }
            Some(Session::Checkin(_)) => {
                self.say(msg.chat.id, "☝️ Tap the tasks above, then Submit Check-in.")
                    .await
            }
            None => {
                debug!(user = msg.from.telegram_id, "Ignoring text outside any flow");
                Ok(())
            }
        }
    }

    async fn dispatch_callback(&self, cb: &IncomingCallback, action: CallbackAction) -> BotResult<Toast> {
        // Menu shortcuts only appear in private chats
        let chat = Chat::private(cb.message.map_or(cb.from.telegram_id, |(chat_id, _)| chat_id));
        let from = &cb.from;

        match action {
            CallbackAction::ReminderHour(hour) => self.reminder_hour_picked(cb, hour).await,
            CallbackAction::TasksDone => self.tasks_done(cb).await,
            CallbackAction::ToggleTask(task_id) => self.toggle_task(cb, task_id).await,
            CallbackAction::SubmitCheckin(group_id) => self.submit_checkin(cb, group_id).await,
            CallbackAction::SelectGroup(group_id) | CallbackAction::StartCheckin(group_id) => {
                self.open_checklist_for(cb, group_id).await
            }
            CallbackAction::RemoveTask(task_id) => self.remove_task(cb, task_id).await,
            CallbackAction::Menu(item) => {
                match item {
                    MenuItem::Checkin => {
                        self.limiter.check(from.telegram_id, Feature::Checkin)?;
                        self.checkin(&chat, from).await?
                    }
                    MenuItem::View => self.view(&chat, from).await?,
                    MenuItem::Stats => self.stats(&chat, from).await?,
                    MenuItem::Quote => self.quote(&chat).await?,
                    MenuItem::Groups => self.groups(&chat, from).await?,
                    MenuItem::Help => self.help(&chat).await?,
                }
                Ok(None)
            }
            CallbackAction::Automation(item) => match item {
                AutomationItem::Research => self.prompt_research_topic(&chat, from).await,
                AutomationItem::Scrape => self.prompt_scrape_url(&chat, from).await,
                AutomationItem::Calendar => {
                    self.calendar_menu(&chat).await?;
                    Ok(None)
                }
                AutomationItem::CalendarCreate => self.prompt_event_summary(&chat, from).await,
                AutomationItem::CalendarList => self.list_events(&chat).await,
            },
            CallbackAction::ResearchDepth(depth) => self.research_depth_picked(cb, depth).await,
            CallbackAction::SaveResearch(target) => self.save_research(cb, target).await,
        }
    }

    async fn report_error(&self, chat_id: i64, telegram_id: i64, e: &BotError) {
        log_error(telegram_id, e);
        if let Err(send_err) = self.messenger.send(chat_id, &e.user_message(), None).await {
            warn!("Failed to deliver error reply to chat {}: {}", chat_id, send_err);
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>) {
        if let Err(e) = self.messenger.answer_callback(callback_id, text).await {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }
    }
}

fn log_error(telegram_id: i64, e: &BotError) {
    match e {
        BotError::Internal(err) => error!(user = telegram_id, "Handler failed: {:#}", err),
        BotError::Integration(msg) => warn!(user = telegram_id, "Integration failed: {}", msg),
        other => info!(user = telegram_id, "Request refused: {}", other),
    }
}
