use chrono::Duration;
use kaizen_ai::calendar::parse_event_start;
use kaizen_core::dates::{days_ago, local_time_label};
use kaizen_core::streak::{active_streak, completion_by_day};
use kaizen_session::{AutomationStep, Feature, Session};
use kaizen_types::callbacks::{ResearchDepth, SaveTarget};
use kaizen_types::{BotError, BotResult, Prerequisite};
use tracing::{info, warn};

use crate::keyboards;
use crate::messenger::{Chat, IncomingCallback, Sender, Voice};
use crate::router::Toast;
use crate::state::Bot;

const INSIGHT_DAYS: u32 = 30;
const SCRAPE_EXCERPT_CHARS: usize = 1500;
const UPCOMING_EVENTS: u32 = 10;
/// Lead time of the reminder created alongside a calendar event.
const EVENT_REMINDER_LEAD_MINUTES: i64 = 15;

const INSIGHTS_PROMPT: &str = "You are a habit coach for a daily accountability bot. \
    Given a user's recent check-in data, reply with 3 to 5 short, specific, encouraging insights: \
    patterns you notice, which tasks need attention, and one concrete suggestion for next week. \
    Plain text, no Markdown headings.";

fn require_private(chat: &Chat) -> BotResult<()> {
    if chat.is_private() {
        Ok(())
    } else {
        Err(BotError::Prerequisite(Prerequisite::PrivateChat))
    }
}

fn looks_like_url(text: &str) -> bool {
    let text = text.trim();
    (text.starts_with("http://") || text.starts_with("https://")) && !text.contains(char::is_whitespace)
}

impl Bot {
    // -- Chat --

    pub(crate) async fn ask(&self, chat: &Chat, from: &Sender, question: Option<String>) -> BotResult<()> {
        let Some(question) = question else {
            return Err(BotError::validation(
                "Usage: /ask <question>\nExample: /ask how do I stay motivated on weekends?",
            ));
        };
        let groq = self.ai.groq()?;
        self.say(chat.id, "💭 Thinking...").await?;
        let reply = groq.chat(from.telegram_id, &question, None).await?;
        self.say_long(chat.id, &reply).await
    }

    pub(crate) async fn insights(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let groq = self.ai.groq()?;
        let user_id = user.id;
        let today = self.today();
        let since = days_ago(today, INSIGHT_DAYS);

        let (history, tasks) = self
            .db(move |db| Ok((db.streak_history(user_id)?, db.task_stats(user_id, since)?)))
            .await?;
        let window: Vec<_> = history.records.iter().filter(|r| r.date >= since).copied().collect();
        if window.is_empty() {
            return self
                .say(
                    chat.id,
                    "❌ Not enough data\n\nCheck in for a few days with /checkin and I'll have something to say!",
                )
                .await;
        }

        let days = completion_by_day(&window);
        let completed = days.values().filter(|&&done| done).count();
        let recent = days.range(days_ago(today, 6)..).filter(|entry| *entry.1).count();
        let mut context = format!(
            "User: {}\nCurrent streak: {} days\nDays checked in (last {} days): {}\nDays completed: {}\n\
             Completed in the last 7 days: {}\n\nTasks:\n",
            user.display_name(),
            active_streak(&history.records, today, &history.frozen),
            INSIGHT_DAYS,
            days.len(),
            completed,
            recent
        );
        for t in &tasks {
            context.push_str(&format!("- {}: {}/{} ({}%)\n", t.name, t.completed, t.total, t.rate_percent()));
        }

        self.say(chat.id, "🤖 Analyzing your habits...").await?;
        let reply = groq.complete(INSIGHTS_PROMPT, &context, 0.7, 800).await?;
        self.say_long(chat.id, &format!("🧠 Your Habit Insights\n\n{}", reply.trim()))
            .await
    }

    /// Transcribe a voice note and answer it like `/ask`.
    pub(crate) async fn voice(&self, chat: &Chat, from: &Sender, voice: &Voice) -> BotResult<()> {
        let groq = self.ai.groq()?;
        self.say(chat.id, "🎙️ Transcribing your voice message...").await?;

        let audio = self.messenger.download_file(&voice.file_id).await?;
        let transcript = groq.transcribe(audio, "voice.ogg").await?;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(BotError::validation("🤷 I couldn't hear anything in that message."));
        }
        info!(user = from.telegram_id, secs = voice.duration_secs, "Voice message transcribed");
        self.say(chat.id, &format!("📝 Transcription:\n\"{}\"", transcript)).await?;

        let reply = groq.chat(from.telegram_id, transcript, None).await?;
        self.say_long(chat.id, &reply).await
    }

    // -- Hub --

    pub(crate) async fn automate(&self, chat: &Chat) -> BotResult<()> {
        require_private(chat)?;
        self.say_with(
            chat.id,
            "⚙️ Automation Hub\n\nWhat would you like to do?",
            keyboards::automation_hub(),
        )
        .await
    }

    // -- Research --

    pub(crate) async fn research(&self, chat: &Chat, from: &Sender, topic: Option<String>) -> BotResult<()> {
        require_private(chat)?;
        self.ai.perplexity()?;
        match topic {
            Some(topic) => self.ask_research_depth(chat.id, from.telegram_id, topic).await,
            None => {
                self.sessions
                    .put(from.telegram_id, Session::Automation(AutomationStep::AwaitingResearchTopic))
                    .await?;
                self.say(chat.id, "🔬 What should I research?\n\nSend a topic or question.")
                    .await
            }
        }
    }

    pub(crate) async fn prompt_research_topic(&self, chat: &Chat, from: &Sender) -> BotResult<Toast> {
        self.research(chat, from, None).await?;
        Ok(None)
    }

    async fn ask_research_depth(&self, chat_id: i64, telegram_id: i64, topic: String) -> BotResult<()> {
        let text = format!("🔬 Research: {}\n\nHow deep should I go?", topic);
        self.sessions
            .put(telegram_id, Session::Automation(AutomationStep::AwaitingResearchDepth { topic }))
            .await?;
        self.say_with(chat_id, &text, keyboards::research_depth()).await
    }

    pub(crate) async fn research_depth_picked(&self, cb: &IncomingCallback, depth: ResearchDepth) -> BotResult<Toast> {
        let telegram_id = cb.from.telegram_id;
        let Some(Session::Automation(AutomationStep::AwaitingResearchDepth { topic })) =
            self.session(telegram_id).await?
        else {
            return Ok(Some("Please start with /research".into()));
        };
        let perplexity = self.ai.perplexity()?;
        self.limiter.check(telegram_id, Feature::Research)?;

        let chat_id = cb.message.map_or(telegram_id, |(chat_id, _)| chat_id);
        self.replace(
            chat_id,
            cb.message,
            &format!("🔍 Researching \"{}\" ({})...", topic, depth.label()),
            None,
        )
        .await?;

        let research = perplexity.research(&topic, depth).await?;
        info!(user = telegram_id, depth = depth.label(), sources = research.citations.len(), "Research done");
        let report = research.to_markdown(&topic);
        self.say_long(chat_id, &report).await?;

        self.sessions
            .put(
                telegram_id,
                Session::Automation(AutomationStep::AwaitingSaveTarget {
                    topic,
                    depth,
                    report,
                    citations: research.citations,
                }),
            )
            .await?;
        self.say_with(chat_id, "💾 Where should I save this?", keyboards::save_targets())
            .await?;
        Ok(None)
    }

    /// The report stays in the session until it is saved somewhere, so a
    /// failed save can be retried with another target.
    pub(crate) async fn save_research(&self, cb: &IncomingCallback, target: SaveTarget) -> BotResult<Toast> {
        let telegram_id = cb.from.telegram_id;
        let Some(Session::Automation(AutomationStep::AwaitingSaveTarget { topic, depth, report, .. })) =
            self.session(telegram_id).await?
        else {
            return Ok(Some("Nothing to save. Start with /research".into()));
        };
        let chat_id = cb.message.map_or(telegram_id, |(chat_id, _)| chat_id);

        let (text, toast) = match target {
            SaveTarget::Notion => {
                let url = self.ai.notion()?.create_page(&topic, &report).await?;
                (format!("✅ Saved to Notion!\n\n🔗 {}", url), "Saved to Notion")
            }
            SaveTarget::Obsidian => {
                let path = self
                    .ai
                    .obsidian()?
                    .write_note(&topic, &report, &["research", depth.label()], self.now())
                    .await?;
                (format!("✅ Saved to Obsidian!\n\n📁 {}", path.display()), "Saved to Obsidian")
            }
            SaveTarget::Chat => ("💬 Kept in chat.".to_string(), "Done"),
        };

        self.sessions.clear(telegram_id).await?;
        self.replace(chat_id, cb.message, &text, None).await?;
        Ok(Some(toast.into()))
    }

    // -- Scrape --

    pub(crate) async fn scrape(&self, chat: &Chat, from: &Sender, url: Option<String>) -> BotResult<()> {
        require_private(chat)?;
        match url {
            Some(url) => self.scrape_url(chat.id, from.telegram_id, &url).await,
            None => {
                self.sessions
                    .put(from.telegram_id, Session::Automation(AutomationStep::AwaitingScrapeUrl))
                    .await?;
                self.say(chat.id, "🌐 Send me the URL of the page to extract.").await
            }
        }
    }

    pub(crate) async fn prompt_scrape_url(&self, chat: &Chat, from: &Sender) -> BotResult<Toast> {
        self.scrape(chat, from, None).await?;
        Ok(None)
    }

    async fn scrape_url(&self, chat_id: i64, telegram_id: i64, url: &str) -> BotResult<()> {
        if !looks_like_url(url) {
            return Err(BotError::validation(
                "❌ Please send a valid URL starting with http:// or https://",
            ));
        }
        let scraper = self.ai.scraper()?;
        self.limiter.check(telegram_id, Feature::Scrape)?;

        self.say(chat_id, "🌐 Fetching the page...").await?;
        let page = scraper.fetch(url).await?;
        info!(user = telegram_id, url = %page.url, chars = page.text.len(), "Page scraped");
        self.say_long(
            chat_id,
            &format!(
                "✅ Content Extracted\n\n📄 {}\n🔗 {}\n\n{}",
                page.title,
                page.url,
                page.excerpt(SCRAPE_EXCERPT_CHARS)
            ),
        )
        .await
    }

    // -- Calendar --

    pub(crate) async fn calendar_menu(&self, chat: &Chat) -> BotResult<()> {
        require_private(chat)?;
        self.ai.calendar()?;
        self.say_with(chat.id, "📅 Calendar\n\nWhat would you like to do?", keyboards::calendar_menu())
            .await
    }

    pub(crate) async fn prompt_event_summary(&self, chat: &Chat, from: &Sender) -> BotResult<Toast> {
        self.ai.calendar()?;
        self.sessions
            .put(from.telegram_id, Session::Automation(AutomationStep::AwaitingEventSummary))
            .await?;
        self.say(chat.id, "📝 What's the event called?").await?;
        Ok(None)
    }

    pub(crate) async fn list_events(&self, chat: &Chat) -> BotResult<Toast> {
        let calendar = self.ai.calendar()?;
        let events = calendar.upcoming(self.now(), UPCOMING_EVENTS).await?;
        if events.is_empty() {
            self.say(chat.id, "📅 No events in the next 7 days.").await?;
            return Ok(None);
        }

        let mut text = String::from("📅 Upcoming events (next 7 days)\n\n");
        for event in &events {
            text.push_str(&format!("• {}\n  🕐 {}\n", event.summary, event.start));
            if let Some(location) = &event.location {
                text.push_str(&format!("  📍 {}\n", location));
            }
        }
        self.say(chat.id, &text).await?;
        Ok(None)
    }

    async fn create_event(&self, chat_id: i64, from: &Sender, summary: String, input: &str) -> BotResult<()> {
        let Some(start) = parse_event_start(input) else {
            return Err(BotError::validation(
                "❌ I couldn't read that time. Use YYYY-MM-DD HH:MM (UTC), e.g. 2026-03-14 18:30",
            ));
        };
        if start <= self.now() {
            return Err(BotError::validation("❌ That time is in the past. Please pick a future time."));
        }
        let calendar = self.ai.calendar()?;
        self.limiter.check(from.telegram_id, Feature::Calendar)?;

        let event = calendar.create_event(&summary, start).await?;
        self.sessions.clear(from.telegram_id).await?;
        info!(user = from.telegram_id, event = %event.id, "Calendar event created");

        let mut text = format!("✅ Event created!\n\n📌 {}\n🕐 {} UTC", event.summary, start.format("%a, %b %-d %H:%M"));
        if let Some(link) = &event.link {
            text.push_str(&format!("\n🔗 {}", link));
        }

        let remind_at = start - Duration::minutes(EVENT_REMINDER_LEAD_MINUTES);
        if remind_at > self.now() {
            let user = self.require_user(from.telegram_id).await?;
            let user_id = user.id;
            let telegram_id = from.telegram_id;
            let title = format!("{} starts in {} minutes", event.summary, EVENT_REMINDER_LEAD_MINUTES);
            let event_id = event.id.clone();
            let saved = self
                .db(move |db| db.create_reminder(user_id, telegram_id, &title, None, remind_at, Some(event_id.as_str())))
                .await;
            match saved {
                Ok(_) => text.push_str(&format!(
                    "\n\n⏰ I'll remind you at {}.",
                    local_time_label(remind_at, &user.timezone)
                )),
                Err(e) => warn!("Event {} created but reminder not saved: {}", event.id, e),
            }
        }
        self.say(chat_id, &text).await
    }

    // -- Free text inside a flow --

    pub(crate) async fn automation_text(
        &self,
        chat: &Chat,
        from: &Sender,
        step: AutomationStep,
        text: &str,
    ) -> BotResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        match step {
            AutomationStep::AwaitingResearchTopic => {
                self.ask_research_depth(chat.id, from.telegram_id, text.to_string()).await
            }
            AutomationStep::AwaitingResearchDepth { .. } => {
                self.say_with(chat.id, "Pick a depth below.", keyboards::research_depth())
                    .await
            }
            AutomationStep::AwaitingSaveTarget { .. } => {
                self.say_with(chat.id, "Pick where to save the report.", keyboards::save_targets())
                    .await
            }
            AutomationStep::AwaitingScrapeUrl => {
                self.scrape_url(chat.id, from.telegram_id, text).await?;
                self.sessions.clear(from.telegram_id).await?;
                Ok(())
            }
            AutomationStep::AwaitingEventSummary => {
                self.sessions
                    .put(
                        from.telegram_id,
                        Session::Automation(AutomationStep::AwaitingEventStart {
                            summary: text.to_string(),
                        }),
                    )
                    .await?;
                self.say(
                    chat.id,
                    "🕐 When does it start? Send YYYY-MM-DD HH:MM (UTC), e.g. 2026-03-14 18:30",
                )
                .await
            }
            AutomationStep::AwaitingEventStart { summary } => {
                self.create_event(chat.id, from, summary, text).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_check() {
        assert!(looks_like_url("https://example.com/a"));
        assert!(looks_like_url(" http://example.com "));
        assert!(!looks_like_url("example.com"));
        assert!(!looks_like_url("https://exa mple.com"));
    }
}
