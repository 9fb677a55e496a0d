use kaizen_core::checkin::{CheckinOutcome, CheckinSelection, SelectionError, TaskRef};
use kaizen_core::milestone::{Milestone, check_milestone, format_celebration};
use kaizen_core::quotes::{Quote, format_quote, quote_after_miss, quote_for_streak};
use kaizen_core::rank::rank_for_streak;
use kaizen_core::streak::{calculate_streak_with_freeze, streak_before_checkin};
use kaizen_session::Session;
use kaizen_types::models::{Group, Task, User};
use kaizen_types::{BotError, BotResult, Prerequisite};
use tracing::{error, info, warn};

use crate::keyboards;
use crate::messenger::{Chat, IncomingCallback, Sender};
use crate::router::Toast;
use crate::state::Bot;

/// What a committed submission produced, for rendering.
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub outcome: CheckinOutcome,
    pub previous_streak: u32,
    pub streak: u32,
    pub milestone: Option<Milestone>,
    pub group: Group,
}

fn checklist_text(selection: &CheckinSelection) -> String {
    format!(
        "📝 Daily Check-in for {}\n\nSelect the tasks you completed today:\n\n{}",
        selection.group_name,
        selection.render_pending()
    )
}

fn day_word(n: u32) -> &'static str {
    if n == 1 { "day" } else { "days" }
}

fn pick_quote(outcome: CheckinOutcome, streak: u32) -> &'static Quote {
    let mut rng = rand::rng();
    if outcome.counts_as_completed() {
        quote_for_streak(streak, &mut rng)
    } else {
        quote_after_miss(&mut rng)
    }
}

impl Bot {
    // -- /checkin --

    pub(crate) async fn checkin(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        if !chat.is_private() {
            return Err(BotError::Prerequisite(Prerequisite::PrivateChat));
        }
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let (tasks, groups) = self
            .db(move |db| Ok((db.get_active_tasks(user_id)?, db.get_user_groups(user_id)?)))
            .await?;

        if tasks.is_empty() {
            return Err(BotError::Prerequisite(Prerequisite::Tasks));
        }
        match groups.as_slice() {
            [] => Err(BotError::Prerequisite(Prerequisite::Group)),
            [group] => {
                self.open_checklist(chat.id, None, from.telegram_id, group, tasks)
                    .await
            }
            _ => {
                self.say_with(
                    chat.id,
                    "👥 Which group are you checking in for?",
                    keyboards::group_selection(&groups),
                )
                .await
            }
        }
    }

    /// Group picked from the selection keyboard or the reminder button.
    pub(crate) async fn open_checklist_for(&self, cb: &IncomingCallback, group_id: i64) -> BotResult<Toast> {
        let user = self.require_user(cb.from.telegram_id).await?;
        let user_id = user.id;
        let (tasks, groups) = self
            .db(move |db| Ok((db.get_active_tasks(user_id)?, db.get_user_groups(user_id)?)))
            .await?;

        let Some(group) = groups.iter().find(|g| g.id == group_id) else {
            return Ok(Some("You're not a member of that group.".into()));
        };
        if tasks.is_empty() {
            return Err(BotError::Prerequisite(Prerequisite::Tasks));
        }

        let chat_id = cb.message.map_or(cb.from.telegram_id, |(chat_id, _)| chat_id);
        self.open_checklist(chat_id, cb.message, cb.from.telegram_id, group, tasks)
            .await?;
        Ok(None)
    }

    async fn open_checklist(
        &self,
        chat_id: i64,
        message: Option<(i64, i32)>,
        telegram_id: i64,
        group: &Group,
        tasks: Vec<Task>,
    ) -> BotResult<()> {
        let refs = tasks
            .into_iter()
            .map(|t| TaskRef { id: t.id, name: t.name })
            .collect();
        let selection = CheckinSelection::new(group.id, group.name.clone(), refs);
        let text = checklist_text(&selection);
        let keyboard = keyboards::checklist(&selection);

        self.sessions
            .put(telegram_id, Session::Checkin(selection))
            .await?;
        self.replace(chat_id, message, &text, Some(keyboard)).await
    }

    pub(crate) async fn toggle_task(&self, cb: &IncomingCallback, task_id: i64) -> BotResult<Toast> {
        let Some(Session::Checkin(mut selection)) = self.session(cb.from.telegram_id).await? else {
            return Ok(Some("Please start with /checkin".into()));
        };

        match selection.toggle(task_id) {
            Ok(_) => {}
            Err(SelectionError::UnknownTask(_)) => {
                return Ok(Some("That task isn't on this checklist.".into()));
            }
            Err(e) => return Err(BotError::validation(e.to_string())),
        }

        let text = checklist_text(&selection);
        let keyboard = keyboards::checklist(&selection);
        self.sessions
            .put(cb.from.telegram_id, Session::Checkin(selection))
            .await?;

        let chat_id = cb.message.map_or(cb.from.telegram_id, |(chat_id, _)| chat_id);
        self.replace(chat_id, cb.message, &text, Some(keyboard)).await?;
        Ok(None)
    }

    // -- Submission --

    /// Commit, then clear the selection, then notify. A failed commit
    /// leaves the selection in place so the user can tap Submit again.
    pub(crate) async fn submit_checkin(&self, cb: &IncomingCallback, group_id: i64) -> BotResult<Toast> {
        let telegram_id = cb.from.telegram_id;
        let Some(Session::Checkin(selection)) = self.session(telegram_id).await? else {
            return Ok(Some("Please start with /checkin".into()));
        };
        if selection.ensure_group(group_id).is_err() {
            return Ok(Some("This checklist is for another group. Use /checkin again.".into()));
        }
        let user = self.require_user(telegram_id).await?;

        let result = match self.commit_checkin(&user, &selection).await {
            Ok(result) => result,
            Err(e) => {
                error!(user = telegram_id, group_id, "Check-in not saved: {:#}", e);
                return Ok(Some("⚠️ Couldn't save your check-in. Please tap Submit again.".into()));
            }
        };

        if let Err(e) = self.sessions.clear(telegram_id).await {
            warn!(user = telegram_id, "Check-in saved but selection not cleared: {}", e);
        }

        let chat_id = cb.message.map_or(telegram_id, |(chat_id, _)| chat_id);
        let quote = pick_quote(result.outcome, result.streak);
        let text = format!(
            "{} {}\n\nTasks ({}/{}):\n{}\n\n🔥 Current streak: {} {}\n\n{}",
            result.outcome.emoji(),
            result.outcome.label(),
            selection.done_count(),
            selection.tasks.len(),
            selection.render_result(),
            result.streak,
            day_word(result.streak),
            format_quote(quote, true)
        );
        if let Err(e) = self.replace(chat_id, cb.message, &text, None).await {
            warn!(user = telegram_id, "Check-in saved but result not shown: {}", e);
        }

        if let Some(milestone) = &result.milestone {
            if let Err(e) = self.say(chat_id, &format_celebration(milestone)).await {
                warn!(user = telegram_id, "Failed to send milestone {}: {}", milestone.title, e);
            }
        }

        self.announce_checkin(&user, &selection, &result).await;
        Ok(Some("Check-in saved!".into()))
    }

    /// Persist the day and recompute the streak from history read before
    /// and after the write.
    pub async fn commit_checkin(&self, user: &User, selection: &CheckinSelection) -> anyhow::Result<SubmissionResult> {
        let today = self.today();
        let user_id = user.id;
        let group_id = selection.group_id;
        let outcome = selection.outcome();
        let completions = selection.completions();

        let (before, after, group) = self
            .db(move |db| {
                let group = db
                    .get_group(group_id)?
                    .ok_or_else(|| anyhow::anyhow!("group {} not found", group_id))?;
                let before = db.streak_history(user_id)?;
                db.record_checkin(
                    user_id,
                    group_id,
                    today,
                    outcome.counts_as_completed(),
                    &completions,
                )?;
                let after = db.streak_history(user_id)?;
                Ok((before, after, group))
            })
            .await?;

        let previous_streak = streak_before_checkin(&before.records, today, &before.frozen);
        let streak = calculate_streak_with_freeze(&after.records, today, &after.frozen);
        let milestone = if outcome.counts_as_completed() {
            check_milestone(previous_streak, streak)
        } else {
            None
        };

        info!(
            user_id,
            group_id,
            outcome = outcome.label(),
            previous_streak,
            streak,
            "Check-in recorded"
        );
        Ok(SubmissionResult {
            outcome,
            previous_streak,
            streak,
            milestone,
            group,
        })
    }

    /// Post the result to the group chat. Best effort.
    async fn announce_checkin(&self, user: &User, selection: &CheckinSelection, result: &SubmissionResult) {
        let rank = rank_for_streak(result.streak);
        let mut text = format!(
            "{} {} {}\n\nTasks ({}/{}):\n{}\n\n{} {} • 🔥 {} day streak!",
            result.outcome.emoji(),
            user.display_name(),
            result.outcome.label(),
            selection.done_count(),
            selection.tasks.len(),
            selection.render_result(),
            rank.emoji,
            rank.name,
            result.streak
        );
        if let Some(milestone) = &result.milestone {
            text.push_str(&format!("\n\n🎉 {}", milestone.title));
        }

        let chat_id = result.group.telegram_chat_id;
        if let Err(e) = self.messenger.send(chat_id, &text, None).await {
            warn!(
                "Failed to post check-in for user {} to group chat {}: {}",
                user.telegram_id, chat_id, e
            );
        }
    }
}
