use kaizen_types::models::{Buddy, BuddyRequestOutcome, User};
use kaizen_types::{BotError, BotResult};
use tracing::{info, warn};

use crate::messenger::{Chat, Sender};
use crate::state::Bot;

fn handle_line(username: Option<&str>) -> String {
    username.map(|u| format!("@{}\n", u)).unwrap_or_default()
}

fn match_text(name: &str, username: Option<&str>) -> String {
    format!(
        "🎉 Buddy Match Found!\n\nYou've been matched with {}!\n{}\n\
         Getting started:\n\
         • Say hi and share your daily tasks\n\
         • Cheer each other on after every check-in\n\
         • Nudge each other on tough days\n\n\
         Use /buddy status to see your partnership.",
        name,
        handle_line(username)
    )
}

impl Bot {
    // -- /buddy --

    pub(crate) async fn buddy(&self, chat: &Chat, from: &Sender, arg: Option<String>) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        match arg.as_deref().map(|a| a.trim().to_lowercase()).as_deref() {
            None | Some("") => self.request_buddy(chat, &user).await,
            Some("status") => self.buddy_status(chat, &user).await,
            Some("cancel") => {
                let user_id = user.id;
                let cancelled = self.db(move |db| db.cancel_buddy_request(user_id)).await?;
                let text = if cancelled {
                    "✅ Buddy request cancelled."
                } else {
                    "ℹ️ No pending buddy request to cancel."
                };
                self.say(chat.id, text).await
            }
            Some("end") => self.end_buddy(chat, &user).await,
            Some(_) => Err(BotError::validation(
                "Usage:\n/buddy - find an accountability buddy\n/buddy status\n/buddy cancel\n/buddy end",
            )),
        }
    }

    async fn request_buddy(&self, chat: &Chat, user: &User) -> BotResult<()> {
        let user_id = user.id;
        let outcome = self.db(move |db| db.request_buddy(user_id)).await?;

        match outcome {
            BuddyRequestOutcome::Matched(buddy) => {
                info!(user_id, partner = buddy.user_id, "Buddy match made");
                self.say(
                    chat.id,
                    &match_text(buddy.display_name(), buddy.username.as_deref()),
                )
                .await?;
                self.notify_partner(&buddy, &match_text(user.display_name(), user.username.as_deref()))
                    .await;
                Ok(())
            }
            BuddyRequestOutcome::AlreadyMatched(buddy) => {
                self.say(
                    chat.id,
                    &format!(
                        "👥 Your Accountability Buddy\n\nYou're already paired with {}!\n{}\n\
                         Use /buddy end if you'd like a new partner.",
                        buddy.display_name(),
                        handle_line(buddy.username.as_deref())
                    ),
                )
                .await
            }
            BuddyRequestOutcome::AlreadyPending => {
                self.say(
                    chat.id,
                    "⏳ Buddy Request Pending\n\n\
                     You're already in the queue. I'll message you as soon as someone else asks for a buddy!\n\n\
                     Use /buddy cancel to leave the queue.",
                )
                .await
            }
            BuddyRequestOutcome::Queued => {
                info!(user_id, "Buddy request queued");
                self.say(
                    chat.id,
                    "👥 Looking for a Buddy...\n\n\
                     You've been added to the matching queue!\n\
                     When someone else requests a buddy, you'll both be notified.\n\n\
                     Use /buddy status to check, or /buddy cancel to leave the queue.",
                )
                .await
            }
        }
    }

    async fn buddy_status(&self, chat: &Chat, user: &User) -> BotResult<()> {
        let user_id = user.id;
        let (buddy, pending) = self
            .db(move |db| Ok((db.get_buddy(user_id)?, db.get_pending_buddy_request(user_id)?)))
            .await?;

        let text = match (buddy, pending) {
            (Some(buddy), _) => format!(
                "👥 Buddy Status\n\n✅ You have an active buddy!\n\nBuddy: {}\n{}Paired since: {}",
                buddy.display_name(),
                handle_line(buddy.username.as_deref()),
                buddy.matched_at.format("%b %-d, %Y")
            ),
            (None, Some(request)) => {
                let waiting = (self.now() - request.created_at).num_minutes().max(0);
                format!(
                    "⏳ Buddy Status\n\nStatus: waiting for a match\nTime waiting: {} minute{}\n\n\
                     I'll message you as soon as someone else requests a buddy!",
                    waiting,
                    if waiting == 1 { "" } else { "s" }
                )
            }
            (None, None) => "👥 Buddy Status\n\nYou don't have an accountability buddy yet.\n\n\
                             A buddy sees your progress and keeps you going. Use /buddy to find one!"
                .to_string(),
        };
        self.say(chat.id, &text).await
    }

    async fn end_buddy(&self, chat: &Chat, user: &User) -> BotResult<()> {
        let user_id = user.id;
        let Some(buddy) = self.db(move |db| db.end_buddy_match(user_id)).await? else {
            return self
                .say(chat.id, "ℹ️ You don't have an active buddy partnership to end.")
                .await;
        };
        info!(user_id, partner = buddy.user_id, "Buddy match ended");

        self.say(
            chat.id,
            &format!(
                "✅ Buddy Partnership Ended\n\nYour partnership with {} has ended.\n\n\
                 You can find a new buddy anytime with /buddy. 💪",
                buddy.display_name()
            ),
        )
        .await?;
        self.notify_partner(
            &buddy,
            "ℹ️ Buddy Partnership Update\n\nYour buddy partnership has ended.\n\n\
             You can find a new buddy anytime with /buddy.",
        )
        .await;
        Ok(())
    }

    async fn notify_partner(&self, buddy: &Buddy, text: &str) {
        if let Err(e) = self.messenger.send(buddy.telegram_id, text, None).await {
            warn!("Failed to notify buddy {}: {}", buddy.telegram_id, e);
        }
    }
}
