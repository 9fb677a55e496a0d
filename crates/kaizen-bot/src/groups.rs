use kaizen_core::dates::generate_invite_code;
use kaizen_types::models::Group;
use kaizen_types::{BotError, BotResult, Prerequisite};
use tracing::info;

use crate::messenger::{Chat, Sender};
use crate::state::Bot;

/// Attempts before giving up on finding an unused invite code.
const INVITE_CODE_ATTEMPTS: usize = 20;

fn welcome_text(group: &Group) -> String {
    format!(
        "🎌 Welcome to Kaizen!\n\n\
         I'll help {} stay accountable to your daily goals!\n\n\
         How it works:\n\
         1️⃣ Each member: message me privately and use /start to set your tasks\n\
         2️⃣ Send /join here (or /join {} in private) to join this group\n\
         3️⃣ Check in daily with /checkin and I'll post your progress here!\n\
         4️⃣ See each other's streaks and celebrate together\n\n\
         Group commands:\n\
         • /today - See who checked in today\n\
         • /leaderboard - Group rankings\n\
         • /help - Show all commands\n\n\
         Invite code: {}\n\n\
         Let's build consistency together! 改善",
        group.name, group.invite_code, group.invite_code
    )
}

impl Bot {
    // -- Membership --

    /// The bot landed in a group: register it and enrol whoever added it.
    pub(crate) async fn bot_added(&self, chat: &Chat, by: &Sender) -> BotResult<()> {
        let name = chat.title().unwrap_or("Unnamed Group").to_string();
        let chat_id = chat.id;
        let by = by.clone();

        let (group, has_tasks) = self
            .db(move |db| {
                let user = db.upsert_user(
                    by.telegram_id,
                    by.username.as_deref(),
                    by.first_name.as_deref(),
                )?;

                let code = match db.get_group_by_chat(chat_id)? {
                    Some(existing) => existing.invite_code,
                    None => {
                        let mut rng = rand::rng();
                        let mut code = None;
                        for _ in 0..INVITE_CODE_ATTEMPTS {
                            let candidate = generate_invite_code(&mut rng);
                            if !db.invite_code_exists(&candidate)? {
                                code = Some(candidate);
                                break;
                            }
                        }
                        code.ok_or_else(|| anyhow::anyhow!("no free invite code"))?
                    }
                };

                let group = db.upsert_group(chat_id, &name, Some(user.id), &code)?;
                db.join_group(user.id, group.id)?;
                let has_tasks = !db.get_active_tasks(user.id)?.is_empty();
                Ok((group, has_tasks))
            })
            .await?;
        info!(group_id = group.id, chat_id, "Bot added to group {}", group.name);

        let mut text = welcome_text(&group);
        if !has_tasks {
            text.push_str(
                "\n\n⚠️ The person who added me hasn't set up yet! \
                 Message me privately and use /start to pick your daily tasks.",
            );
        }
        self.say(chat.id, &text).await
    }

    pub(crate) async fn bot_removed(&self, chat_id: i64) -> BotResult<()> {
        let deactivated = self.db(move |db| db.deactivate_group(chat_id)).await?;
        if deactivated {
            info!(chat_id, "Bot removed from group, deactivated");
        }
        Ok(())
    }

    // -- /join --

    pub(crate) async fn join(&self, chat: &Chat, from: &Sender, code: Option<String>) -> BotResult<()> {
        if !chat.is_private() {
            let chat_id = chat.id;
            let sender = from.clone();
            let joined = self
                .db(move |db| {
                    let Some(group) = db.get_group_by_chat(chat_id)? else {
                        return Ok(None);
                    };
                    let user = db.upsert_user(
                        sender.telegram_id,
                        sender.username.as_deref(),
                        sender.first_name.as_deref(),
                    )?;
                    let is_new = db.join_group(user.id, group.id)?;
                    Ok(Some((group, is_new)))
                })
                .await?;

            let Some((group, is_new)) = joined else {
                return self
                    .say(
                        chat.id,
                        "⚠️ This group isn't registered yet! Remove me and add me again to set it up.",
                    )
                    .await;
            };
            let text = if is_new {
                info!(user = from.telegram_id, group_id = group.id, "Joined group");
                format!(
                    "👋 {} joined {}! Use /checkin in our private chat to post progress here.",
                    from.display_name(),
                    group.name
                )
            } else {
                format!("{}, you're already a member of {}.", from.display_name(), group.name)
            };
            return self.say(chat.id, &text).await;
        }

        let Some(code) = code else {
            return Err(BotError::validation(
                "Usage: /join <invite code>\n\nOr send /join inside the group chat.",
            ));
        };

        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let joined = self
            .db(move |db| {
                let Some(group) = db.get_group_by_invite_code(&code)? else {
                    return Ok(None);
                };
                let is_new = db.join_group(user_id, group.id)?;
                Ok(Some((group, is_new)))
            })
            .await?;

        match joined {
            None => Err(BotError::validation(
                "❌ No active group has that invite code. Double-check it and try again.",
            )),
            Some((group, true)) => {
                info!(user = from.telegram_id, group_id = group.id, "Joined group by code");
                self.say(
                    chat.id,
                    &format!("✅ You joined {}! Your check-ins will be posted there.", group.name),
                )
                .await
            }
            Some((group, false)) => {
                self.say(chat.id, &format!("You're already a member of {}.", group.name))
                    .await
            }
        }
    }

    // -- /groups --

    pub(crate) async fn groups(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let groups = self.db(move |db| db.get_user_groups(user_id)).await?;
        if groups.is_empty() {
            return Err(BotError::Prerequisite(Prerequisite::Group));
        }

        let mut text = String::from("👥 Your Groups\n\n");
        for (i, group) in groups.iter().enumerate() {
            text.push_str(&format!(
                "{}. {}\n   Invite code: {}\n",
                i + 1,
                group.name,
                group.invite_code
            ));
        }
        text.push_str("\nShare an invite code and friends can /join <code> in private.");
        self.say(chat.id, &text).await
    }
}
