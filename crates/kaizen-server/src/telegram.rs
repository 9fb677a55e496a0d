//! Telegram transport: the [`Messenger`] implementation over teloxide and
//! the conversions from teloxide updates into the bot's own types.

use anyhow::{Result, bail};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatMemberUpdated, InlineKeyboardButton, InlineKeyboardMarkup,
    MaybeInaccessibleMessage, MessageId, User,
};

use kaizen_bot::{Chat, IncomingCallback, IncomingMessage, Keyboard, MembershipChange, Messenger, Sender, Voice};

pub struct TelegramMessenger {
    bot: teloxide::Bot,
    token: String,
    http: reqwest::Client,
}

impl TelegramMessenger {
    pub fn new(bot: teloxide::Bot, token: impl Into<String>) -> Self {
        Self {
            bot,
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }
}

fn to_markup(keyboard: Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.into_iter().map(|row| {
        row.into_iter()
            .map(|button| InlineKeyboardButton::callback(button.text, button.data))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<i32> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        let sent = request.await?;
        Ok(sent.id.0)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i32,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        request.await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut request = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self.bot.get_file(file_id.to_string()).await?;
        let url = format!("https://api.telegram.org/file/bot{}/{}", self.token, file.path);

        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("Failed to download file from Telegram: HTTP {}", response.status());
        }
        Ok(response.bytes().await?.to_vec())
    }
}

// -- Update conversion --

fn sender(user: &User) -> Sender {
    Sender {
        telegram_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|n| !n.is_empty()),
    }
}

fn chat(chat: &teloxide::types::Chat) -> Chat {
    if chat.is_private() {
        Chat::private(chat.id.0)
    } else {
        Chat::group(chat.id.0, chat.title().unwrap_or("Group"))
    }
}

/// Messages without a human sender (channel posts, service messages) are
/// skipped.
pub fn incoming_message(msg: &Message) -> Option<IncomingMessage> {
    let from = msg.from.as_ref().filter(|u| !u.is_bot)?;
    Some(IncomingMessage {
        chat: chat(&msg.chat),
        from: sender(from),
        text: msg.text().map(str::to_string),
        voice: msg.voice().map(|v| Voice {
            file_id: v.file.id.clone(),
            duration_secs: v.duration.seconds(),
        }),
    })
}

pub fn incoming_callback(q: &CallbackQuery) -> IncomingCallback {
    let message = match &q.message {
        Some(MaybeInaccessibleMessage::Regular(m)) => Some((m.chat.id.0, m.id.0)),
        _ => None,
    };
    IncomingCallback {
        id: q.id.clone(),
        from: sender(&q.from),
        message,
        data: q.data.clone().unwrap_or_default(),
    }
}

/// Only transitions into or out of the chat matter. Promotions and other
/// status changes are ignored.
pub fn membership_change(update: &ChatMemberUpdated) -> Option<MembershipChange> {
    if update.chat.is_private() {
        return None;
    }
    let was_present = update.old_chat_member.kind.is_present();
    let is_present = update.new_chat_member.kind.is_present();
    match (was_present, is_present) {
        (false, true) => Some(MembershipChange::Added {
            chat: chat(&update.chat),
            by: sender(&update.from),
        }),
        (true, false) => Some(MembershipChange::Removed {
            chat_id: update.chat.id.0,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaizen_bot::Button;

    #[test]
    fn keyboard_rows_are_kept() {
        let keyboard = vec![
            vec![
                Button {
                    text: "A".into(),
                    data: "menu_checkin".into(),
                },
                Button {
                    text: "B".into(),
                    data: "menu_view".into(),
                },
            ],
            vec![Button {
                text: "C".into(),
                data: "menu_stats".into(),
            }],
        ];
        let markup = to_markup(keyboard);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0].len(), 2);
        assert_eq!(markup.inline_keyboard[1][0].text, "C");
    }
}
