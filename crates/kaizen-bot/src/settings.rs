use chrono::{Duration, NaiveDate};
use kaizen_core::dates::{format_hour_12, local_time_label, parse_relative_delay, parse_reminder_hour, parse_timezone};
use kaizen_session::Feature;
use kaizen_types::{BotError, BotResult};
use tracing::info;

use crate::keyboards;
use crate::messenger::{Chat, Sender};
use crate::onboarding::reminder_confirmation;
use crate::state::Bot;

const FREEZE_PERIOD_DAYS: i64 = 7;

fn next_reset(last_reset: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    last_reset.unwrap_or(today) + Duration::days(FREEZE_PERIOD_DAYS)
}

fn pretty_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// Split `/remindme` arguments into a delay and a title. The delay may
/// span up to three words (`in 2 hours`).
pub(crate) fn split_delay(args: &str) -> Option<(Duration, String)> {
    let words: Vec<&str> = args.split_whitespace().collect();
    (1..=words.len().min(3)).rev().find_map(|n| {
        let delay = parse_relative_delay(&words[..n].join(" "))?;
        let title = words[n..].join(" ");
        (!title.is_empty()).then_some((delay, title))
    })
}

impl Bot {
    // -- /remind --

    pub(crate) async fn remind(&self, chat: &Chat, from: &Sender, arg: Option<String>) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let hours = &self.settings.reminder_hours;

        let Some(arg) = arg else {
            let current = match user.reminder_hour {
                Some(h) => format!("⏰ Your daily reminder is set for {} UTC.", format_hour_12(h)),
                None => "🔕 Daily reminders are off.".to_string(),
            };
            return self
                .say_with(
                    chat.id,
                    &format!("{}\n\nPick a new time:", current),
                    keyboards::reminder_hours(hours, true),
                )
                .await;
        };

        let hour = if arg.trim().eq_ignore_ascii_case("off") {
            None
        } else {
            let Some(h) = parse_reminder_hour(&arg, hours) else {
                let options = hours
                    .iter()
                    .map(|&h| format_hour_12(h))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(BotError::validation(format!(
                    "❌ I can't schedule a reminder at \"{}\".\n\nAvailable times (UTC): {}\nOr use /remind off",
                    arg.trim(),
                    options
                )));
            };
            Some(h)
        };

        self.db(move |db| db.set_reminder_hour(user_id, hour)).await?;
        info!(user = from.telegram_id, ?hour, "Reminder hour changed");
        self.say(chat.id, &reminder_confirmation(hour)).await
    }

    // -- /timezone --

    pub(crate) async fn timezone(&self, chat: &Chat, from: &Sender, arg: Option<String>) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let now = self.now();

        let Some(arg) = arg else {
            let text = format!(
                "🌍 Your Timezone\n\n📍 {}\n🕐 Current time: {}\n\n\
                 Change it with /timezone <name>, e.g. /timezone Europe/London\n\
                 Reminder times are always shown in UTC.",
                user.timezone,
                local_time_label(now, &user.timezone)
            );
            return self.say(chat.id, &text).await;
        };

        let Some(tz) = parse_timezone(&arg) else {
            return Err(BotError::validation(format!(
                "❌ Invalid timezone: {}\n\nPlease use a valid IANA timezone name.\n\n\
                 Examples:\n• America/New_York\n• Europe/London\n• Asia/Tokyo",
                arg.trim()
            )));
        };

        let user_id = user.id;
        let name = tz.name().to_string();
        let saved = name.clone();
        self.db(move |db| db.set_timezone(user_id, &saved)).await?;
        info!(user = from.telegram_id, timezone = %name, "Timezone changed");

        self.say(
            chat.id,
            &format!(
                "✅ Timezone Updated!\n\n📍 {}\n🕐 Current time: {}",
                name,
                local_time_label(now, &name)
            ),
        )
        .await
    }

    // -- /freeze --

    pub(crate) async fn freeze(&self, chat: &Chat, from: &Sender, arg: Option<String>) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let today = self.today();
        let reset = next_reset(user.last_freeze_reset_date, today);

        match arg.as_deref().map(str::trim) {
            Some(a) if a.eq_ignore_ascii_case("status") => {
                let mut text = String::from("❄️ Streak Freeze Status\n\n");
                if user.streak_freezes_available > 0 {
                    text.push_str(&format!(
                        "✅ {} freeze available\n\n\
                         Freezes protect your streak when life happens.\n\
                         Use /freeze to activate one for today.",
                        user.streak_freezes_available
                    ));
                } else {
                    text.push_str("❌ No freezes available\n\n");
                    if let Some(used) = user.freeze_used_on_date {
                        text.push_str(&format!("Used on: {}\n", pretty_date(used)));
                    }
                    text.push_str(&format!("Next reset: {}", pretty_date(reset)));
                }
                return self.say(chat.id, &text).await;
            }
            Some(a) if !a.is_empty() => {
                return Err(BotError::validation("Usage: /freeze or /freeze status"));
            }
            _ => {}
        }

        if user.freeze_used_on_date == Some(today) {
            return self
                .say(
                    chat.id,
                    "⚠️ Freeze already used today\n\n\
                     Freezes protect your streak for one missed day. Use them strategically!",
                )
                .await;
        }

        let user_id = user.id;
        let used = self.db(move |db| db.use_streak_freeze(user_id, today)).await?;
        if !used {
            return self
                .say(
                    chat.id,
                    &format!(
                        "❌ No freezes available\n\n\
                         You've already used your weekly freeze.\n\
                         You get 1 new freeze every 7 days.\n\n\
                         Next reset: {}",
                        pretty_date(reset)
                    ),
                )
                .await;
        }
        info!(user = from.telegram_id, %today, "Streak freeze used");

        self.say(
            chat.id,
            &format!(
                "❄️ Freeze activated!\n\n\
                 ✅ Your streak is protected for {}\n\n\
                 • If you miss today's check-in, your streak won't break\n\
                 • You can still check in if you want!\n\n\
                 Next reset: {}\n\n💪 Keep building those habits!",
                pretty_date(today),
                pretty_date(reset)
            ),
        )
        .await
    }

    // -- /remindme --

    pub(crate) async fn remind_me(&self, chat: &Chat, from: &Sender, arg: Option<String>) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;

        let Some(arg) = arg else {
            let pending = self.db(move |db| db.pending_reminders(user_id)).await?;
            if pending.is_empty() {
                return self
                    .say(
                        chat.id,
                        "⏰ No reminders scheduled.\n\nUsage: /remindme <when> <what>\nExample: /remindme 30m stretch",
                    )
                    .await;
            }
            let mut text = String::from("⏰ Upcoming reminders\n\n");
            for r in &pending {
                text.push_str(&format!(
                    "• {} at {}\n",
                    r.title,
                    local_time_label(r.reminder_time, &user.timezone)
                ));
            }
            return self.say(chat.id, &text).await;
        };

        let Some((delay, title)) = split_delay(&arg) else {
            return Err(BotError::validation(
                "❌ I couldn't read that.\n\nUsage: /remindme <when> <what>\n\
                 Examples:\n• /remindme 30m stretch\n• /remindme in 2 hours call mom\n• /remindme 1d water plants",
            ));
        };

        let at = self.now() + delay;
        let telegram_id = from.telegram_id;
        let saved = title.clone();
        self.db(move |db| db.create_reminder(user_id, telegram_id, &saved, None, at, None))
            .await?;
        info!(user = telegram_id, %at, "Reminder scheduled");

        self.say(
            chat.id,
            &format!(
                "✅ Reminder set!\n\n📝 {}\n🕐 {}",
                title,
                local_time_label(at, &user.timezone)
            ),
        )
        .await
    }

    // -- /ratelimits --

    pub(crate) async fn rate_limits(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        let mut text = String::from("⏳ Your usage this hour\n\n");
        for feature in Feature::ALL {
            let limit = feature.limit();
            let (remaining, resets_in) = self.limiter.status(from.telegram_id, feature);
            let light = match remaining {
                0 => "🔴",
                r if r * 4 <= limit => "🟡",
                _ => "🟢",
            };
            text.push_str(&format!("{} {}: {}/{} remaining", light, feature.label(), remaining, limit));
            if let Some(wait) = resets_in {
                let minutes = wait.as_secs().div_ceil(60).max(1);
                text.push_str(&format!(" (resets in {}m)", minutes));
            }
            text.push('\n');
        }
        self.say(chat.id, &text).await
    }

    // -- /cancel --

    pub(crate) async fn cancel(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        if self.session(from.telegram_id).await?.is_none() {
            return self.say(chat.id, "Nothing to cancel.").await;
        }
        self.sessions.clear(from.telegram_id).await?;
        self.say(chat.id, "✅ Cancelled.").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_then_title() {
        let (delay, title) = split_delay("30m stretch legs").unwrap();
        assert_eq!(delay, Duration::minutes(30));
        assert_eq!(title, "stretch legs");

        let (delay, title) = split_delay("in 2 hours call mom").unwrap();
        assert_eq!(delay, Duration::hours(2));
        assert_eq!(title, "call mom");
    }

    #[test]
    fn delay_needs_a_title() {
        assert!(split_delay("30m").is_none());
        assert!(split_delay("call mom").is_none());
        assert!(split_delay("").is_none());
    }

    #[test]
    fn next_reset_is_a_week_after_last() {
        let d = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert_eq!(next_reset(Some(d), d), NaiveDate::from_ymd_opt(2026, 5, 8).unwrap());
    }
}
