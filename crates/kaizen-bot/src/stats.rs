use chrono::NaiveDate;
use kaizen_core::dates::days_ago;
use kaizen_core::quotes::{daily_quote, format_quote};
use kaizen_core::rank::{rank_for_streak, season_for_streak};
use kaizen_core::streak::{active_streak, completion_by_day, longest_streak};
use kaizen_core::visuals::{monthly_calendar, rank_card, streak_display, weekly_strip};
use kaizen_types::models::{CheckinRecord, TaskStat};
use kaizen_types::{BotError, BotResult, Prerequisite};

use crate::messenger::{Chat, Sender};
use crate::state::Bot;

const STATS_TASK_DAYS: u32 = 30;
const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━";

fn rate_emoji(rate: u32) -> &'static str {
    match rate {
        80.. => "🟢",
        50..=79 => "🟡",
        _ => "🔴",
    }
}

fn task_lines(stats: &[TaskStat]) -> String {
    stats
        .iter()
        .map(|s| {
            let rate = s.rate_percent();
            format!("{} {}: {}% ({}/{})", rate_emoji(rate), s.name, rate, s.completed, s.total)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Completed and total distinct days in `[from, to]`.
fn window_counts(records: &[CheckinRecord], from: NaiveDate, to: NaiveDate) -> (u32, u32) {
    completion_by_day(records)
        .range(from..=to)
        .fold((0, 0), |(done, total), (_, &completed)| {
            (done + u32::from(completed), total + 1)
        })
}

fn percent(done: u32, total: u32) -> u32 {
    if total == 0 {
        0
    } else {
        (done as f64 / total as f64 * 100.0).round() as u32
    }
}

fn medal(position: usize) -> String {
    match position {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("{}.", n),
    }
}

impl Bot {
    // -- /view --

    pub(crate) async fn view(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let today = self.today();
        let history = self.db(move |db| db.streak_history(user_id)).await?;
        let records = &history.records;

        if records.is_empty() {
            return self
                .say(
                    chat.id,
                    "📭 No check-ins yet!\n\nUse /checkin to record your first day and start your streak. 🌱",
                )
                .await;
        }

        let streak = active_streak(records, today, &history.frozen);
        let rank = rank_for_streak(streak);
        let season = season_for_streak(streak);
        let text = format!(
            "{} Your Progress {}\n\n{} Current Season: {} ({})\n{}\n\n{}\n\n{}\n💡 Use /stats for detailed statistics",
            rank.emoji,
            rank.emoji,
            season.emoji,
            season.name,
            season.kanji,
            streak_display(streak),
            monthly_calendar(records, today),
            weekly_strip(records, today, 14)
        );
        self.say(chat.id, &text).await
    }

    // -- /stats --

    pub(crate) async fn stats(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let today = self.today();
        let task_since = days_ago(today, STATS_TASK_DAYS);

        let (history, totals, tasks) = self
            .db(move |db| {
                Ok((
                    db.streak_history(user_id)?,
                    db.checkin_totals(user_id)?,
                    db.task_stats(user_id, task_since)?,
                ))
            })
            .await?;

        let streak = active_streak(&history.records, today, &history.frozen);
        let mut text = format!("📈 Your Statistics\n\n{}\n", rank_card(streak, totals.total_days, totals.completed_days));
        text.push_str(&format!("\n🏆 Longest streak: {} days\n", longest_streak(&history.records)));
        text.push_str(&format!("✅ Completed days: {}\n", totals.completed_days));
        if let Some(last) = totals.last_checkin {
            text.push_str(&format!("📅 Last check-in: {}\n", last.format("%b %-d, %Y")));
        }
        text.push_str(&format!(
            "❄️ Streak freezes available: {}\n",
            user.streak_freezes_available
        ));

        if !tasks.is_empty() {
            text.push_str(&format!(
                "\n{}\n📋 Task completion (last {} days)\n\n{}\n",
                RULE,
                STATS_TASK_DAYS,
                task_lines(&tasks)
            ));
        }
        self.say(chat.id, &text).await
    }

    // -- /report --

    pub(crate) async fn report(&self, chat: &Chat, from: &Sender) -> BotResult<()> {
        let user = self.require_user(from.telegram_id).await?;
        let user_id = user.id;
        let today = self.today();
        let week_since = days_ago(today, 6);

        let (history, tasks) = self
            .db(move |db| {
                Ok((
                    db.streak_history(user_id)?,
                    db.task_stats(user_id, week_since)?,
                ))
            })
            .await?;

        let records = &history.records;
        let (this_done, this_total) = window_counts(records, week_since, today);
        let (last_done, last_total) = window_counts(records, days_ago(today, 13), days_ago(today, 7));
        let this_rate = percent(this_done, this_total);
        let last_rate = percent(last_done, last_total);
        let streak = active_streak(records, today, &history.frozen);

        let mut text = format!(
            "📊 Weekly Progress Report\nHey {}! Here's your weekly summary.\n\n{}\n📅 This Week\n\n\
             ✅ Check-ins: {}/{}\n📈 Completion rate: {}%\n🔥 Current streak: {} days\n\n",
            user.display_name(),
            RULE,
            this_done,
            this_total,
            this_rate,
            streak
        );

        if !tasks.is_empty() {
            text.push_str(&format!("Task Performance:\n{}\n\n", task_lines(&tasks)));
        }

        if last_total > 0 {
            let diff = this_rate as i64 - last_rate as i64;
            let (emoji, trend) = match diff {
                d if d > 0 => ("📈", "up"),
                d if d < 0 => ("📉", "down"),
                _ => ("➡️", "the same as"),
            };
            text.push_str(&format!(
                "{}\n📊 Last Week Comparison\n\nLast week: {}/{} ({}%)\n",
                RULE, last_done, last_total, last_rate
            ));
            if diff == 0 {
                text.push_str(&format!("{} You're {} last week\n\n", emoji, trend));
            } else {
                text.push_str(&format!("{} You're {}% {} from last week\n\n", emoji, diff.abs(), trend));
            }
        }

        text.push_str(&format!("{}\n💪 Keep Going!\n\n", RULE));
        text.push_str(match this_rate {
            80.. => "Excellent work! You're crushing it this week. 🎉\nYour consistency is building real momentum.",
            50..=79 => "Good progress! You're on the right track. 💪\nKeep pushing, consistency is key.",
            _ => "This week was tough, but that's okay! 🌱\nProgress isn't always linear. Tomorrow is a new opportunity.",
        });
        text.push_str("\n\n🔔 Use /remind to never miss a check-in!");
        self.say(chat.id, &text).await
    }

    // -- Group views --

    pub(crate) async fn today_summary(&self, chat: &Chat) -> BotResult<()> {
        if chat.is_private() {
            return Err(BotError::Prerequisite(Prerequisite::GroupChat));
        }
        let chat_id = chat.id;
        let today = self.today();
        let summary = self
            .db(move |db| {
                let Some(group) = db.get_group_by_chat(chat_id)? else {
                    return Ok(None);
                };
                let members = db.group_day_summary(group.id, today)?;
                Ok(Some((group, members)))
            })
            .await?;

        let Some((group, members)) = summary else {
            return self.say(chat.id, UNREGISTERED_GROUP).await;
        };
        if members.is_empty() {
            return self.say(chat.id, NO_MEMBERS).await;
        }

        let completed: Vec<&str> = members
            .iter()
            .filter(|m| m.completed == Some(true))
            .map(|m| m.display_name.as_str())
            .collect();
        let missed: Vec<&str> = members
            .iter()
            .filter(|m| m.completed == Some(false))
            .map(|m| m.display_name.as_str())
            .collect();
        let total = members.len();
        let checked_in = completed.len() + missed.len();

        let mut text = format!("📅 Today's Check-ins - {}\n\n", group.name);
        if checked_in == 0 {
            text.push_str(&format!(
                "⏳ No check-ins yet today!\n\n👥 {} member{} waiting to check in...\n\n\
                 💡 Use /checkin in a private chat with me to post your progress here!",
                total,
                if total == 1 { "" } else { "s" }
            ));
            return self.say(chat.id, &text).await;
        }

        if !completed.is_empty() {
            text.push_str("✅ Completed:\n");
            for name in &completed {
                text.push_str(&format!("• {}\n", name));
            }
            text.push('\n');
        }
        if !missed.is_empty() {
            text.push_str("❌ Missed:\n");
            for name in &missed {
                text.push_str(&format!("• {}\n", name));
            }
            text.push('\n');
        }
        text.push_str(&format!("📊 Progress: {}/{} checked in\n", checked_in, total));
        if total > checked_in {
            text.push_str(&format!("⏳ {} still to go!\n", total - checked_in));
        }
        text.push_str(&format!(
            "\n🎯 Success rate: {}%",
            percent(completed.len() as u32, checked_in as u32)
        ));
        self.say(chat.id, &text).await
    }

    pub(crate) async fn leaderboard(&self, chat: &Chat) -> BotResult<()> {
        if chat.is_private() {
            return Err(BotError::Prerequisite(Prerequisite::GroupChat));
        }
        let chat_id = chat.id;
        let today = self.today();

        let board = self
            .db(move |db| {
                let Some(group) = db.get_group_by_chat(chat_id)? else {
                    return Ok(None);
                };
                let mut rows = Vec::new();
                for member in db.get_group_members(group.id)? {
                    let history = db.streak_history(member.id)?;
                    let streak = active_streak(&history.records, today, &history.frozen);
                    rows.push((member.display_name().to_string(), streak));
                }
                Ok(Some((group, rows)))
            })
            .await?;

        let Some((group, mut rows)) = board else {
            return self.say(chat.id, UNREGISTERED_GROUP).await;
        };
        if rows.is_empty() {
            return self.say(chat.id, NO_MEMBERS).await;
        }
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut text = format!("🏆 Leaderboard - {}\n\n", group.name);
        for (i, (name, streak)) in rows.iter().enumerate() {
            let rank = rank_for_streak(*streak);
            text.push_str(&format!(
                "{} {}\n   {} {} • 🔥 {} day{}\n\n",
                medal(i + 1),
                name,
                rank.emoji,
                rank.name,
                streak,
                if *streak == 1 { "" } else { "s" }
            ));
        }
        text.push_str(&format!(
            "{}\n👥 Total members: {}\n💪 Keep pushing forward together!",
            RULE,
            rows.len()
        ));
        self.say(chat.id, &text).await
    }

    // -- /quote --

    pub(crate) async fn quote(&self, chat: &Chat) -> BotResult<()> {
        let quote = daily_quote(self.today());
        let text = format!("🌸 Daily Wisdom\n\n{}", format_quote(quote, true));
        self.say(chat.id, &text).await
    }
}

const UNREGISTERED_GROUP: &str = "⚠️ This group isn't registered yet!\n\n\
    Remove me and add me back to this group, then everyone can /join.";

const NO_MEMBERS: &str = "📭 No members yet!\n\n\
    Send /join here after setting up with /start in a private chat.";

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: NaiveDate, completed: bool) -> CheckinRecord {
        CheckinRecord { date, completed }
    }

    #[test]
    fn window_counts_dedupes_days() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let records = vec![
            rec(d(1), false),
            rec(d(1), true),
            rec(d(2), false),
            rec(d(5), true),
            rec(d(9), true),
        ];
        assert_eq!(window_counts(&records, d(1), d(7)), (2, 3));
        assert_eq!(window_counts(&records, d(8), d(14)), (1, 1));
    }

    #[test]
    fn rates_band_into_colours() {
        assert_eq!(rate_emoji(100), "🟢");
        assert_eq!(rate_emoji(80), "🟢");
        assert_eq!(rate_emoji(50), "🟡");
        assert_eq!(rate_emoji(49), "🔴");
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(2, 3), 67);
    }

    #[test]
    fn medals_for_podium_only() {
        assert_eq!(medal(1), "🥇");
        assert_eq!(medal(3), "🥉");
        assert_eq!(medal(4), "4.");
    }
}
