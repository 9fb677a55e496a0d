use chrono::{Datelike, Duration, NaiveDate};
use kaizen_types::models::CheckinRecord;

use crate::rank::{next_rank, progress_bar, rank_for_streak, season_for_streak};
use crate::streak::completion_by_day;

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const CARD_RULE: &str = "═══════════════════════";

fn days_in_month(date: NaiveDate) -> u32 {
    let (y, m) = (date.year(), date.month());
    let next = if m == 12 {
        NaiveDate::from_ymd_opt(y + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(y, m + 1, 1)
    };
    match (next, NaiveDate::from_ymd_opt(y, m, 1)) {
        (Some(next), Some(first)) => (next - first).num_days() as u32,
        _ => 31,
    }
}

/// Month grid for the month containing `today`, Monday first.
/// `✓` done, `✗` missed, `○` no check-in, `·` future; today without a
/// check-in shows its day number.
pub fn monthly_calendar(records: &[CheckinRecord], today: NaiveDate) -> String {
    let days = completion_by_day(records);
    let first = today.with_day(1).unwrap_or(today);
    let month_name = MONTHS[today.month0() as usize];

    let mut out = format!("📅 {} {}\n\n", month_name, today.year());
    out.push_str("Mo Tu We Th Fr Sa Su\n");

    let offset = first.weekday().num_days_from_monday() as usize;
    let mut cells: Vec<String> = vec!["  ".to_string(); offset];

    for day in 1..=days_in_month(today) {
        let date = first + Duration::days(day as i64 - 1);
        let cell = if date > today {
            " ·".to_string()
        } else if let Some(&done) = days.get(&date) {
            (if done { " ✓" } else { " ✗" }).to_string()
        } else if date == today {
            format!("{:>2}", day)
        } else {
            " ○".to_string()
        };
        cells.push(cell);
    }

    for week in cells.chunks(7) {
        out.push_str(week.join(" ").trim_end());
        out.push('\n');
    }

    out.push_str("\n✓ = Done  ✗ = Missed  ○ = No data  · = Future");
    out
}

/// One square per day for the last `days` days, oldest first, in rows of 7.
pub fn weekly_strip(records: &[CheckinRecord], today: NaiveDate, days: u32) -> String {
    let by_day = completion_by_day(records);
    let squares: Vec<&str> = (0..days)
        .rev()
        .map(|i| match by_day.get(&(today - Duration::days(i as i64))) {
            Some(true) => "✅",
            Some(false) => "❌",
            None => "⬜",
        })
        .collect();

    let mut out = String::from("📊 Your Journey:\n\n");
    for row in squares.chunks(7) {
        out.push_str(&row.concat());
        out.push('\n');
    }
    out
}

pub fn streak_display(streak: u32) -> String {
    match streak {
        0 => "🌱 Start your journey today!".to_string(),
        1 => "🔥 1 day streak!".to_string(),
        2..=6 => format!("🔥 {} days streak!", streak),
        7..=29 => format!("🔥🔥 {} days streak!", streak),
        30..=99 => format!("🔥🔥🔥 {} days streak!", streak),
        _ => format!("🔥🔥🔥🔥 {} days streak! Legendary!", streak),
    }
}

/// Belt, season, success rate and the road to the next belt.
pub fn rank_card(streak: u32, total_days: u32, completed_days: u32) -> String {
    let rank = rank_for_streak(streak);
    let season = season_for_streak(streak);
    let success = if total_days > 0 {
        (completed_days as f64 / total_days as f64 * 100.0).round() as u32
    } else {
        0
    };

    let mut card = format!("{}\n", CARD_RULE);
    card.push_str(&format!(
        "     {} {} {}\n",
        rank.emoji,
        rank.name.to_uppercase(),
        rank.emoji
    ));
    card.push_str(&format!("{}\n\n", CARD_RULE));
    card.push_str(&format!(
        "{} Season: {} ({})\n",
        season.emoji, season.name, season.kanji
    ));
    card.push_str(&format!("🔥 Current Streak: {} days\n", streak));
    card.push_str(&format!("📊 Success Rate: {}%\n", success));
    card.push_str(&format!("📈 Total Days: {}\n", total_days));

    match next_rank(streak) {
        Some(next) => {
            card.push_str(&format!(
                "\n🎯 Next Rank: {} {}\n",
                next.rank.emoji, next.rank.name
            ));
            card.push_str(&format!(
                "   {}\n",
                progress_bar(streak, next.rank.min_days, 15)
            ));
            card.push_str(&format!("   {} days to go!", next.days_until));
        }
        None => {
            card.push_str("\n👑 MAX RANK ACHIEVED! 👑\n");
            card.push_str("   You are a true Sensei!");
        }
    }

    card
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(date: NaiveDate, completed: bool) -> CheckinRecord {
        CheckinRecord { date, completed }
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(d(2024, 2, 10)), 29);
        assert_eq!(days_in_month(d(2023, 2, 10)), 28);
        assert_eq!(days_in_month(d(2024, 12, 31)), 31);
        assert_eq!(days_in_month(d(2024, 4, 1)), 30);
    }

    #[test]
    fn calendar_marks_days() {
        // April 2024 starts on a Monday
        let today = d(2024, 4, 4);
        let records = [rec(d(2024, 4, 1), true), rec(d(2024, 4, 2), false)];
        let cal = monthly_calendar(&records, today);
        let lines: Vec<&str> = cal.lines().collect();

        assert_eq!(lines[0], "📅 April 2024");
        assert_eq!(lines[2], "Mo Tu We Th Fr Sa Su");
        // done, missed, no data, today, then future
        assert_eq!(lines[3], " ✓  ✗  ○  4  ·  ·  ·");
        assert!(cal.ends_with("· = Future"));
    }

    #[test]
    fn calendar_pads_first_week() {
        // March 2024 starts on a Friday
        let cal = monthly_calendar(&[], d(2024, 3, 1));
        let first_week = cal.lines().nth(3).unwrap();
        assert!(first_week.starts_with("            "));
        assert!(first_week.ends_with(" 1  ·  ·"));
    }

    #[test]
    fn strip_rows_of_seven() {
        let today = d(2024, 5, 14);
        let records = [rec(today, true), rec(d(2024, 5, 13), false)];
        let strip = weekly_strip(&records, today, 14);
        let rows: Vec<&str> = strip.lines().skip(2).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], "⬜⬜⬜⬜⬜⬜⬜");
        assert_eq!(rows[1], "⬜⬜⬜⬜⬜❌✅");
    }

    #[test]
    fn streak_lines() {
        assert_eq!(streak_display(0), "🌱 Start your journey today!");
        assert_eq!(streak_display(1), "🔥 1 day streak!");
        assert_eq!(streak_display(6), "🔥 6 days streak!");
        assert_eq!(streak_display(7), "🔥🔥 7 days streak!");
        assert_eq!(streak_display(30), "🔥🔥🔥 30 days streak!");
        assert_eq!(streak_display(100), "🔥🔥🔥🔥 100 days streak! Legendary!");
    }

    #[test]
    fn card_shows_next_rank() {
        let card = rank_card(10, 20, 15);
        assert!(card.contains("🟡 YELLOW BELT 🟡"));
        assert!(card.contains("🌿 Season: Summer (夏)"));
        assert!(card.contains("📊 Success Rate: 75%"));
        assert!(card.contains("🎯 Next Rank: 🟠 Orange Belt"));
        assert!(card.contains("11 days to go!"));
    }

    #[test]
    fn card_at_max_rank() {
        let card = rank_card(400, 400, 400);
        assert!(card.contains("MAX RANK ACHIEVED"));
        assert!(!card.contains("Next Rank"));
    }
}
