use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

/// Hours (UTC) at which the daily reminder sweep runs unless configured.
pub const DEFAULT_REMINDER_HOURS: [u8; 4] = [8, 18, 20, 22];

pub const INVITE_CODE_LEN: usize = 6;
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static HOUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$").unwrap()
});

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:in\s+)?(\d{1,4})\s*(m|min|mins|minutes?|h|hrs?|hours?|d|days?)$")
        .unwrap()
});

/// Current UTC calendar day. All check-in dates use this granularity.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_ago(today: NaiveDate, n: u32) -> NaiveDate {
    today - Duration::days(n as i64)
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Parse a reminder time typed by the user. Accepts `8`, `20`, `8am`,
/// `8:00 pm`, `10 PM`. Minutes other than `00` are rejected, as is any hour
/// not in `allowed`.
pub fn parse_reminder_hour(input: &str, allowed: &[u8]) -> Option<u8> {
    let normalized = input.trim().to_lowercase();
    let caps = HOUR_RE.captures(&normalized)?;

    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    if let Some(minutes) = caps.get(2) {
        if minutes.as_str() != "00" {
            return None;
        }
    }

    match caps.get(3).map(|m| m.as_str()) {
        Some(meridiem) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            hour %= 12;
            if meridiem == "pm" {
                hour += 12;
            }
        }
        None if hour > 23 => return None,
        None => {}
    }

    let hour = hour as u8;
    allowed.contains(&hour).then_some(hour)
}

/// `20` → `8:00 PM`, `0` → `12:00 AM`.
pub fn format_hour_12(hour: u8) -> String {
    let meridiem = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:00 {}", display, meridiem)
}

/// Parse a relative delay such as `30m`, `2h`, `in 3 days`.
pub fn parse_relative_delay(input: &str) -> Option<Duration> {
    let normalized = input.trim().to_lowercase();
    let caps = OFFSET_RE.captures(&normalized)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    if amount == 0 {
        return None;
    }
    let unit = caps.get(2)?.as_str();
    let delay = match unit.chars().next()? {
        'm' => Duration::minutes(amount),
        'h' => Duration::hours(amount),
        _ => Duration::days(amount),
    };
    Some(delay)
}

pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse().ok()
}

/// Wall-clock rendering of `now` in the user's timezone, e.g.
/// `Mon, Mar 4 9:05 PM`. Unknown zones fall back to UTC.
pub fn local_time_label(now: DateTime<Utc>, timezone: &str) -> String {
    let tz = parse_timezone(timezone).unwrap_or(Tz::UTC);
    now.with_timezone(&tz).format("%a, %b %-d %-I:%M %p").to_string()
}

/// Six characters from `[A-Z0-9]`.
pub fn generate_invite_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.random_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        // 2024-03-07 is a Thursday
        assert_eq!(week_start(d(2024, 3, 7)), d(2024, 3, 4));
        assert_eq!(week_start(d(2024, 3, 4)), d(2024, 3, 4));
        assert_eq!(week_start(d(2024, 3, 10)), d(2024, 3, 4));
    }

    #[test]
    fn month_start_and_days_ago() {
        assert_eq!(month_start(d(2024, 2, 29)), d(2024, 2, 1));
        assert_eq!(days_ago(d(2024, 3, 1), 1), d(2024, 2, 29));
        assert_eq!(days_ago(d(2024, 3, 1), 0), d(2024, 3, 1));
    }

    #[test]
    fn reminder_hour_formats() {
        let allowed = DEFAULT_REMINDER_HOURS;
        assert_eq!(parse_reminder_hour("8", &allowed), Some(8));
        assert_eq!(parse_reminder_hour("20", &allowed), Some(20));
        assert_eq!(parse_reminder_hour("8am", &allowed), Some(8));
        assert_eq!(parse_reminder_hour("8:00 pm", &allowed), Some(20));
        assert_eq!(parse_reminder_hour("10 PM", &allowed), Some(22));
        assert_eq!(parse_reminder_hour(" 6pm ", &allowed), Some(18));
    }

    #[test]
    fn reminder_hour_rejections() {
        let allowed = DEFAULT_REMINDER_HOURS;
        assert_eq!(parse_reminder_hour("8:30 pm", &allowed), None);
        assert_eq!(parse_reminder_hour("9am", &allowed), None);
        assert_eq!(parse_reminder_hour("13pm", &allowed), None);
        assert_eq!(parse_reminder_hour("25", &allowed), None);
        assert_eq!(parse_reminder_hour("tonight", &allowed), None);
        assert_eq!(parse_reminder_hour("9am", &[9]), Some(9));
        assert_eq!(parse_reminder_hour("12am", &[0]), Some(0));
        assert_eq!(parse_reminder_hour("12pm", &[12]), Some(12));
    }

    #[test]
    fn twelve_hour_labels() {
        assert_eq!(format_hour_12(0), "12:00 AM");
        assert_eq!(format_hour_12(8), "8:00 AM");
        assert_eq!(format_hour_12(12), "12:00 PM");
        assert_eq!(format_hour_12(22), "10:00 PM");
    }

    #[test]
    fn relative_delays() {
        assert_eq!(parse_relative_delay("30m"), Some(Duration::minutes(30)));
        assert_eq!(parse_relative_delay("in 2 hours"), Some(Duration::hours(2)));
        assert_eq!(parse_relative_delay("3d"), Some(Duration::days(3)));
        assert_eq!(parse_relative_delay("0m"), None);
        assert_eq!(parse_relative_delay("soon"), None);
    }

    #[test]
    fn timezones() {
        assert!(parse_timezone("Asia/Tokyo").is_some());
        assert!(parse_timezone("Mars/Olympus").is_none());

        let now = DateTime::parse_from_rfc3339("2024-03-04T12:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(local_time_label(now, "Asia/Tokyo"), "Mon, Mar 4 9:05 PM");
        assert_eq!(local_time_label(now, "nonsense"), "Mon, Mar 4 12:05 PM");
    }

    #[test]
    fn invite_codes_use_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        let code = generate_invite_code(&mut rng);
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
