use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A person who has talked to the bot at least once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub commitment: Option<String>,
    /// UTC hour of the daily reminder; `None` means reminders are off.
    pub reminder_hour: Option<u8>,
    pub timezone: String,
    pub streak_freezes_available: u32,
    pub last_freeze_reset_date: Option<NaiveDate>,
    pub freeze_used_on_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Someone")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A Telegram group chat the bot has been added to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub telegram_chat_id: i64,
    pub name: String,
    pub created_by: Option<i64>,
    pub invite_code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkin {
    pub id: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub check_date: NaiveDate,
    pub completed: bool,
    pub checked_in_at: DateTime<Utc>,
}

/// The slice of a check-in that streak arithmetic cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinRecord {
    pub date: NaiveDate,
    pub completed: bool,
}

impl From<&Checkin> for CheckinRecord {
    fn from(c: &Checkin) -> Self {
        Self {
            date: c.check_date,
            completed: c.completed,
        }
    }
}

/// Everything a streak is derived from: every check-in the user made and
/// every day a streak freeze covered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakHistory {
    pub records: Vec<CheckinRecord>,
    pub frozen: BTreeSet<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuddyRequestStatus {
    Pending,
    Matched,
    Cancelled,
}

impl BuddyRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Matched => "matched",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "matched" => Some(Self::Matched),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuddyRequest {
    pub id: i64,
    pub user_id: i64,
    pub status: BuddyRequestStatus,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuddyMatchStatus {
    Active,
    Ended,
}

impl BuddyMatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "ended" => Some(Self::Ended),
            _ => None,
        }
    }
}

/// Participants are stored with `user1_id < user2_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuddyMatch {
    pub id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    pub status: BuddyMatchStatus,
    pub matched_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl BuddyMatch {
    pub fn partner_of(&self, user_id: i64) -> Option<i64> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

/// An active match seen from one participant's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buddy {
    pub match_id: i64,
    pub matched_at: DateTime<Utc>,
    pub user_id: i64,
    pub telegram_id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl Buddy {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("your buddy")
    }
}

/// Result of asking for a buddy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuddyRequestOutcome {
    /// Paired with the oldest waiting request from someone else.
    Matched(Buddy),
    /// Nobody else is waiting; the request joins the queue.
    Queued,
    AlreadyPending,
    AlreadyMatched(Buddy),
}

/// An ad-hoc reminder scheduled with `/remindme` or from a calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub telegram_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub reminder_time: DateTime<Utc>,
    pub calendar_event_id: Option<String>,
    pub is_sent: bool,
}

/// A user due for the daily reminder, with the groups still missing today's
/// check-in (oldest membership first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderCandidate {
    pub user_id: i64,
    pub telegram_id: i64,
    pub first_name: Option<String>,
    pub commitment: Option<String>,
    pub pending_group_ids: Vec<i64>,
}

/// One member's state for the `/today` group summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDay {
    pub user_id: i64,
    pub display_name: String,
    /// `None` when the member has not checked in yet today.
    pub completed: Option<bool>,
}

/// Completion rate of one task over a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStat {
    pub task_id: i64,
    pub name: String,
    pub total: u32,
    pub completed: u32,
}

impl TaskStat {
    pub fn rate_percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn display_name_prefers_first_name() {
        let mut user = User {
            id: 1,
            telegram_id: 42,
            username: Some("kai".into()),
            first_name: Some("Kai".into()),
            commitment: None,
            reminder_hour: Some(20),
            timezone: "UTC".into(),
            streak_freezes_available: 1,
            last_freeze_reset_date: None,
            freeze_used_on_date: None,
            created_at: ts(),
        };
        assert_eq!(user.display_name(), "Kai");
        user.first_name = None;
        assert_eq!(user.display_name(), "kai");
        user.username = None;
        assert_eq!(user.display_name(), "Someone");
    }

    #[test]
    fn partner_lookup() {
        let m = BuddyMatch {
            id: 1,
            user1_id: 3,
            user2_id: 9,
            status: BuddyMatchStatus::Active,
            matched_at: ts(),
            ended_at: None,
        };
        assert_eq!(m.partner_of(3), Some(9));
        assert_eq!(m.partner_of(9), Some(3));
        assert_eq!(m.partner_of(4), None);
    }

    #[test]
    fn task_rate_rounds() {
        let stat = TaskStat {
            task_id: 1,
            name: "Read".into(),
            total: 3,
            completed: 2,
        };
        assert_eq!(stat.rate_percent(), 67);
        let empty = TaskStat { total: 0, completed: 0, ..stat };
        assert_eq!(empty.rate_percent(), 0);
    }

    #[test]
    fn status_strings() {
        assert_eq!(BuddyRequestStatus::parse("matched"), Some(BuddyRequestStatus::Matched));
        assert_eq!(BuddyRequestStatus::Cancelled.as_str(), "cancelled");
        assert_eq!(BuddyMatchStatus::parse("bogus"), None);
    }
}
