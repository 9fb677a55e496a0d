use std::fmt;

use thiserror::Error;

/// Something the user has to do before the requested command can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// No user row yet; `/start` creates it.
    Account,
    /// User has no active tasks.
    Tasks,
    /// User is not a member of any group.
    Group,
    /// Command only makes sense inside a group chat.
    GroupChat,
    /// Command only makes sense in a private chat.
    PrivateChat,
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Account => "account",
            Self::Tasks => "tasks",
            Self::Group => "group",
            Self::GroupChat => "group chat",
            Self::PrivateChat => "private chat",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("missing prerequisite: {0}")]
    Prerequisite(Prerequisite),

    #[error("integration failed: {0}")]
    Integration(String),

    #[error("rate limited, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BotError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Text sent back to the user. Internal failures never leak details.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Prerequisite(Prerequisite::Account) => {
                "Please use /start first to set up your account!".into()
            }
            Self::Prerequisite(Prerequisite::Tasks) => {
                "You don't have any tasks yet. Use /start or /addtask to add some!".into()
            }
            Self::Prerequisite(Prerequisite::Group) => {
                "You're not in any groups yet. Add me to a group chat and send /join there!".into()
            }
            Self::Prerequisite(Prerequisite::GroupChat) => {
                "This command only works in group chats.".into()
            }
            Self::Prerequisite(Prerequisite::PrivateChat) => {
                "Please send me this command in a private chat.".into()
            }
            Self::Integration(msg) => format!("❌ {}", msg),
            Self::RateLimited { retry_after_secs } => {
                let minutes = retry_after_secs.div_ceil(60).max(1);
                format!(
                    "⏳ Slow down! You've hit the limit for this feature. Try again in {} minute{}.",
                    minutes,
                    if minutes == 1 { "" } else { "s" }
                )
            }
            Self::Internal(_) => "Sorry, something went wrong. Please try again.".into(),
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_opaque() {
        let err = BotError::from(anyhow::anyhow!("disk I/O error at page 7"));
        assert!(!err.user_message().contains("disk"));
    }

    #[test]
    fn rate_limit_message_rounds_up() {
        let err = BotError::RateLimited { retry_after_secs: 61 };
        assert!(err.user_message().contains("2 minutes"));
        let err = BotError::RateLimited { retry_after_secs: 5 };
        assert!(err.user_message().contains("1 minute."));
    }

    #[test]
    fn validation_is_passed_through() {
        let err = BotError::validation("Task name is too short");
        assert_eq!(err.user_message(), "Task name is too short");
    }
}
