/// A slash command with its argument text, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Checkin,
    AddTask(Option<String>),
    RemoveTask,
    View,
    Stats,
    Groups,
    Join(Option<String>),
    Quote,
    Today,
    Leaderboard,
    Remind(Option<String>),
    RemindMe(Option<String>),
    Freeze(Option<String>),
    Buddy(Option<String>),
    Timezone(Option<String>),
    Report,
    Insights,
    Ask(Option<String>),
    Research(Option<String>),
    Scrape(Option<String>),
    Calendar,
    Automate,
    RateLimits,
    Cancel,
    Help,
    Menu,
    Unknown(String),
}

impl Command {
    /// Parse `/name args`. Accepts `/name@botname` as sent in groups.
    /// Returns `None` when the text is not a command at all.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        if name.is_empty() {
            return None;
        }
        let arg = (!args.is_empty()).then(|| args.to_string());

        let cmd = match name.as_str() {
            "start" => Self::Start,
            "checkin" => Self::Checkin,
            "addtask" => Self::AddTask(arg),
            "removetask" => Self::RemoveTask,
            "view" => Self::View,
            "stats" => Self::Stats,
            "groups" => Self::Groups,
            "join" => Self::Join(arg),
            "quote" => Self::Quote,
            "today" => Self::Today,
            "leaderboard" => Self::Leaderboard,
            "remind" => Self::Remind(arg),
            "remindme" => Self::RemindMe(arg),
            "freeze" => Self::Freeze(arg),
            "buddy" => Self::Buddy(arg),
            "timezone" => Self::Timezone(arg),
            "report" => Self::Report,
            "insights" => Self::Insights,
            "ask" => Self::Ask(arg),
            "research" | "dr" => Self::Research(arg),
            "scrape" => Self::Scrape(arg),
            "calendar" => Self::Calendar,
            "automate" => Self::Automate,
            "ratelimits" | "limits" => Self::RateLimits,
            "cancel" => Self::Cancel,
            "help" => Self::Help,
            "menu" => Self::Menu,
            _ => Self::Unknown(name),
        };
        Some(cmd)
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Checkin => "checkin",
            Self::AddTask(_) => "addtask",
            Self::RemoveTask => "removetask",
            Self::View => "view",
            Self::Stats => "stats",
            Self::Groups => "groups",
            Self::Join(_) => "join",
            Self::Quote => "quote",
            Self::Today => "today",
            Self::Leaderboard => "leaderboard",
            Self::Remind(_) => "remind",
            Self::RemindMe(_) => "remindme",
            Self::Freeze(_) => "freeze",
            Self::Buddy(_) => "buddy",
            Self::Timezone(_) => "timezone",
            Self::Report => "report",
            Self::Insights => "insights",
            Self::Ask(_) => "ask",
            Self::Research(_) => "research",
            Self::Scrape(_) => "scrape",
            Self::Calendar => "calendar",
            Self::Automate => "automate",
            Self::RateLimits => "ratelimits",
            Self::Cancel => "cancel",
            Self::Help => "help",
            Self::Menu => "menu",
            Self::Unknown(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("  /checkin  "), Some(Command::Checkin));
        assert_eq!(Command::parse("/Leaderboard"), Some(Command::Leaderboard));
    }

    #[test]
    fn group_mentions_are_stripped() {
        assert_eq!(Command::parse("/today@KaizenBot"), Some(Command::Today));
        assert_eq!(
            Command::parse("/join@KaizenBot ABC123"),
            Some(Command::Join(Some("ABC123".into())))
        );
    }

    #[test]
    fn arguments_keep_inner_spacing() {
        assert_eq!(
            Command::parse("/addtask Read 10 pages"),
            Some(Command::AddTask(Some("Read 10 pages".into())))
        );
        assert_eq!(Command::parse("/addtask   "), Some(Command::AddTask(None)));
    }

    #[test]
    fn aliases() {
        assert_eq!(
            Command::parse("/dr rust async"),
            Some(Command::Research(Some("rust async".into())))
        );
        assert_eq!(Command::parse("/limits"), Some(Command::RateLimits));
    }

    #[test]
    fn non_commands() {
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/"), None);
        assert_eq!(Command::parse("/frobnicate"), Some(Command::Unknown("frobnicate".into())));
    }
}
