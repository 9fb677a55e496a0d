use std::fmt;

/// Inline keyboard payloads. Telegram caps callback data at 64 bytes, so the
/// wire form is a short `prefix_value` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Onboarding: reminder hour picked (`reminder_<h>`, `reminder_off`)
    ReminderHour(Option<u8>),

    /// Onboarding: user is done entering tasks
    TasksDone,

    /// Check-in: flip one task in the current selection
    ToggleTask(i64),

    /// Check-in: persist the current selection for a group
    SubmitCheckin(i64),

    /// Check-in: user picked which group to check in for
    SelectGroup(i64),

    /// Reminder button: open the checklist for a group
    StartCheckin(i64),

    /// Soft-delete one of the user's tasks
    RemoveTask(i64),

    /// Main menu shortcut
    Menu(MenuItem),

    /// Automation hub entry
    Automation(AutomationItem),

    /// Research workflow: depth picked
    ResearchDepth(ResearchDepth),

    /// Research workflow: where to save the result
    SaveResearch(SaveTarget),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Checkin,
    View,
    Stats,
    Quote,
    Groups,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationItem {
    Research,
    Scrape,
    Calendar,
    CalendarCreate,
    CalendarList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResearchDepth {
    Quick,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    Notion,
    Obsidian,
    Chat,
}

impl MenuItem {
    fn token(self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::View => "view",
            Self::Stats => "stats",
            Self::Quote => "quote",
            Self::Groups => "groups",
            Self::Help => "help",
        }
    }

    fn from_token(s: &str) -> Option<Self> {
        [
            Self::Checkin,
            Self::View,
            Self::Stats,
            Self::Quote,
            Self::Groups,
            Self::Help,
        ]
        .into_iter()
        .find(|item| item.token() == s)
    }
}

impl ResearchDepth {
    pub fn label(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Deep => "deep",
        }
    }
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix("reminder_") {
            if rest == "off" {
                return Some(Self::ReminderHour(None));
            }
            let hour: u8 = rest.parse().ok()?;
            return (hour < 24).then_some(Self::ReminderHour(Some(hour)));
        }
        if data == "tasks_done" {
            return Some(Self::TasksDone);
        }
        if let Some(id) = data.strip_prefix("toggle_task_") {
            return id.parse().ok().map(Self::ToggleTask);
        }
        if let Some(id) = data.strip_prefix("submit_checkin_") {
            return id.parse().ok().map(Self::SubmitCheckin);
        }
        if let Some(id) = data.strip_prefix("select_group_") {
            return id.parse().ok().map(Self::SelectGroup);
        }
        if let Some(id) = data.strip_prefix("checkin_start_") {
            return id.parse().ok().map(Self::StartCheckin);
        }
        if let Some(id) = data.strip_prefix("remove_task_") {
            return id.parse().ok().map(Self::RemoveTask);
        }
        if let Some(item) = data.strip_prefix("menu_") {
            return MenuItem::from_token(item).map(Self::Menu);
        }
        match data {
            "auto_research" => Some(Self::Automation(AutomationItem::Research)),
            "auto_scrape" => Some(Self::Automation(AutomationItem::Scrape)),
            "auto_calendar" => Some(Self::Automation(AutomationItem::Calendar)),
            "cal_create" => Some(Self::Automation(AutomationItem::CalendarCreate)),
            "cal_list" => Some(Self::Automation(AutomationItem::CalendarList)),
            "depth_quick" => Some(Self::ResearchDepth(ResearchDepth::Quick)),
            "depth_deep" => Some(Self::ResearchDepth(ResearchDepth::Deep)),
            "save_notion" => Some(Self::SaveResearch(SaveTarget::Notion)),
            "save_obsidian" => Some(Self::SaveResearch(SaveTarget::Obsidian)),
            "save_chat" => Some(Self::SaveResearch(SaveTarget::Chat)),
            _ => None,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::ReminderHour(Some(h)) => format!("reminder_{}", h),
            Self::ReminderHour(None) => "reminder_off".into(),
            Self::TasksDone => "tasks_done".into(),
            Self::ToggleTask(id) => format!("toggle_task_{}", id),
            Self::SubmitCheckin(id) => format!("submit_checkin_{}", id),
            Self::SelectGroup(id) => format!("select_group_{}", id),
            Self::StartCheckin(id) => format!("checkin_start_{}", id),
            Self::RemoveTask(id) => format!("remove_task_{}", id),
            Self::Menu(item) => format!("menu_{}", item.token()),
            Self::Automation(AutomationItem::Research) => "auto_research".into(),
            Self::Automation(AutomationItem::Scrape) => "auto_scrape".into(),
            Self::Automation(AutomationItem::Calendar) => "auto_calendar".into(),
            Self::Automation(AutomationItem::CalendarCreate) => "cal_create".into(),
            Self::Automation(AutomationItem::CalendarList) => "cal_list".into(),
            Self::ResearchDepth(depth) => format!("depth_{}", depth.label()),
            Self::SaveResearch(SaveTarget::Notion) => "save_notion".into(),
            Self::SaveResearch(SaveTarget::Obsidian) => "save_obsidian".into(),
            Self::SaveResearch(SaveTarget::Chat) => "save_chat".into(),
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_id_tokens() {
        assert_eq!(CallbackAction::parse("toggle_task_17"), Some(CallbackAction::ToggleTask(17)));
        assert_eq!(
            CallbackAction::parse("submit_checkin_3"),
            Some(CallbackAction::SubmitCheckin(3))
        );
        assert_eq!(CallbackAction::parse("select_group_8"), Some(CallbackAction::SelectGroup(8)));
        assert_eq!(CallbackAction::parse("checkin_start_5"), Some(CallbackAction::StartCheckin(5)));
        assert_eq!(CallbackAction::parse("remove_task_2"), Some(CallbackAction::RemoveTask(2)));
    }

    #[test]
    fn parses_reminder_hours() {
        assert_eq!(CallbackAction::parse("reminder_20"), Some(CallbackAction::ReminderHour(Some(20))));
        assert_eq!(CallbackAction::parse("reminder_off"), Some(CallbackAction::ReminderHour(None)));
        assert_eq!(CallbackAction::parse("reminder_24"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(CallbackAction::parse("toggle_task_abc"), None);
        assert_eq!(CallbackAction::parse("menu_nope"), None);
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("launch_rockets"), None);
    }

    #[test]
    fn wire_form_survives_parse() {
        let actions = [
            CallbackAction::TasksDone,
            CallbackAction::Menu(MenuItem::Stats),
            CallbackAction::Automation(AutomationItem::CalendarList),
            CallbackAction::ResearchDepth(ResearchDepth::Deep),
            CallbackAction::SaveResearch(SaveTarget::Obsidian),
            CallbackAction::ReminderHour(Some(8)),
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.to_string()), Some(action));
        }
    }
}
