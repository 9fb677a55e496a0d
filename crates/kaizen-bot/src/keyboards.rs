use kaizen_core::checkin::CheckinSelection;
use kaizen_core::dates::format_hour_12;
use kaizen_types::CallbackAction;
use kaizen_types::callbacks::{AutomationItem, MenuItem, ResearchDepth, SaveTarget};
use kaizen_types::models::{Group, Task};

use crate::messenger::{Button, Keyboard};

pub fn reminder_hours(hours: &[u8], with_off: bool) -> Keyboard {
    let mut rows: Keyboard = hours
        .iter()
        .map(|&h| vec![Button::new(format_hour_12(h), CallbackAction::ReminderHour(Some(h)))])
        .collect();
    if with_off {
        rows.push(vec![Button::new("🔕 No reminders", CallbackAction::ReminderHour(None))]);
    }
    rows
}

pub fn tasks_done(count: usize) -> Keyboard {
    vec![vec![Button::new(
        format!("✅ Done ({} task{})", count, if count == 1 { "" } else { "s" }),
        CallbackAction::TasksDone,
    )]]
}

/// One toggle per task, then the submit button.
pub fn checklist(selection: &CheckinSelection) -> Keyboard {
    let mut rows: Keyboard = selection
        .tasks
        .iter()
        .map(|t| {
            let mark = if selection.is_done(t.id) { "✅" } else { "☐" };
            vec![Button::new(
                format!("{} {}", mark, t.name),
                CallbackAction::ToggleTask(t.id),
            )]
        })
        .collect();
    rows.push(vec![Button::new(
        "✅ Submit Check-in",
        CallbackAction::SubmitCheckin(selection.group_id),
    )]);
    rows
}

pub fn group_selection(groups: &[Group]) -> Keyboard {
    groups
        .iter()
        .map(|g| vec![Button::new(g.name.clone(), CallbackAction::SelectGroup(g.id))])
        .collect()
}

pub fn start_checkin(group_id: i64) -> Keyboard {
    vec![vec![Button::new("✅ Check in now", CallbackAction::StartCheckin(group_id))]]
}

pub fn remove_tasks(tasks: &[Task]) -> Keyboard {
    tasks
        .iter()
        .map(|t| vec![Button::new(format!("🗑 {}", t.name), CallbackAction::RemoveTask(t.id))])
        .collect()
}

pub fn main_menu() -> Keyboard {
    vec![
        vec![
            Button::new("✓ Check In", CallbackAction::Menu(MenuItem::Checkin)),
            Button::new("📊 View", CallbackAction::Menu(MenuItem::View)),
        ],
        vec![
            Button::new("📈 Stats", CallbackAction::Menu(MenuItem::Stats)),
            Button::new("💬 Quote", CallbackAction::Menu(MenuItem::Quote)),
        ],
        vec![
            Button::new("👥 Groups", CallbackAction::Menu(MenuItem::Groups)),
            Button::new("❓ Help", CallbackAction::Menu(MenuItem::Help)),
        ],
    ]
}

pub fn automation_hub() -> Keyboard {
    vec![
        vec![Button::new("🔬 Research", CallbackAction::Automation(AutomationItem::Research))],
        vec![Button::new("🌐 Scrape a page", CallbackAction::Automation(AutomationItem::Scrape))],
        vec![Button::new("📅 Calendar", CallbackAction::Automation(AutomationItem::Calendar))],
    ]
}

pub fn calendar_menu() -> Keyboard {
    vec![vec![
        Button::new("➕ Create Event", CallbackAction::Automation(AutomationItem::CalendarCreate)),
        Button::new("📋 List Events", CallbackAction::Automation(AutomationItem::CalendarList)),
    ]]
}

pub fn research_depth() -> Keyboard {
    vec![vec![
        Button::new("⚡ Quick overview", CallbackAction::ResearchDepth(ResearchDepth::Quick)),
        Button::new("🔍 Deep dive", CallbackAction::ResearchDepth(ResearchDepth::Deep)),
    ]]
}

pub fn save_targets() -> Keyboard {
    vec![
        vec![
            Button::new("📝 Notion", CallbackAction::SaveResearch(SaveTarget::Notion)),
            Button::new("💎 Obsidian", CallbackAction::SaveResearch(SaveTarget::Obsidian)),
        ],
        vec![Button::new("💬 Keep in chat", CallbackAction::SaveResearch(SaveTarget::Chat))],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaizen_core::checkin::TaskRef;

    #[test]
    fn checklist_ends_with_submit() {
        let mut selection = CheckinSelection::new(
            4,
            "Dojo",
            vec![
                TaskRef { id: 1, name: "Read".into() },
                TaskRef { id: 2, name: "Run".into() },
            ],
        );
        selection.toggle(2).unwrap();

        let rows = checklist(&selection);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].text, "☐ Read");
        assert_eq!(rows[1][0].text, "✅ Run");
        assert_eq!(rows[1][0].data, "toggle_task_2");
        assert_eq!(rows[2][0].data, "submit_checkin_4");
    }

    #[test]
    fn reminder_keyboard_optionally_offers_off() {
        let rows = reminder_hours(&[8, 20], false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0].text, "8:00 PM");
        assert_eq!(rows[1][0].data, "reminder_20");

        let rows = reminder_hours(&[8], true);
        assert_eq!(rows.last().unwrap()[0].data, "reminder_off");
    }

    #[test]
    fn done_button_counts_tasks() {
        assert_eq!(tasks_done(1)[0][0].text, "✅ Done (1 task)");
        assert_eq!(tasks_done(3)[0][0].text, "✅ Done (3 tasks)");
    }
}
