use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_TASKS: usize = 5;
pub const TASK_NAME_MIN: usize = 3;
pub const TASK_NAME_MAX: usize = 100;

/// How a day went, from the share of tasks ticked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckinOutcome {
    Crushed,
    Completed,
    Partial,
    Missed,
}

impl CheckinOutcome {
    /// All done → Crushed, ≥ 75% → Completed, ≥ 50% → Partial, else Missed.
    /// An empty checklist is Missed.
    pub fn classify(done: usize, total: usize) -> Self {
        if total == 0 {
            return Self::Missed;
        }
        if done >= total {
            Self::Crushed
        } else if done * 4 >= total * 3 {
            Self::Completed
        } else if done * 2 >= total {
            Self::Partial
        } else {
            Self::Missed
        }
    }

    /// Only Crushed and Completed advance a streak.
    pub fn counts_as_completed(self) -> bool {
        matches!(self, Self::Crushed | Self::Completed)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Crushed => "CRUSHED IT!",
            Self::Completed => "Great job!",
            Self::Partial => "Partial progress",
            Self::Missed => "Keep trying",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Crushed => "🌟",
            Self::Completed => "✅",
            Self::Partial => "⚡",
            Self::Missed => "💪",
        }
    }
}

/// Snapshot of a task taken when the checklist opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("task {0} is not on this checklist")]
    UnknownTask(i64),
    #[error("checklist is for group {expected}, not {got}")]
    WrongGroup { expected: i64, got: i64 },
}

/// The in-progress checklist for one user and one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinSelection {
    pub group_id: i64,
    pub group_name: String,
    pub tasks: Vec<TaskRef>,
    pub toggled: BTreeSet<i64>,
}

impl CheckinSelection {
    pub fn new(group_id: i64, group_name: impl Into<String>, tasks: Vec<TaskRef>) -> Self {
        Self {
            group_id,
            group_name: group_name.into(),
            tasks,
            toggled: BTreeSet::new(),
        }
    }

    /// Flip a task; returns whether it is now ticked.
    pub fn toggle(&mut self, task_id: i64) -> Result<bool, SelectionError> {
        if !self.tasks.iter().any(|t| t.id == task_id) {
            return Err(SelectionError::UnknownTask(task_id));
        }
        if self.toggled.remove(&task_id) {
            Ok(false)
        } else {
            self.toggled.insert(task_id);
            Ok(true)
        }
    }

    pub fn ensure_group(&self, group_id: i64) -> Result<(), SelectionError> {
        if self.group_id == group_id {
            Ok(())
        } else {
            Err(SelectionError::WrongGroup {
                expected: self.group_id,
                got: group_id,
            })
        }
    }

    pub fn is_done(&self, task_id: i64) -> bool {
        self.toggled.contains(&task_id)
    }

    pub fn done_count(&self) -> usize {
        self.tasks.iter().filter(|t| self.is_done(t.id)).count()
    }

    pub fn outcome(&self) -> CheckinOutcome {
        CheckinOutcome::classify(self.done_count(), self.tasks.len())
    }

    /// One `(task_id, completed)` pair per task on the checklist.
    pub fn completions(&self) -> Vec<(i64, bool)> {
        self.tasks.iter().map(|t| (t.id, self.is_done(t.id))).collect()
    }

    /// Checklist body while selecting (`☐` / `✅`).
    pub fn render_pending(&self) -> String {
        self.tasks
            .iter()
            .map(|t| format!("{} {}", if self.is_done(t.id) { "✅" } else { "☐" }, t.name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Checklist body after submission (`✅` / `❌`).
    pub fn render_result(&self) -> String {
        self.tasks
            .iter()
            .map(|t| format!("{} {}", if self.is_done(t.id) { "✅" } else { "❌" }, t.name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskNameError {
    #[error("Task name is too short. Please use at least 3 characters.")]
    TooShort,
    #[error("Task name is too long. Please keep it under 100 characters.")]
    TooLong,
}

/// Trimmed task name, or why it was rejected.
pub fn validate_task_name(raw: &str) -> Result<String, TaskNameError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < TASK_NAME_MIN {
        Err(TaskNameError::TooShort)
    } else if len > TASK_NAME_MAX {
        Err(TaskNameError::TooLong)
    } else {
        Ok(name.to_string())
    }
}

/// First-run setup: `collecting-tasks → awaiting-reminder-time → idle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Onboarding {
    CollectingTasks { tasks: Vec<String> },
    AwaitingReminder { tasks: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OnboardingError {
    #[error(transparent)]
    InvalidName(#[from] TaskNameError),
    #[error("You already have the maximum of 5 tasks.")]
    TooManyTasks,
    #[error("Add at least one task first.")]
    NoTasks,
    #[error("Not expecting that right now.")]
    WrongStep,
}

impl Default for Onboarding {
    fn default() -> Self {
        Self::CollectingTasks { tasks: Vec::new() }
    }
}

impl Onboarding {
    pub fn tasks(&self) -> &[String] {
        match self {
            Self::CollectingTasks { tasks } | Self::AwaitingReminder { tasks } => tasks,
        }
    }

    /// Add a task while collecting. Returns the number collected so far.
    pub fn add_task(&mut self, raw: &str) -> Result<usize, OnboardingError> {
        let Self::CollectingTasks { tasks } = self else {
            return Err(OnboardingError::WrongStep);
        };
        if tasks.len() >= MAX_TASKS {
            return Err(OnboardingError::TooManyTasks);
        }
        tasks.push(validate_task_name(raw)?);
        Ok(tasks.len())
    }

    /// Move on to the reminder question once at least one task exists.
    pub fn finish_tasks(&mut self) -> Result<(), OnboardingError> {
        let Self::CollectingTasks { tasks } = self else {
            return Err(OnboardingError::WrongStep);
        };
        if tasks.is_empty() {
            return Err(OnboardingError::NoTasks);
        }
        *self = Self::AwaitingReminder {
            tasks: std::mem::take(tasks),
        };
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.tasks().len() >= MAX_TASKS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(n: i64) -> CheckinSelection {
        let tasks = (1..=n)
            .map(|id| TaskRef {
                id,
                name: format!("Task {}", id),
            })
            .collect();
        CheckinSelection::new(7, "Dojo", tasks)
    }

    #[test]
    fn outcome_bands() {
        assert_eq!(CheckinOutcome::classify(4, 4), CheckinOutcome::Crushed);
        assert_eq!(CheckinOutcome::classify(3, 4), CheckinOutcome::Completed);
        assert_eq!(CheckinOutcome::classify(2, 4), CheckinOutcome::Partial);
        assert_eq!(CheckinOutcome::classify(1, 4), CheckinOutcome::Missed);
        assert_eq!(CheckinOutcome::classify(0, 0), CheckinOutcome::Missed);
        // 2/3 ≈ 0.67 sits between the partial and completed bands
        assert_eq!(CheckinOutcome::classify(2, 3), CheckinOutcome::Partial);
        assert_eq!(CheckinOutcome::classify(1, 2), CheckinOutcome::Partial);
    }

    #[test]
    fn only_top_bands_advance() {
        assert!(CheckinOutcome::Crushed.counts_as_completed());
        assert!(CheckinOutcome::Completed.counts_as_completed());
        assert!(!CheckinOutcome::Partial.counts_as_completed());
        assert!(!CheckinOutcome::Missed.counts_as_completed());
    }

    #[test]
    fn toggling_flips_membership() {
        let mut sel = selection(2);
        assert_eq!(sel.toggle(1), Ok(true));
        assert_eq!(sel.done_count(), 1);
        assert_eq!(sel.outcome(), CheckinOutcome::Partial);
        assert_eq!(sel.toggle(1), Ok(false));
        assert_eq!(sel.done_count(), 0);
        assert_eq!(sel.toggle(99), Err(SelectionError::UnknownTask(99)));
    }

    #[test]
    fn completions_cover_every_task() {
        let mut sel = selection(3);
        sel.toggle(2).unwrap();
        assert_eq!(sel.completions(), vec![(1, false), (2, true), (3, false)]);
        assert_eq!(sel.render_result(), "❌ Task 1\n✅ Task 2\n❌ Task 3");
        assert_eq!(sel.render_pending(), "☐ Task 1\n✅ Task 2\n☐ Task 3");
    }

    #[test]
    fn group_guard() {
        let sel = selection(1);
        assert!(sel.ensure_group(7).is_ok());
        assert_eq!(
            sel.ensure_group(8),
            Err(SelectionError::WrongGroup { expected: 7, got: 8 })
        );
    }

    #[test]
    fn selection_survives_serialization() {
        let mut sel = selection(2);
        sel.toggle(2).unwrap();
        let json = serde_json::to_string(&sel).unwrap();
        let back: CheckinSelection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sel);
    }

    #[test]
    fn task_name_limits() {
        assert_eq!(validate_task_name("  Run  "), Ok("Run".to_string()));
        assert_eq!(validate_task_name("ab"), Err(TaskNameError::TooShort));
        assert_eq!(validate_task_name(&"x".repeat(101)), Err(TaskNameError::TooLong));
        assert!(validate_task_name(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn onboarding_flow() {
        let mut ob = Onboarding::default();
        assert_eq!(ob.finish_tasks(), Err(OnboardingError::NoTasks));
        for i in 1..=MAX_TASKS {
            assert_eq!(ob.add_task(&format!("Task {}", i)), Ok(i));
        }
        assert!(ob.is_full());
        assert_eq!(ob.add_task("One more"), Err(OnboardingError::TooManyTasks));

        ob.finish_tasks().unwrap();
        assert!(matches!(ob, Onboarding::AwaitingReminder { .. }));
        assert_eq!(ob.tasks().len(), MAX_TASKS);
        assert_eq!(ob.add_task("Late"), Err(OnboardingError::WrongStep));
    }

    #[test]
    fn onboarding_rejects_short_names() {
        let mut ob = Onboarding::default();
        assert_eq!(
            ob.add_task("a"),
            Err(OnboardingError::InvalidName(TaskNameError::TooShort))
        );
        assert!(ob.tasks().is_empty());
    }
}
