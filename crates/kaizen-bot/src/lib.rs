//! The Kaizen conversation layer: commands, callback buttons, multi-step
//! flows and the reminder scheduler, written against the [`Messenger`]
//! trait so the transport can be swapped out in tests.

mod automation;
mod buddy;
mod checkin;
pub mod commands;
mod groups;
mod help;
pub mod keyboards;
pub mod messenger;
mod onboarding;
mod reminders;
mod router;
mod settings;
pub mod state;
mod stats;
mod tasks;

pub use checkin::SubmissionResult;
pub use commands::Command;
pub use messenger::{
    Button, Chat, ChatKind, IncomingCallback, IncomingMessage, Keyboard, MembershipChange, Messenger,
    Sender, Voice,
};
pub use reminders::{Scheduler, SweepReport};
pub use state::{AppState, Bot, BotSettings};
