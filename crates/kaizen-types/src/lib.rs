pub mod callbacks;
pub mod error;
pub mod models;

pub use callbacks::CallbackAction;
pub use error::{BotError, BotResult, Prerequisite};
