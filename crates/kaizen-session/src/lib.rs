//! Per-user conversation state and per-user request budgets.
//!
//! Handlers never keep their own maps: onboarding, task entry, the check-in
//! checklist and automation prompts all live in a [`SessionStore`], which is
//! an in-memory map in tests and a SQLite table in production.

pub mod rate_limit;
pub mod session;
pub mod store;

pub use rate_limit::{Feature, RateLimiter};
pub use session::{AutomationStep, Session};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
