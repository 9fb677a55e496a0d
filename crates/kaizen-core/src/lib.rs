//! Pure domain logic: dates, streaks, belts, milestones, check-in outcomes
//! and the text renderings built on top of them. Nothing here touches I/O.

pub mod checkin;
pub mod dates;
pub mod milestone;
pub mod quotes;
pub mod rank;
pub mod streak;
pub mod visuals;
