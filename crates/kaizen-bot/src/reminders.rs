use chrono::{Duration, NaiveDate, Timelike};
use kaizen_types::models::ReminderCandidate;
use tracing::{debug, info, warn};

use crate::keyboards;
use crate::state::Bot;

/// Conversation state older than this is dropped by the daily maintenance.
const SESSION_MAX_AGE_HOURS: i64 = 24;

/// Outcome of one sweep, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sent: usize,
    pub failed: usize,
}

/// What the periodic tick has already done, so each hourly sweep and the
/// daily maintenance run once.
#[derive(Debug, Default)]
pub struct Scheduler {
    last_sweep: Option<(NaiveDate, u8)>,
    last_maintenance: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

fn checkin_prompt(candidate: &ReminderCandidate, group_name: &str, other_groups: usize) -> String {
    let mut text = format!("Time to check in! 📝\n\nGroup: {}\n", group_name);
    if let Some(commitment) = candidate.commitment.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(&format!("\nDid you complete your tasks today?\n\"{}\"\n", commitment));
    }
    if other_groups > 0 {
        text.push_str(&format!(
            "\n(+{} more group{} waiting, use /checkin for those)",
            other_groups,
            if other_groups == 1 { "" } else { "s" }
        ));
    }
    text
}

impl Bot {
    // -- Daily reminders --

    /// Remind everyone whose reminder hour is `hour` and who still has a
    /// group without today's check-in. One message per user, naming their
    /// first pending group. A failed delivery never stops the sweep.
    pub async fn run_reminder_sweep(&self, hour: u8) -> anyhow::Result<SweepReport> {
        let _guard = self.sweep_lock.lock().await;
        let today = self.today();

        let candidates = self
            .db(move |db| {
                let mut out = Vec::new();
                for candidate in db.reminder_candidates(hour, today)? {
                    let Some(&first) = candidate.pending_group_ids.first() else {
                        continue;
                    };
                    let name = db
                        .get_group(first)?
                        .map_or_else(|| "your group".to_string(), |g| g.name);
                    out.push((candidate, first, name));
                }
                Ok(out)
            })
            .await?;
        info!(hour, count = candidates.len(), "Sending check-in reminders");

        let mut report = SweepReport::default();
        for (candidate, group_id, group_name) in &candidates {
            let text = checkin_prompt(candidate, group_name, candidate.pending_group_ids.len() - 1);
            match self
                .messenger
                .send(candidate.telegram_id, &text, Some(keyboards::start_checkin(*group_id)))
                .await
            {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    warn!("Failed to send reminder to user {}: {}", candidate.telegram_id, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    // -- Ad-hoc reminders --

    /// Deliver `/remindme` and calendar reminders that are due. Each is
    /// attempted once.
    pub async fn run_due_reminders(&self) -> anyhow::Result<SweepReport> {
        let now = self.now();
        let due = self.db(move |db| db.due_reminders(now)).await?;
        let mut report = SweepReport::default();

        for reminder in due {
            let mut text = format!("⏰ Reminder\n\n{}", reminder.title);
            if let Some(description) = &reminder.description {
                text.push_str(&format!("\n\n{}", description));
            }
            match self.messenger.send(reminder.telegram_id, &text, None).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    warn!("Failed to deliver reminder {} to {}: {}", reminder.id, reminder.telegram_id, e);
                    report.failed += 1;
                }
            }
            let id = reminder.id;
            self.db(move |db| db.mark_reminder_sent(id)).await?;
        }
        Ok(report)
    }

    // -- Maintenance --

    pub async fn run_daily_maintenance(&self) -> anyhow::Result<()> {
        let today = self.today();
        let reset = self.db(move |db| db.reset_weekly_freezes(today)).await?;
        let purged = self
            .sessions
            .purge_stale(Duration::hours(SESSION_MAX_AGE_HOURS))
            .await?;
        let windows = self.limiter.purge_expired();
        info!(freezes_reset = reset, sessions_purged = purged, windows, "Daily maintenance done");
        Ok(())
    }

    /// Called about once a minute by the server. Runs the due-reminder
    /// check every time, the daily sweep once per configured hour and the
    /// maintenance once per day.
    pub async fn scheduler_tick(&self, scheduler: &mut Scheduler) {
        let now = self.now();
        let today = now.date_naive();

        if let Err(e) = self.run_due_reminders().await {
            warn!("Due reminder check failed: {:#}", e);
        }

        if scheduler.last_maintenance != Some(today) {
            scheduler.last_maintenance = Some(today);
            if let Err(e) = self.run_daily_maintenance().await {
                warn!("Daily maintenance failed: {:#}", e);
            }
        }

        let hour = now.hour() as u8;
        if !self.settings.reminder_hours.contains(&hour) || scheduler.last_sweep == Some((today, hour)) {
            return;
        }
        scheduler.last_sweep = Some((today, hour));
        match self.run_reminder_sweep(hour).await {
            Ok(report) => debug!(hour, sent = report.sent, failed = report.failed, "Reminder sweep done"),
            Err(e) => warn!("Reminder sweep for {}:00 failed: {:#}", hour, e),
        }
    }
}
