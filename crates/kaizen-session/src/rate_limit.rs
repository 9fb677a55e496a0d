use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use kaizen_types::BotError;

const WINDOW: Duration = Duration::from_secs(60 * 60);

/// Features with a per-user hourly budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Ask,
    Research,
    Voice,
    Scrape,
    Insights,
    Calendar,
    Checkin,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::Ask,
        Feature::Research,
        Feature::Voice,
        Feature::Scrape,
        Feature::Insights,
        Feature::Calendar,
        Feature::Checkin,
    ];

    pub fn limit(self) -> u32 {
        match self {
            Self::Ask => 20,
            Self::Research => 10,
            Self::Voice => 15,
            Self::Scrape => 30,
            Self::Insights => 5,
            Self::Calendar => 20,
            Self::Checkin => 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ask => "AI chat (/ask)",
            Self::Research => "Research (/dr)",
            Self::Voice => "Voice messages",
            Self::Scrape => "Web scraping",
            Self::Insights => "Insights",
            Self::Calendar => "Calendar events",
            Self::Checkin => "Check-ins",
        }
    }
}

struct Window {
    count: u32,
    resets_at: Instant,
}

/// Fixed-window counter: the first request opens a one hour window, and
/// requests past the feature's limit are refused until it closes.
pub struct RateLimiter {
    window: Duration,
    entries: Mutex<HashMap<(i64, Feature), Window>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_window(WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request, or refuse it with the time left in the window.
    pub fn check(&self, telegram_id: i64, feature: Feature) -> Result<(), BotError> {
        self.check_at(telegram_id, feature, Instant::now())
    }

    pub fn check_at(&self, telegram_id: i64, feature: Feature, now: Instant) -> Result<(), BotError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Rate limiter lock poisoned: {}", e))?;

        let entry = entries.entry((telegram_id, feature)).or_insert(Window {
            count: 0,
            resets_at: now + self.window,
        });
        if entry.resets_at <= now {
            entry.count = 0;
            entry.resets_at = now + self.window;
        }
        if entry.count >= feature.limit() {
            return Err(BotError::RateLimited {
                retry_after_secs: entry.resets_at.duration_since(now).as_secs().max(1),
            });
        }
        entry.count += 1;
        Ok(())
    }

    /// Requests left and time until the window resets (None when no window
    /// is open).
    pub fn status_at(&self, telegram_id: i64, feature: Feature, now: Instant) -> (u32, Option<Duration>) {
        let Ok(entries) = self.entries.lock() else {
            return (feature.limit(), None);
        };
        match entries.get(&(telegram_id, feature)) {
            Some(w) if w.resets_at > now => (
                feature.limit().saturating_sub(w.count),
                Some(w.resets_at.duration_since(now)),
            ),
            _ => (feature.limit(), None),
        }
    }

    pub fn status(&self, telegram_id: i64, feature: Feature) -> (u32, Option<Duration>) {
        self.status_at(telegram_id, feature, Instant::now())
    }

    /// Drop closed windows. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, w| w.resets_at > now);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_after_limit_until_window_closes() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for _ in 0..Feature::Insights.limit() {
            limiter.check_at(1, Feature::Insights, start).unwrap();
        }
        let err = limiter
            .check_at(1, Feature::Insights, start + Duration::from_secs(60))
            .unwrap_err();
        match err {
            BotError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 3540),
            other => panic!("unexpected {other:?}"),
        }

        // next window
        limiter
            .check_at(1, Feature::Insights, start + WINDOW)
            .unwrap();
        let (left, reset) = limiter.status_at(1, Feature::Insights, start + WINDOW);
        assert_eq!(left, Feature::Insights.limit() - 1);
        assert_eq!(reset, Some(WINDOW));
    }

    #[test]
    fn budgets_are_per_user_and_feature() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..Feature::Insights.limit() {
            limiter.check_at(1, Feature::Insights, now).unwrap();
        }
        assert!(limiter.check_at(1, Feature::Insights, now).is_err());
        assert!(limiter.check_at(2, Feature::Insights, now).is_ok());
        assert!(limiter.check_at(1, Feature::Ask, now).is_ok());
        assert_eq!(limiter.status_at(3, Feature::Ask, now), (20, None));
    }

    #[test]
    fn purge_drops_closed_windows() {
        let limiter = RateLimiter::with_window(Duration::ZERO);
        limiter.check(1, Feature::Scrape).unwrap();
        assert_eq!(limiter.purge_expired(), 1);
    }
}
