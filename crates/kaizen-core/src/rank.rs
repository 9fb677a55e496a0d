/// A martial-arts belt earned by holding a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub name: &'static str,
    pub emoji: &'static str,
    pub min_days: u32,
    pub title: &'static str,
}

/// A seasonal stage of the streak, shown next to the belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub name: &'static str,
    pub emoji: &'static str,
    pub min_days: u32,
    pub kanji: &'static str,
}

pub trait Threshold {
    fn min_days(&self) -> u32;
}

impl Threshold for Rank {
    fn min_days(&self) -> u32 {
        self.min_days
    }
}

impl Threshold for Season {
    fn min_days(&self) -> u32 {
        self.min_days
    }
}

pub static RANKS: [Rank; 7] = [
    Rank { name: "White Belt", emoji: "🤍", min_days: 0, title: "Beginner" },
    Rank { name: "Yellow Belt", emoji: "🟡", min_days: 7, title: "Novice" },
    Rank { name: "Orange Belt", emoji: "🟠", min_days: 21, title: "Apprentice" },
    Rank { name: "Green Belt", emoji: "🟢", min_days: 50, title: "Practitioner" },
    Rank { name: "Blue Belt", emoji: "🔵", min_days: 100, title: "Expert" },
    Rank { name: "Brown Belt", emoji: "🟤", min_days: 200, title: "Master" },
    Rank { name: "Black Belt", emoji: "⚫", min_days: 365, title: "Sensei" },
];

pub static SEASONS: [Season; 4] = [
    Season { name: "Spring", emoji: "🌸", min_days: 0, kanji: "春" },
    Season { name: "Summer", emoji: "🌿", min_days: 8, kanji: "夏" },
    Season { name: "Autumn", emoji: "🍂", min_days: 31, kanji: "秋" },
    Season { name: "Winter", emoji: "❄️", min_days: 90, kanji: "冬" },
];

/// Last entry whose threshold is `<= n`. Tables are ascending and start at
/// zero, so the first entry is the floor for any `n`.
pub fn highest_not_exceeding<T: Threshold>(table: &[T], n: u32) -> Option<&T> {
    table.iter().rev().find(|entry| entry.min_days() <= n)
}

pub fn rank_for_streak(streak: u32) -> &'static Rank {
    highest_not_exceeding(&RANKS, streak).unwrap_or(&RANKS[0])
}

pub fn season_for_streak(streak: u32) -> &'static Season {
    highest_not_exceeding(&SEASONS, streak).unwrap_or(&SEASONS[0])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextRank {
    pub rank: &'static Rank,
    pub days_until: u32,
}

/// The next belt above `streak`, or `None` at Black Belt.
pub fn next_rank(streak: u32) -> Option<NextRank> {
    RANKS.iter().find(|r| r.min_days > streak).map(|rank| NextRank {
        rank,
        days_until: rank.min_days - streak,
    })
}

/// `[████░░░░░░] 40%`. An empty total renders as 0%.
pub fn progress_bar(completed: u32, total: u32, length: usize) -> String {
    let pct = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    let filled = ((pct / 100.0) * length as f64).round().clamp(0.0, length as f64) as usize;
    format!(
        "[{}{}] {}%",
        "█".repeat(filled),
        "░".repeat(length - filled),
        pct.round() as u32
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_boundaries() {
        assert_eq!(rank_for_streak(0).name, "White Belt");
        assert_eq!(rank_for_streak(6).name, "White Belt");
        assert_eq!(rank_for_streak(7).name, "Yellow Belt");
        assert_eq!(rank_for_streak(364).name, "Brown Belt");
        assert_eq!(rank_for_streak(365).name, "Black Belt");
        assert_eq!(rank_for_streak(10_000).name, "Black Belt");
    }

    #[test]
    fn season_boundaries() {
        assert_eq!(season_for_streak(0).name, "Spring");
        assert_eq!(season_for_streak(7).name, "Spring");
        assert_eq!(season_for_streak(8).name, "Summer");
        assert_eq!(season_for_streak(31).name, "Autumn");
        assert_eq!(season_for_streak(89).name, "Autumn");
        assert_eq!(season_for_streak(90).name, "Winter");
    }

    #[test]
    fn next_rank_distance() {
        let next = next_rank(10).unwrap();
        assert_eq!(next.rank.name, "Orange Belt");
        assert_eq!(next.days_until, 11);
        assert_eq!(next_rank(0).unwrap().days_until, 7);
        assert!(next_rank(365).is_none());
    }

    #[test]
    fn lookup_on_empty_table() {
        let empty: [Rank; 0] = [];
        assert!(highest_not_exceeding(&empty, 5).is_none());
    }

    #[test]
    fn bar_rendering() {
        assert_eq!(progress_bar(5, 10, 10), "[█████░░░░░] 50%");
        assert_eq!(progress_bar(0, 0, 4), "[░░░░] 0%");
        assert_eq!(progress_bar(2, 3, 10), "[███████░░░] 67%");
        assert_eq!(progress_bar(9, 3, 5), "[█████] 300%");
    }
}
