use crate::rank::{RANKS, Rank, SEASONS, Season};

/// Streak lengths celebrated on their own. Values that are also belt
/// thresholds are left to the rank check.
pub const SPECIAL_DAYS: [u32; 9] = [1, 3, 10, 30, 60, 180, 270, 500, 1000];

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneKind {
    Rank,
    Season,
    Special,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub days: u32,
    pub title: String,
    pub message: String,
    pub animation: String,
}

fn crossed(previous: u32, current: u32, threshold: u32) -> bool {
    current >= threshold && previous < threshold
}

/// Milestone reached by going from `previous` to `current`, if any. Rank
/// crossings win over season crossings, which win over special days.
pub fn check_milestone(previous: u32, current: u32) -> Option<Milestone> {
    if let Some(rank) = RANKS.iter().find(|r| crossed(previous, current, r.min_days)) {
        return Some(rank_milestone(rank));
    }

    if let Some(season) = SEASONS.iter().find(|s| crossed(previous, current, s.min_days)) {
        return Some(season_milestone(season));
    }

    SPECIAL_DAYS
        .iter()
        .copied()
        .find(|&days| current == days && !RANKS.iter().any(|r| r.min_days == days))
        .map(special_milestone)
}

fn rank_milestone(rank: &Rank) -> Milestone {
    Milestone {
        kind: MilestoneKind::Rank,
        days: rank.min_days,
        title: format!("{} {} Achieved!", rank.emoji, rank.name),
        message: rank_message(rank),
        animation: format!(
            "✨ ✨ ✨ ✨ ✨\n  {e} {e} {e}\n✨ ✨ ✨ ✨ ✨",
            e = rank.emoji
        ),
    }
}

fn season_milestone(season: &Season) -> Milestone {
    let e = season.emoji;
    Milestone {
        kind: MilestoneKind::Season,
        days: season.min_days,
        title: format!("{} {} Season!", e, season.name),
        message: season_message(season),
        animation: format!(
            "{e} {e} {e} {e} {e}\n{e}           {e}\n{e}           {e}\n{e} {e} {e} {e} {e}"
        ),
    }
}

fn special_milestone(days: u32) -> Milestone {
    Milestone {
        kind: MilestoneKind::Special,
        days,
        title: format!("🔥 {}-Day Streak!", days),
        message: streak_message(days),
        animation: streak_animation(days).to_string(),
    }
}

fn rank_message(rank: &Rank) -> String {
    let e = rank.emoji;
    match rank.name {
        "White Belt" => format!(
            "Welcome to your journey! {e}\n\nThe white belt is a blank canvas, your potential waiting to be realized.\n\n\"A journey of a thousand miles begins with a single step.\""
        ),
        "Yellow Belt" => format!(
            "You've earned your Yellow Belt! {e}\n\n7 days of consistency shows commitment. The foundation is being built!\n\n\"塵も積もれば山となる\"\n(Even dust, when piled up, becomes a mountain)"
        ),
        "Orange Belt" => format!(
            "Orange Belt unlocked! {e}\n\n21 days! You're building real habits now.\n\n\"継続は力なり\"\n(Continuation is power)"
        ),
        "Green Belt" => format!(
            "Green Belt achieved! {e}\n\n50 days of dedication! You're now a true practitioner.\n\n\"習うより慣れろ\"\n(Practice makes perfect)"
        ),
        "Blue Belt" => format!(
            "Blue Belt mastery! {e}\n\n100 days! You've proven yourself an expert in consistency.\n\n\"石の上にも三年\"\n(Perseverance and patience lead to success)"
        ),
        "Brown Belt" => format!(
            "Brown Belt earned! {e}\n\n200 days of unwavering commitment. Mastery is close!\n\n\"名人は人を謗らず\"\n(A master does not criticize others)"
        ),
        "Black Belt" => format!(
            "BLACK BELT SENSEI! {e}\n\n365+ days! You are a master of Kaizen.\n\n\"七転び八起き\"\n(Fall seven times, stand up eight)\n\nYou are now a SENSEI 🥋"
        ),
        other => format!("Congratulations on achieving {}!", other),
    }
}

fn season_message(season: &Season) -> String {
    let (e, k) = (season.emoji, season.kanji);
    match season.name {
        "Spring" => format!(
            "{e} Spring has arrived! ({k})\n\nNew beginnings bloom. Like cherry blossoms, you're showing the beauty of fresh starts."
        ),
        "Summer" => format!(
            "{e} Welcome to Summer! ({k})\n\n8 days! Your growth is thriving like summer's lush greenery. Feel the momentum!"
        ),
        "Autumn" => format!(
            "{e} Autumn's Harvest! ({k})\n\n31 days of consistent effort! You're reaping what you've sown."
        ),
        "Winter" => format!(
            "{e} Winter's Resilience! ({k})\n\n90 days! Like winter's steadfast strength, you've proven unshakeable. Only the truly committed reach this season."
        ),
        other => format!("Welcome to {}!", other),
    }
}

fn streak_message(days: u32) -> String {
    match days {
        1 => "🎉 Your first check-in! 🎉\n\nEvery master was once a beginner.\n\nYou've taken the first step. That's what counts!".into(),
        3 => "🌟 3-day streak! 🌟\n\nThree days in a row! The habit is forming.\n\n\"千里の道も一歩から\"\n(A journey of a thousand miles begins with a single step)".into(),
        10 => "💫 10-day streak! 💫\n\nDouble digits! The compound effect is starting to work its magic!".into(),
        30 => "🌠 One month streak! 🌠\n\n30 consecutive days! This is no longer motivation.\nThis is DISCIPLINE.".into(),
        60 => "✨ 60-day streak! ✨\n\nTwo months of unwavering commitment! You're not just trying, you're DOING.".into(),
        180 => "🌟 Half-year milestone! 🌟\n\n180 days! Six months of pure dedication!".into(),
        270 => "💎 9-month diamond! 💎\n\n270 days of consistency! Most people quit by day 30. You're still here.".into(),
        500 => "👑 500-DAY LEGEND! 👑\n\nFIVE HUNDRED CONSECUTIVE DAYS!\n\nYou are a LIVING EXAMPLE of Kaizen!".into(),
        1000 => "🏆 1000 DAYS - IMMORTAL STATUS 🏆\n\nONE THOUSAND DAYS!\n\nYou ARE Kaizen personified. 改善".into(),
        n => format!("{}-day streak! Keep the fire burning! 🔥", n),
    }
}

fn streak_animation(days: u32) -> &'static str {
    if days >= 100 {
        "🔥 🔥 🔥 🔥 🔥\n🔥 🌟 🌟 🌟 🔥\n🔥 🌟 ⚡ 🌟 🔥\n🔥 🌟 🌟 🌟 🔥\n🔥 🔥 🔥 🔥 🔥"
    } else if days >= 30 {
        "✨ ✨ ✨ ✨ ✨\n  🔥 🔥 🔥\n  🔥 🔥 🔥\n✨ ✨ ✨ ✨ ✨"
    } else {
        "  ✨ 🔥 ✨\n  🔥 🔥 🔥\n  ✨ 🔥 ✨"
    }
}

/// Animation, title, divider, message.
pub fn format_celebration(milestone: &Milestone) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        milestone.animation, milestone.title, DIVIDER, milestone.message
    )
}
