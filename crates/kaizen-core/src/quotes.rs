use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteCategory {
    Perseverance,
    Beginning,
    Progress,
    Mastery,
    Failure,
    Consistency,
}

/// A Japanese proverb (kotowaza) with reading and gloss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub japanese: &'static str,
    pub romaji: &'static str,
    pub english: &'static str,
    pub meaning: &'static str,
    pub category: QuoteCategory,
}

macro_rules! quote {
    ($jp:expr, $romaji:expr, $en:expr, $meaning:expr, $cat:ident) => {
        Quote {
            japanese: $jp,
            romaji: $romaji,
            english: $en,
            meaning: $meaning,
            category: QuoteCategory::$cat,
        }
    };
}

pub static QUOTES: [Quote; 16] = [
    quote!("七転び八起き", "Nana korobi ya oki", "Fall seven times, stand up eight",
        "Resilience and never giving up, no matter how many times you fail.", Perseverance),
    quote!("石の上にも三年", "Ishi no ue ni mo san-nen", "Three years on a stone",
        "Perseverance and patience will eventually lead to success.", Perseverance),
    quote!("継続は力なり", "Keizoku wa chikara nari", "Continuation is power",
        "Persistence and consistency lead to strength and success.", Consistency),
    quote!("千里の道も一歩から", "Senri no michi mo ippo kara",
        "A journey of a thousand miles begins with a single step",
        "Every great achievement starts with a small beginning.", Beginning),
    quote!("始めは処女の如く後は脱兎の如し", "Hajime wa shojo no gotoku nochi wa datto no gotoshi",
        "Start like a maiden, end like a running rabbit",
        "Begin carefully, then act swiftly with gained momentum.", Beginning),
    quote!("塵も積もれば山となる", "Chiri mo tsumoreba yama to naru",
        "Even dust, when piled up, becomes a mountain",
        "Small efforts accumulate into great achievements.", Progress),
    quote!("雨垂れ石を穿つ", "Ame dare ishi wo ugatsu", "Dripping water pierces stone",
        "Persistent effort will overcome any obstacle.", Progress),
    quote!("急がば回れ", "Isogaba maware", "If you hurry, take the roundabout",
        "Sometimes the longer, more careful path is faster in the end.", Progress),
    quote!("習うより慣れろ", "Narau yori narero", "Practice makes perfect",
        "Experience and repetition are better teachers than instruction.", Mastery),
    quote!("芸は身を助く", "Gei wa mi wo tasuku", "Art helps the body",
        "Skills you develop will support you throughout life.", Mastery),
    quote!("名人は人を謗らず", "Meijin wa hito wo soshirazu", "A master does not criticize others",
        "True mastery comes with humility and understanding.", Mastery),
    quote!("失敗は成功のもと", "Shippai wa seikou no moto", "Failure is the foundation of success",
        "Mistakes and failures are learning opportunities.", Failure),
    quote!("負けるが勝ち", "Makeru ga kachi", "Losing is winning",
        "Accepting a small loss can lead to a greater victory.", Failure),
    quote!("一日一善", "Ichi-nichi ichi-zen", "One good deed a day",
        "Small daily actions create positive change.", Consistency),
    quote!("点滴石を穿つ", "Tenteki ishi wo ugatsu", "Constant dripping wears away stone",
        "Consistent small actions achieve great results over time.", Consistency),
    quote!("一石二鳥", "Isseki ni chou", "One stone, two birds",
        "Getting multiple benefits from one action.", Progress),
];

pub fn random_quote<R: Rng + ?Sized>(rng: &mut R) -> &'static Quote {
    QUOTES.choose(rng).unwrap_or(&QUOTES[0])
}

pub fn quote_by_category<R: Rng + ?Sized>(category: QuoteCategory, rng: &mut R) -> &'static Quote {
    let matching: Vec<&'static Quote> = QUOTES.iter().filter(|q| q.category == category).collect();
    matching.choose(rng).copied().unwrap_or(&QUOTES[0])
}

/// Beginning for 0–1, consistency for 2–6, progress for 7–29, mastery after.
pub fn quote_for_streak<R: Rng + ?Sized>(streak: u32, rng: &mut R) -> &'static Quote {
    let category = match streak {
        0 | 1 => QuoteCategory::Beginning,
        2..=6 => QuoteCategory::Consistency,
        7..=29 => QuoteCategory::Progress,
        _ => QuoteCategory::Mastery,
    };
    quote_by_category(category, rng)
}

pub fn quote_after_miss<R: Rng + ?Sized>(rng: &mut R) -> &'static Quote {
    quote_by_category(QuoteCategory::Failure, rng)
}

/// Same quote for everyone on a given day.
pub fn daily_quote(date: NaiveDate) -> &'static Quote {
    &QUOTES[date.ordinal() as usize % QUOTES.len()]
}

pub fn format_quote(quote: &Quote, include_japanese: bool) -> String {
    let mut out = String::new();
    if include_japanese {
        out.push_str(&format!("💬 \"{}\"\n   ({})\n\n", quote.japanese, quote.romaji));
    }
    out.push_str(&format!("\"{}\"\n\n💡 {}", quote.english, quote.meaning));
    out
}
