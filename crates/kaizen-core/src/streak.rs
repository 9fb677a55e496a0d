use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use kaizen_types::models::CheckinRecord;

/// Collapse check-ins to one entry per day. A day counts as completed if any
/// of its records is completed (a user in several groups checks in once per
/// group).
pub fn completion_by_day(records: &[CheckinRecord]) -> BTreeMap<NaiveDate, bool> {
    let mut days = BTreeMap::new();
    for r in records {
        let done = days.entry(r.date).or_insert(false);
        *done |= r.completed;
    }
    days
}

/// Consecutive completed days ending at `today`. Zero if today has no
/// completed check-in. Records dated after `today` are ignored.
pub fn calculate_streak(records: &[CheckinRecord], today: NaiveDate) -> u32 {
    calculate_streak_with_freeze(records, today, &BTreeSet::new())
}

/// Like [`calculate_streak`], but a `frozen` day without a completed record
/// is skipped over instead of breaking the run. Frozen days themselves do
/// not add to the count.
pub fn calculate_streak_with_freeze(
    records: &[CheckinRecord],
    today: NaiveDate,
    frozen: &BTreeSet<NaiveDate>,
) -> u32 {
    let days = completion_by_day(records);
    let mut streak = 0;
    let mut cursor = today;

    loop {
        match days.get(&cursor) {
            Some(true) => streak += 1,
            _ if frozen.contains(&cursor) => {}
            _ => break,
        }
        cursor = match cursor.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }

    streak
}

/// The streak as it stands before a submission, given the history read
/// before writing. If today is already completed (a resubmission) this is
/// the current streak; otherwise it is the run ending yesterday, which a
/// completed check-in today would extend.
pub fn streak_before_checkin(
    records: &[CheckinRecord],
    today: NaiveDate,
    frozen: &BTreeSet<NaiveDate>,
) -> u32 {
    if records.iter().any(|r| r.date == today && r.completed) {
        return calculate_streak_with_freeze(records, today, frozen);
    }
    run_ending_yesterday(records, today, frozen)
}

fn run_ending_yesterday(records: &[CheckinRecord], today: NaiveDate, frozen: &BTreeSet<NaiveDate>) -> u32 {
    match today.pred_opt() {
        Some(yesterday) => calculate_streak_with_freeze(records, yesterday, frozen),
        None => 0,
    }
}

/// Streak shown on cards and leaderboards. A user who has not checked in yet
/// today still holds yesterday's run until the day is over.
pub fn active_streak(records: &[CheckinRecord], today: NaiveDate, frozen: &BTreeSet<NaiveDate>) -> u32 {
    if records.iter().any(|r| r.date == today) {
        calculate_streak_with_freeze(records, today, frozen)
    } else {
        run_ending_yesterday(records, today, frozen)
    }
}

/// Longest run of consecutive completed days anywhere in the history.
pub fn longest_streak(records: &[CheckinRecord]) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut last: Option<NaiveDate> = None;

    for (date, completed) in completion_by_day(records) {
        if !completed {
            run = 0;
            last = None;
            continue;
        }
        run = match last {
            Some(prev) if prev.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        last = Some(date);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
    }

    fn frozen(days: &[u32]) -> BTreeSet<NaiveDate> {
        days.iter().map(|&n| day(n)).collect()
    }

    fn rec(n: u32, completed: bool) -> CheckinRecord {
        CheckinRecord {
            date: day(n),
            completed,
        }
    }

    #[test]
    fn empty_history_is_zero() {
        assert_eq!(calculate_streak(&[], day(10)), 0);
    }

    #[test]
    fn gap_breaks_the_run() {
        let records = [rec(10, true), rec(9, true), rec(7, true)];
        assert_eq!(calculate_streak(&records, day(10)), 2);
    }

    #[test]
    fn today_missing_or_incomplete_is_zero() {
        assert_eq!(calculate_streak(&[rec(9, true), rec(8, true)], day(10)), 0);
        assert_eq!(calculate_streak(&[rec(10, false), rec(9, true)], day(10)), 0);
    }

    #[test]
    fn unsorted_input_is_fine() {
        let records = [rec(8, true), rec(10, true), rec(9, true)];
        assert_eq!(calculate_streak(&records, day(10)), 3);
    }

    #[test]
    fn duplicate_days_collapse() {
        // two groups on the same day, one partial, one complete
        let records = [rec(10, false), rec(10, true), rec(9, true), rec(9, true)];
        assert_eq!(calculate_streak(&records, day(10)), 2);
    }

    #[test]
    fn incomplete_day_breaks_the_run() {
        let records = [rec(10, true), rec(9, false), rec(8, true)];
        assert_eq!(calculate_streak(&records, day(10)), 1);
    }

    #[test]
    fn future_records_are_ignored() {
        let records = [rec(11, true), rec(10, true)];
        assert_eq!(calculate_streak(&records, day(10)), 1);
    }

    #[test]
    fn freeze_bridges_a_missed_day() {
        let records = [rec(10, true), rec(8, true), rec(7, true)];
        assert_eq!(calculate_streak(&records, day(10)), 1);
        assert_eq!(calculate_streak_with_freeze(&records, day(10), &frozen(&[9])), 3);
    }

    #[test]
    fn freeze_on_today_holds_the_run() {
        let records = [rec(9, true), rec(8, true)];
        assert_eq!(calculate_streak_with_freeze(&records, day(10), &frozen(&[10])), 2);
        // and still holds it the next morning
        assert_eq!(active_streak(&records, day(11), &frozen(&[10])), 2);
    }

    #[test]
    fn every_frozen_day_keeps_bridging() {
        // 20 back to 5, with 17 and 10 missed and both frozen
        let records: Vec<_> = (5..=20).filter(|&n| n != 17 && n != 10).map(|n| rec(n, true)).collect();
        assert_eq!(calculate_streak(&records, day(20)), 3);
        assert_eq!(calculate_streak_with_freeze(&records, day(20), &frozen(&[17])), 9);
        assert_eq!(calculate_streak_with_freeze(&records, day(20), &frozen(&[10, 17])), 14);
    }

    #[test]
    fn previous_streak_is_the_run_ending_yesterday() {
        let mut records: Vec<_> = (4..=9).map(|n| rec(n, true)).collect();
        assert_eq!(streak_before_checkin(&records, day(10), &BTreeSet::new()), 6);

        // a partial earlier today does not change it
        records.push(rec(10, false));
        assert_eq!(streak_before_checkin(&records, day(10), &BTreeSet::new()), 6);
    }

    #[test]
    fn previous_streak_on_resubmission_is_current() {
        let records: Vec<_> = (4..=10).map(|n| rec(n, true)).collect();
        assert_eq!(streak_before_checkin(&records, day(10), &BTreeSet::new()), 7);
    }

    #[test]
    fn active_streak_keeps_yesterday_until_checked_in() {
        let records = [rec(9, true), rec(8, true)];
        assert_eq!(active_streak(&records, day(10), &BTreeSet::new()), 2);

        let missed_today = [rec(10, false), rec(9, true), rec(8, true)];
        assert_eq!(active_streak(&missed_today, day(10), &BTreeSet::new()), 0);
    }

    #[test]
    fn longest_run_in_history() {
        let records = [
            rec(1, true),
            rec(2, true),
            rec(3, true),
            rec(5, true),
            rec(6, false),
            rec(7, true),
            rec(8, true),
        ];
        assert_eq!(longest_streak(&records), 3);
        assert_eq!(longest_streak(&[]), 0);
    }
}
