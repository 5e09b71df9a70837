use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

/// One week of the term, both ends inclusive. Intervals tile the observed
/// date range contiguously; every end is a Sunday except possibly the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekInterval {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// How a week counts toward marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WeekLabel {
    /// Contains a configured bonus date; displayed but never scored.
    Bonus,
    /// Sequential 1-based number among scored weeks.
    Scored(u32),
}

impl WeekLabel {
    pub fn text(&self) -> String {
        match self {
            WeekLabel::Bonus => "--".to_string(),
            WeekLabel::Scored(n) => format!("{n:>2}"),
        }
    }

    pub fn is_bonus(&self) -> bool {
        matches!(self, WeekLabel::Bonus)
    }
}

/// Split the span of observed dates into Sunday-ended weeks. Each interval
/// starts at the earliest date or the day after the previous end, and closes
/// on the first Sunday at or after its start; the final interval closes on
/// the latest observed date if no Sunday is reached first. No dates, no
/// weeks.
pub fn partition(dates: &BTreeSet<NaiveDate>) -> Vec<WeekInterval> {
    let (Some(&first), Some(&last)) = (dates.iter().next(), dates.iter().next_back()) else {
        return Vec::new();
    };

    let mut weeks = Vec::new();
    let mut start = first;
    loop {
        let sunday = next_sunday(start);
        if sunday >= last {
            weeks.push(WeekInterval { start, end: last });
            break;
        }
        weeks.push(WeekInterval { start, end: sunday });
        start = sunday + Duration::days(1);
    }
    weeks
}

fn next_sunday(date: NaiveDate) -> NaiveDate {
    let offset = (7 - date.weekday().num_days_from_sunday()) % 7;
    date + Duration::days(i64::from(offset))
}

/// Pair each interval with its label. A bonus date is consumed by the first
/// interval containing it and never reused; scored numbering advances only
/// over non-bonus weeks.
pub fn label(
    weeks: &[WeekInterval],
    bonus_dates: &BTreeSet<NaiveDate>,
) -> Vec<(WeekInterval, WeekLabel)> {
    let mut remaining = bonus_dates.clone();
    let mut next_number = 1;
    let mut labeled = Vec::with_capacity(weeks.len());

    for &week in weeks {
        match remaining.iter().copied().find(|&d| week.contains(d)) {
            Some(consumed) => {
                remaining.remove(&consumed);
                labeled.push((week, WeekLabel::Bonus));
            }
            None => {
                labeled.push((week, WeekLabel::Scored(next_number)));
                next_number += 1;
            }
        }
    }
    labeled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dates(days: &[(i32, u32, u32)]) -> BTreeSet<NaiveDate> {
        days.iter().map(|&(y, m, day)| d(y, m, day)).collect()
    }

    #[test]
    fn splits_wed_sun_wed_into_two_contiguous_weeks() {
        // 2024-01-03 Wed, 2024-01-07 Sun, 2024-01-10 Wed.
        let weeks = partition(&dates(&[(2024, 1, 3), (2024, 1, 7), (2024, 1, 10)]));
        assert_eq!(
            weeks,
            vec![
                WeekInterval { start: d(2024, 1, 3), end: d(2024, 1, 7) },
                WeekInterval { start: d(2024, 1, 8), end: d(2024, 1, 10) },
            ]
        );
    }

    #[test]
    fn tiles_the_span_even_when_no_sunday_was_observed() {
        let weeks = partition(&dates(&[(2024, 1, 3), (2024, 1, 10)]));
        assert_eq!(
            weeks,
            vec![
                WeekInterval { start: d(2024, 1, 3), end: d(2024, 1, 7) },
                WeekInterval { start: d(2024, 1, 8), end: d(2024, 1, 10) },
            ]
        );
    }

    #[test]
    fn covers_exactly_min_to_max_with_no_gaps_or_overlaps() {
        let input = dates(&[
            (2024, 1, 2),
            (2024, 1, 7),
            (2024, 1, 9),
            (2024, 1, 21),
            (2024, 2, 2),
        ]);
        let weeks = partition(&input);

        let first = *input.iter().next().unwrap();
        let last = *input.iter().next_back().unwrap();
        assert_eq!(weeks.first().unwrap().start, first);
        assert_eq!(weeks.last().unwrap().end, last);
        for pair in weeks.windows(2) {
            assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
        for week in &weeks[..weeks.len() - 1] {
            assert_eq!(week.end.weekday(), Weekday::Sun);
        }
    }

    #[test]
    fn no_dates_means_no_weeks() {
        assert!(partition(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn single_date_yields_a_single_day_interval() {
        let weeks = partition(&dates(&[(2024, 1, 10)]));
        assert_eq!(weeks, vec![WeekInterval { start: d(2024, 1, 10), end: d(2024, 1, 10) }]);
    }

    #[test]
    fn lone_sunday_yields_a_single_day_interval() {
        let weeks = partition(&dates(&[(2024, 1, 7)]));
        assert_eq!(weeks, vec![WeekInterval { start: d(2024, 1, 7), end: d(2024, 1, 7) }]);
    }

    #[test]
    fn bonus_weeks_are_skipped_in_numbering() {
        let weeks = partition(&dates(&[(2024, 1, 1), (2024, 1, 21)]));
        assert_eq!(weeks.len(), 3);

        let bonus = dates(&[(2024, 1, 14)]);
        let labeled = label(&weeks, &bonus);
        assert_eq!(labeled[0].1, WeekLabel::Scored(1));
        assert_eq!(labeled[1].1, WeekLabel::Bonus);
        assert_eq!(labeled[2].1, WeekLabel::Scored(2));
    }

    #[test]
    fn a_bonus_date_is_consumed_at_most_once() {
        let weeks = partition(&dates(&[(2024, 1, 1), (2024, 1, 21)]));
        // One marker, and a second marker in the same week as the first.
        let bonus = dates(&[(2024, 1, 8), (2024, 1, 10)]);
        let labeled = label(&weeks, &bonus);

        let bonus_count = labeled.iter().filter(|(_, l)| l.is_bonus()).count();
        assert_eq!(bonus_count, 1);
        assert_eq!(labeled[0].1, WeekLabel::Scored(1));
        assert_eq!(labeled[1].1, WeekLabel::Bonus);
        assert_eq!(labeled[2].1, WeekLabel::Scored(2));
    }

    #[test]
    fn unmatched_bonus_dates_are_ignored() {
        let weeks = partition(&dates(&[(2024, 1, 3), (2024, 1, 7)]));
        let labeled = label(&weeks, &dates(&[(2025, 6, 1)]));
        assert_eq!(labeled[0].1, WeekLabel::Scored(1));
    }

    #[test]
    fn label_text_is_two_characters_wide() {
        assert_eq!(WeekLabel::Bonus.text(), "--");
        assert_eq!(WeekLabel::Scored(3).text(), " 3");
        assert_eq!(WeekLabel::Scored(12).text(), "12");
    }
}
