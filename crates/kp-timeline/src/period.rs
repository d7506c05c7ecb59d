//! Calendar periods for each time dimension.

use chrono::{Datelike, Days, Months, NaiveDate};
use kp_project::TimeDimension;
use serde::Serialize;

/// One chart category: inclusive `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// First day of the period containing `day`. Weeks start on Monday.
pub fn period_start(day: NaiveDate, dimension: TimeDimension) -> NaiveDate {
    match dimension {
        TimeDimension::Week => {
            let back = u64::from(day.weekday().num_days_from_monday());
            day.checked_sub_days(Days::new(back)).unwrap_or(day)
        }
        TimeDimension::Month => NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap_or(day),
        TimeDimension::Quarter => {
            let month = (day.month0() / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(day.year(), month, 1).unwrap_or(day)
        }
        TimeDimension::Year => NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day),
    }
}

fn next_period_start(start: NaiveDate, dimension: TimeDimension) -> Option<NaiveDate> {
    match dimension {
        TimeDimension::Week => start.checked_add_days(Days::new(7)),
        TimeDimension::Month => start.checked_add_months(Months::new(1)),
        TimeDimension::Quarter => start.checked_add_months(Months::new(3)),
        TimeDimension::Year => start.checked_add_months(Months::new(12)),
    }
}

/// Category label: `2025-W09`, `2025-03`, `2025-Q1` or `2025`.
///
/// Week labels use the ISO week-numbering year, so the week of 30.12.2024
/// is `2025-W01`.
pub fn period_label(start: NaiveDate, dimension: TimeDimension) -> String {
    match dimension {
        TimeDimension::Week => {
            let week = start.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        TimeDimension::Month => format!("{:04}-{:02}", start.year(), start.month()),
        TimeDimension::Quarter => format!("{}-Q{}", start.year(), start.month0() / 3 + 1),
        TimeDimension::Year => format!("{}", start.year()),
    }
}

/// Consecutive periods covering `first..=last`, in chronological order.
/// The first and last period extend to their calendar bounds.
pub fn partition(first: NaiveDate, last: NaiveDate, dimension: TimeDimension) -> Vec<Period> {
    let mut periods = Vec::new();
    if first > last {
        return periods;
    }

    let mut start = period_start(first, dimension);
    while start <= last {
        let next = next_period_start(start, dimension);
        let end = next.and_then(|n| n.pred_opt()).unwrap_or(NaiveDate::MAX);
        periods.push(Period {
            label: period_label(start, dimension),
            start,
            end,
        });
        match next {
            Some(n) => start = n,
            None => break,
        }
    }
    periods
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-03-05 is a Wednesday
        assert_eq!(period_start(date(2025, 3, 5), TimeDimension::Week), date(2025, 3, 3));
        assert_eq!(period_start(date(2025, 3, 3), TimeDimension::Week), date(2025, 3, 3));
        assert_eq!(period_start(date(2025, 3, 9), TimeDimension::Week), date(2025, 3, 3));
    }

    #[test]
    fn labels() {
        assert_eq!(period_label(date(2025, 2, 24), TimeDimension::Week), "2025-W09");
        assert_eq!(period_label(date(2024, 12, 30), TimeDimension::Week), "2025-W01");
        assert_eq!(period_label(date(2025, 3, 1), TimeDimension::Month), "2025-03");
        assert_eq!(period_label(date(2025, 10, 1), TimeDimension::Quarter), "2025-Q4");
        assert_eq!(period_label(date(2025, 1, 1), TimeDimension::Year), "2025");
    }

    #[test]
    fn months_cover_span_contiguously() {
        let periods = partition(date(2025, 1, 15), date(2025, 4, 2), TimeDimension::Month);
        let labels: Vec<&str> = periods.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["2025-01", "2025-02", "2025-03", "2025-04"]);
        assert_eq!(periods[1].end, date(2025, 2, 28));
        for pair in periods.windows(2) {
            assert_eq!(pair[0].end.succ_opt(), Some(pair[1].start));
        }
    }

    #[test]
    fn quarters_and_years() {
        let q = partition(date(2024, 11, 1), date(2025, 2, 1), TimeDimension::Quarter);
        let labels: Vec<_> = q.iter().map(|p| p.label.clone()).collect();
        assert_eq!(labels, vec!["2024-Q4", "2025-Q1"]);
        assert_eq!(q[0].len_days(), 92);
        let y = partition(date(2024, 6, 1), date(2024, 6, 1), TimeDimension::Year);
        assert_eq!(y.len(), 1);
        assert_eq!(y[0].len_days(), 366);
    }

    #[test]
    fn inverted_span_is_empty() {
        assert!(partition(date(2025, 2, 1), date(2025, 1, 1), TimeDimension::Week).is_empty());
    }

    #[test]
    fn week_has_seven_days() {
        let weeks = partition(date(2025, 3, 1), date(2025, 3, 10), TimeDimension::Week);
        assert_eq!(weeks.len(), 3);
        assert!(weeks.iter().all(|w| w.days().count() == 7));
        assert!(weeks[1].contains(date(2025, 3, 5)));
    }
}
