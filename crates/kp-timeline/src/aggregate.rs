//! Time-bucket aggregation for the midterm chart.
//!
//! Every booking is spread evenly over the week: it contributes
//! `weekly_hours / 7` on each day where the item, the booking and a selected
//! group membership are active and the item is not paused. A period's value
//! is the sum over its days, so a fully covered week yields the weekly hours
//! and a partial overlap yields the overlapping share.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use kp_core::{NO_GROUP_ID, NO_QUALIFICATION_KEY};
use kp_project::{DataItem, ItemKind, QualificationDef, RegulationDef, TimeDimension};
use serde::Serialize;

use crate::period::{partition, Period};

/// Staffing thresholds each period is judged against.
#[derive(Debug, Clone, PartialEq)]
pub struct Regulation {
    /// Children per staff member that is still acceptable ("1:11").
    pub required_ratio: f64,
    pub min_specialist_quota_percent: f64,
    /// Qualification keys counted as Fachkraft.
    pub specialist_keys: HashSet<String>,
}

impl Default for Regulation {
    fn default() -> Self {
        Self::from_settings(&RegulationDef::default(), &[])
    }
}

impl Regulation {
    pub fn from_settings(settings: &RegulationDef, qualifications: &[QualificationDef]) -> Self {
        Self {
            required_ratio: settings.required_ratio,
            min_specialist_quota_percent: settings.min_specialist_quota_percent,
            specialist_keys: qualifications
                .iter()
                .filter(|q| q.specialist)
                .map(|q| q.key.clone())
                .collect(),
        }
    }
}

/// BayKiBiG figures of one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRatio {
    pub total_booking_hours: f64,
    pub total_staff_hours: f64,
    pub fachkraft_hours: f64,
    /// Booking hours per staff hour (`1 : ratio`); `None` without staff.
    pub ratio: Option<f64>,
    pub fachkraft_quote_percent: f64,
    pub ratio_met: bool,
    pub quota_met: bool,
}

impl PeriodRatio {
    fn new(booking: f64, staff: f64, specialist: f64, regulation: &Regulation) -> Self {
        let ratio = (staff > 0.0).then(|| booking / staff);
        let quote = if staff > 0.0 { specialist / staff * 100.0 } else { 0.0 };
        let idle = booking == 0.0 && staff == 0.0;
        Self {
            total_booking_hours: booking,
            total_staff_hours: staff,
            fachkraft_hours: specialist,
            ratio,
            fachkraft_quote_percent: quote,
            ratio_met: idle || ratio.is_some_and(|r| r <= regulation.required_ratio),
            quota_met: idle || (staff > 0.0 && quote >= regulation.min_specialist_quota_percent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub categories: Vec<String>,
    #[serde(skip)]
    pub periods: Vec<Period>,
    pub bedarf: Vec<f64>,
    pub kapazitaet: Vec<f64>,
    pub baykibig_anstellungsschluessel: Vec<PeriodRatio>,
    pub max_kapazitaet: f64,
    pub max_anstellungsschluessel: f64,
    /// Not clamped at 100.
    pub max_fachkraftquote: f64,
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

struct Filter {
    groups: HashSet<String>,
    qualifications: HashSet<String>,
}

impl Filter {
    fn new(groups: &[String], qualifications: &[String]) -> Self {
        Self {
            groups: groups.iter().cloned().collect(),
            qualifications: qualifications.iter().cloned().collect(),
        }
    }

    /// Group memberships active on `day` intersect the selection. An item
    /// with no active membership counts as the sentinel group.
    fn group_selected(&self, item: &DataItem, day: NaiveDate) -> bool {
        let mut active = item
            .parseddata
            .group
            .iter()
            .filter(|g| within(day, g.start_date(), g.end_date()))
            .peekable();
        if active.peek().is_none() {
            return self.groups.contains(NO_GROUP_ID);
        }
        active.any(|g| self.groups.contains(g.key()))
    }

    fn qualification_selected(&self, item: &DataItem) -> bool {
        match item.kind {
            ItemKind::Demand => true,
            ItemKind::Capacity => self.qualifications.contains(qualification_key(item)),
        }
    }
}

fn qualification_key(item: &DataItem) -> &str {
    item.parseddata
        .qualification
        .as_deref()
        .filter(|q| !q.is_empty())
        .unwrap_or(NO_QUALIFICATION_KEY)
}

fn within(day: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    start.map_or(true, |s| s <= day) && end.map_or(true, |e| day <= e)
}

/// Hours `item` contributes on `day` before filtering by group.
fn daily_hours(item: &DataItem, day: NaiveDate) -> f64 {
    let data = &item.parseddata;
    if !within(day, data.start_date(), data.end_date()) || data.paused.covers(day) {
        return 0.0;
    }
    data.booking
        .iter()
        .filter(|b| within(day, b.start_date(), b.end_date()))
        .map(|b| b.weekly_hours() / 7.0)
        .sum()
}

/// Earliest and latest parseable date on any item, booking or group.
fn date_span<'a>(items: impl IntoIterator<Item = &'a DataItem>) -> Option<(NaiveDate, NaiveDate)> {
    let mut span: Option<(NaiveDate, NaiveDate)> = None;
    let mut extend = |date: Option<NaiveDate>| {
        if let Some(d) = date {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
                None => (d, d),
            });
        }
    };
    for item in items {
        let data = &item.parseddata;
        extend(data.start_date());
        extend(data.end_date());
        for booking in &data.booking {
            extend(booking.start_date());
            extend(booking.end_date());
        }
        for group in &data.group {
            extend(group.start_date());
            extend(group.end_date());
        }
    }
    span
}

/// Aggregate with the default regulation (1:11, 50 % Fachkraft).
///
/// The default regulation knows no specialist qualification keys, so
/// `fachkraft_quote_percent` and `max_fachkraftquote` stay 0 here. Use
/// [`aggregate_with`] and [`Regulation::from_settings`] for quota figures.
pub fn aggregate(
    items: &[DataItem],
    dimension: TimeDimension,
    selected_groups: &[String],
    selected_qualifications: &[String],
) -> ChartData {
    aggregate_with(
        items,
        dimension,
        selected_groups,
        selected_qualifications,
        &Regulation::default(),
    )
}

pub fn aggregate_with(
    items: &[DataItem],
    dimension: TimeDimension,
    selected_groups: &[String],
    selected_qualifications: &[String],
    regulation: &Regulation,
) -> ChartData {
    let Some((first, last)) = date_span(items) else {
        return ChartData::default();
    };
    let periods = partition(first, last, dimension);
    let filter = Filter::new(selected_groups, selected_qualifications);

    let mut chart = ChartData {
        categories: periods.iter().map(|p| p.label.clone()).collect(),
        ..ChartData::default()
    };

    for period in &periods {
        let mut booking = 0.0;
        let mut staff = 0.0;
        let mut specialist = 0.0;

        for item in items.iter().filter(|i| filter.qualification_selected(i)) {
            let is_specialist = item.kind == ItemKind::Capacity
                && regulation.specialist_keys.contains(qualification_key(item));
            for day in period.days() {
                let hours = daily_hours(item, day);
                if hours == 0.0 || !filter.group_selected(item, day) {
                    continue;
                }
                match item.kind {
                    ItemKind::Demand => booking += hours,
                    ItemKind::Capacity => {
                        staff += hours;
                        if is_specialist {
                            specialist += hours;
                        }
                    }
                }
            }
        }

        let ratio = PeriodRatio::new(booking, staff, specialist, regulation);
        chart.max_kapazitaet = chart.max_kapazitaet.max(staff);
        if let Some(r) = ratio.ratio {
            chart.max_anstellungsschluessel = chart.max_anstellungsschluessel.max(r);
        }
        chart.max_fachkraftquote = chart.max_fachkraftquote.max(ratio.fachkraft_quote_percent);
        chart.bedarf.push(booking);
        chart.kapazitaet.push(staff);
        chart.baykibig_anstellungsschluessel.push(ratio);
    }

    tracing::debug!(
        dimension = dimension.as_str(),
        items = items.len(),
        periods = periods.len(),
        "aggregated chart data"
    );

    chart.periods = periods;
    chart
}

/// Booked hours per weekday label on one reference day, for the weekly
/// chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayHours {
    pub day: String,
    pub demand_hours: f64,
    pub capacity_hours: f64,
}

const WEEKDAY_ORDER: [&str; 7] = ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"];

/// Hours per weekday of everything active on `reference`, filtered like
/// [`aggregate`]. Weekdays appear in calendar order; labels outside
/// `Mo`..`So` follow alphabetically.
pub fn weekly_profile(
    items: &[DataItem],
    reference: NaiveDate,
    selected_groups: &[String],
    selected_qualifications: &[String],
) -> Vec<WeekdayHours> {
    let filter = Filter::new(selected_groups, selected_qualifications);
    let mut totals: BTreeMap<(usize, String), (f64, f64)> = BTreeMap::new();

    for item in items {
        let data = &item.parseddata;
        if !within(reference, data.start_date(), data.end_date())
            || data.paused.covers(reference)
            || !filter.qualification_selected(item)
            || !filter.group_selected(item, reference)
        {
            continue;
        }
        for booking in data
            .booking
            .iter()
            .filter(|b| within(reference, b.start_date(), b.end_date()))
        {
            for day in &booking.times {
                let hours: f64 = day.segments.iter().map(|s| s.hours()).sum();
                let rank = WEEKDAY_ORDER
                    .iter()
                    .position(|d| *d == day.day)
                    .unwrap_or(WEEKDAY_ORDER.len());
                let slot = totals.entry((rank, day.day.clone())).or_default();
                match item.kind {
                    ItemKind::Demand => slot.0 += hours,
                    ItemKind::Capacity => slot.1 += hours,
                }
            }
        }
    }

    totals
        .into_iter()
        .map(|((_, day), (demand_hours, capacity_hours))| WeekdayHours {
            day,
            demand_hours,
            capacity_hours,
        })
        .collect()
}
