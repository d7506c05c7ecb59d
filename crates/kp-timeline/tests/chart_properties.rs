use chrono::NaiveDate;
use kp_core::format_display;
use kp_project::{
    Booking, BookingDay, DataItem, GroupAssignment, ItemKind, Pause, TimeDimension, TimeSegment,
};
use kp_timeline::{aggregate, aggregate_with, extract_dates_of_interest, ChangeKind, Regulation};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

fn weekly(hours: u32) -> Booking {
    // spread over Monday to Friday so no segment runs past midnight
    let times = ["Mo", "Di", "Mi", "Do", "Fr"]
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let share = hours / 5 + u32::from((i as u32) < hours % 5);
            BookingDay {
                day: day.to_string(),
                segments: vec![TimeSegment::new("06:00", format!("{:02}:00", 6 + share))],
            }
        })
        .collect();
    Booking {
        startdate: None,
        enddate: None,
        times,
    }
}

fn item(id: &str, kind: ItemKind, hours: u32, start: &str, end: &str) -> DataItem {
    let mut item = DataItem::new(id, kind, id);
    item.parseddata.startdate = Some(start.to_string());
    item.parseddata.enddate = Some(end.to_string());
    item.parseddata.booking.push(weekly(hours));
    item
}

fn all() -> Vec<String> {
    vec!["0".to_string()]
}

#[test]
fn two_staff_in_one_week_sum_to_35() {
    let items = vec![
        item("m1", ItemKind::Capacity, 20, "03.03.2025", "09.03.2025"),
        item("m2", ItemKind::Capacity, 15, "03.03.2025", "09.03.2025"),
    ];
    let chart = aggregate(&items, TimeDimension::Week, &all(), &all());
    assert_eq!(chart.categories, vec!["2025-W10"]);
    assert!((chart.kapazitaet[0] - 35.0).abs() < EPS);
    assert!((chart.max_kapazitaet - 35.0).abs() < EPS);
    assert_eq!(chart.bedarf, vec![0.0]);
}

#[test]
fn partial_overlap_contributes_share_of_days() {
    // Friday 07.03. to Sunday 16.03.: 3 days in W10, 7 days in W11
    let items = vec![item("k1", ItemKind::Demand, 35, "07.03.2025", "16.03.2025")];
    let chart = aggregate(&items, TimeDimension::Week, &all(), &all());
    assert_eq!(chart.categories, vec!["2025-W10", "2025-W11"]);
    let total: f64 = chart.bedarf.iter().sum();
    assert!((total - 50.0).abs() < EPS);
    assert!((chart.bedarf[0] - total * 3.0 / 10.0).abs() < EPS);
}

#[test]
fn unselected_group_contributes_nothing() {
    let mut kid = item("k1", ItemKind::Demand, 30, "03.03.2025", "09.03.2025");
    kid.parseddata.group.push(GroupAssignment {
        id: Some("g1".to_string()),
        name: "Krippe".to_string(),
        start: None,
        end: None,
    });
    let items = vec![kid];

    let excluded = aggregate(&items, TimeDimension::Week, &["g2".to_string()], &all());
    assert_eq!(excluded.bedarf, vec![0.0]);

    let included = aggregate(&items, TimeDimension::Week, &["g1".to_string()], &all());
    assert!((included.bedarf[0] - 30.0).abs() < EPS);
}

#[test]
fn unselected_qualification_excludes_staff_only() {
    let mut staff = item("m1", ItemKind::Capacity, 20, "03.03.2025", "09.03.2025");
    staff.parseddata.qualification = Some("ek".to_string());
    let kid = item("k1", ItemKind::Demand, 10, "03.03.2025", "09.03.2025");
    let chart = aggregate(&[staff, kid], TimeDimension::Week, &all(), &["fk".to_string()]);
    assert_eq!(chart.kapazitaet, vec![0.0]);
    assert!((chart.bedarf[0] - 10.0).abs() < EPS);
}

#[test]
fn pause_without_parseable_bounds_is_ignored() {
    let base = item("m1", ItemKind::Capacity, 7, "03.03.2025", "09.03.2025");
    let expected = aggregate(&[base.clone()], TimeDimension::Week, &all(), &all()).kapazitaet;
    assert_eq!(expected, vec![7.0]);

    let malformed = [
        (None, None),
        (Some(""), Some("")),
        (Some("bald"), None),
        (None, Some("31.03.2025")),
    ];
    for (start, end) in malformed {
        let mut paused = base.clone();
        paused.parseddata.paused = Pause {
            enabled: true,
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        };
        let chart = aggregate(&[paused], TimeDimension::Week, &all(), &all());
        assert_eq!(chart.kapazitaet, expected, "bounds {start:?}..{end:?}");
    }

    let mut open_ended = base;
    open_ended.parseddata.paused = Pause {
        enabled: true,
        start: Some("2025-03-06".to_string()),
        end: Some("".to_string()),
    };
    let chart = aggregate(&[open_ended], TimeDimension::Week, &all(), &all());
    // Monday to Wednesday remain
    assert!((chart.kapazitaet[0] - 3.0).abs() < EPS);
}

#[test]
fn default_regulation_has_no_specialists() {
    let mut staff = item("m1", ItemKind::Capacity, 20, "03.03.2025", "09.03.2025");
    staff.parseddata.qualification = Some("fk".to_string());
    let items = vec![staff];
    let quals = vec!["fk".to_string()];

    let chart = aggregate(&items, TimeDimension::Week, &all(), &quals);
    assert_eq!(chart.max_fachkraftquote, 0.0);

    let mut regulation = Regulation::default();
    regulation.specialist_keys.insert("fk".to_string());
    let chart = aggregate_with(&items, TimeDimension::Week, &all(), &quals, &regulation);
    assert!((chart.max_fachkraftquote - 100.0).abs() < EPS);
}

#[test]
fn zero_staff_gives_none_ratio() {
    let items = vec![item("k1", ItemKind::Demand, 30, "03.03.2025", "09.03.2025")];
    let chart = aggregate(&items, TimeDimension::Week, &all(), &all());
    let period = &chart.baykibig_anstellungsschluessel[0];
    assert_eq!(period.ratio, None);
    assert_eq!(period.fachkraft_quote_percent, 0.0);
    assert!(!period.ratio_met);
    assert!(!chart.max_anstellungsschluessel.is_nan());
    assert_eq!(chart.max_anstellungsschluessel, 0.0);
}

#[test]
fn specialist_quota_and_ratio_per_period() {
    let mut fk = item("m1", ItemKind::Capacity, 20, "03.03.2025", "09.03.2025");
    fk.parseddata.qualification = Some("fk".to_string());
    let mut ek = item("m2", ItemKind::Capacity, 20, "03.03.2025", "09.03.2025");
    ek.parseddata.qualification = Some("ek".to_string());
    let kid = item("k1", ItemKind::Demand, 40, "03.03.2025", "09.03.2025");

    let mut regulation = Regulation::default();
    regulation.specialist_keys.insert("fk".to_string());
    let quals = vec!["fk".to_string(), "ek".to_string()];
    let chart = aggregate_with(&[fk, ek, kid], TimeDimension::Month, &all(), &quals, &regulation);

    assert_eq!(chart.categories, vec!["2025-03"]);
    let period = &chart.baykibig_anstellungsschluessel[0];
    assert!((period.total_staff_hours - 40.0).abs() < EPS);
    assert!((period.fachkraft_hours - 20.0).abs() < EPS);
    assert!((period.fachkraft_quote_percent - 50.0).abs() < EPS);
    assert_eq!(period.ratio, Some(1.0));
    assert!(period.ratio_met && period.quota_met);
    assert!((chart.max_fachkraftquote - 50.0).abs() < EPS);
}

#[test]
fn empty_input_is_empty_chart() {
    let chart = aggregate(&[], TimeDimension::Quarter, &all(), &all());
    assert!(chart.is_empty());
    assert!(chart.bedarf.is_empty());
    assert_eq!(chart.max_kapazitaet, 0.0);
}

#[test]
fn chart_serializes_with_camel_case_keys() {
    let items = vec![item("k1", ItemKind::Demand, 30, "03.03.2025", "09.03.2025")];
    let chart = aggregate(&items, TimeDimension::Week, &all(), &all());
    let json = serde_json::to_value(&chart).unwrap();
    assert!(json.get("baykibigAnstellungsschluessel").is_some());
    assert!(json.get("maxFachkraftquote").is_some());
    assert!(json.get("periods").is_none());
    assert!(json["baykibigAnstellungsschluessel"][0].get("totalBookingHours").is_some());
}

#[test]
fn dates_of_interest_for_enrolment() {
    let kid = item("Mia", ItemKind::Demand, 30, "01.03.2025", "10.03.2025");
    let reference = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let dates = extract_dates_of_interest([&kid], reference);
    assert_eq!(dates[0].iso(), "2025-03-01");
    assert_eq!(dates[0].changes[0].kind, ChangeKind::New);
    assert_eq!(dates[1].iso(), "2025-03-11");
    assert_eq!(dates[1].changes[0].kind, ChangeKind::Departure);
}

proptest! {
    #[test]
    fn weekly_buckets_conserve_hours(
        offset in 0i64..300,
        length in 1i64..120,
        hours in 1u32..36,
    ) {
        let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let start = base + chrono::Duration::days(offset);
        let end = start + chrono::Duration::days(length - 1);
        let items = vec![item(
            "k1",
            ItemKind::Demand,
            hours,
            &format_display(start),
            &format_display(end),
        )];

        let expected = f64::from(hours) / 7.0 * length as f64;
        for dimension in [TimeDimension::Week, TimeDimension::Month, TimeDimension::Quarter] {
            let chart = aggregate(&items, dimension, &all(), &all());
            let total: f64 = chart.bedarf.iter().sum();
            prop_assert!((total - expected).abs() < 1e-6);
            prop_assert_eq!(chart.categories.len(), chart.bedarf.len());
        }
    }
}
