//! The bundled demo plan loads, validates and resolves.

use std::path::PathBuf;

use chrono::NaiveDate;
use kp_app::{list_scenarios, load_session, save_session, validate_session};
use kp_core::ScenarioId;
use kp_project::TimeDimension;
use kp_timeline::ChangeKind;

fn demo_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // go to crates
    path.pop(); // go to repo root
    path.push("demos");
    path.push("plans");
    path.push("kita_sonnenschein.yaml");
    path
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn demo_plan_loads_and_lists_in_tree_order() {
    let session = load_session(&demo_path()).expect("demo plan should load");
    validate_session(&session).expect("demo plan should validate");

    let rows = list_scenarios(&session);
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["ist", "krippe2", "krippe2-spaet"]);
    assert_eq!(rows.iter().map(|r| r.depth).collect::<Vec<_>>(), [0, 1, 2]);
    assert!(rows[1].selected);
    assert_eq!(rows[0].own_deltas, 4);
}

#[test]
fn demo_overlay_resolves_per_scenario() {
    let mut session = load_session(&demo_path()).unwrap();

    let ist = session.effective_items(&"ist".into()).unwrap();
    assert_eq!(ist.len(), 4);

    let krippe2 = session.effective_view(&"krippe2".into()).unwrap();
    assert!(krippe2.get(&"k2".into()).is_none());
    assert!(krippe2.get(&"k3".into()).is_some());
    assert_eq!(krippe2.items.len(), 4);

    let late = session
        .effective_item(&"krippe2-spaet".into(), &"k3".into())
        .unwrap()
        .unwrap();
    assert_eq!(late.parseddata.startdate.as_deref(), Some("01.01.2026"));

    // catalogs are inherited from the root
    let groups = session.effective_groups(&"krippe2-spaet".into()).unwrap();
    assert_eq!(groups.len(), 2);
}

#[test]
fn demo_dates_of_interest_follow_the_overlay() {
    let mut session = load_session(&demo_path()).unwrap();
    let reference = date(2025, 6, 1);

    let ist = session.dates_of_interest(&"ist".into(), reference).unwrap().to_vec();
    assert!(ist.iter().any(|d| {
        d.date == date(2026, 8, 1) && d.changes.iter().any(|c| c.kind == ChangeKind::Departure)
    }));

    let late = session
        .dates_of_interest(&"krippe2-spaet".into(), reference)
        .unwrap()
        .to_vec();
    assert!(late.iter().all(|d| d.date > reference));
    assert!(late.windows(2).all(|w| w[0].date < w[1].date));
    let lea_new: Vec<NaiveDate> = late
        .iter()
        .filter(|d| d.changes.iter().any(|c| c.kind == ChangeKind::New && c.name == "Lea"))
        .map(|d| d.date)
        .collect();
    assert_eq!(lea_new, [date(2026, 1, 1)]);
    // the base's departure of Noah was tombstoned away
    assert!(!late.iter().any(|d| d.date == date(2026, 8, 1)));
}

#[test]
fn demo_chart_has_data_and_caches() {
    let mut session = load_session(&demo_path()).unwrap();
    let scenario = ScenarioId::from("krippe2");
    let all_groups = vec!["0".to_string(), "g1".to_string(), "g2".to_string()];
    let all_quals = vec!["0".to_string(), "fk".to_string(), "ek".to_string()];

    let chart = session
        .chart(&scenario, TimeDimension::Quarter, &all_groups, &all_quals)
        .unwrap()
        .clone();
    assert!(!chart.is_empty());
    assert_eq!(chart.categories.len(), chart.bedarf.len());
    assert_eq!(chart.categories.len(), chart.kapazitaet.len());

    let before = session.cache_stats();
    session
        .chart(&scenario, TimeDimension::Quarter, &all_groups, &all_quals)
        .unwrap();
    assert_eq!(session.cache_stats().hits, before.hits + 1);
}

#[test]
fn demo_plan_survives_save_and_reload() {
    let session = load_session(&demo_path()).unwrap();
    let out = std::env::temp_dir().join("kp_demo_roundtrip.json");
    save_session(&out, &session).unwrap();

    let reloaded = load_session(&out).unwrap();
    assert_eq!(reloaded.to_plan(), session.to_plan());
    let _ = std::fs::remove_file(out);
}
