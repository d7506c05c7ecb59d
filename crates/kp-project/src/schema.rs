//! Plan file schema definitions.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use kp_core::{opt_display_date, opt_iso_date, ItemId, ScenarioId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCENARIO_NAME: &str = "Neues Szenario";
pub const DEFAULT_RATING: u8 = 50;
pub const MANUAL_ENTRY_SOURCE: &str = "manual entry";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanFile {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub settings: PlannerSettings,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_scenario_id: Option<ScenarioId>,
    /// Private data store of each scenario, keyed by scenario id.
    #[serde(default)]
    pub stores: BTreeMap<ScenarioId, ScenarioStoreDef>,
}

impl PlanFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: name.into(),
            settings: PlannerSettings::default(),
            scenarios: Vec::new(),
            selected_scenario_id: None,
            stores: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PlannerSettings {
    #[serde(default)]
    pub regulation: RegulationDef,
    #[serde(default)]
    pub default_dimension: TimeDimension,
}

/// BayKiBiG thresholds used to judge each chart period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegulationDef {
    /// Required staffing ratio denominator ("1:11 oder besser").
    #[serde(default = "default_required_ratio")]
    pub required_ratio: f64,
    /// Minimum share of specialist ("Fachkraft") hours in percent.
    #[serde(default = "default_min_specialist_quota")]
    pub min_specialist_quota_percent: f64,
}

impl Default for RegulationDef {
    fn default() -> Self {
        Self {
            required_ratio: default_required_ratio(),
            min_specialist_quota_percent: default_min_specialist_quota(),
        }
    }
}

fn default_required_ratio() -> f64 {
    11.0
}

fn default_min_specialist_quota() -> f64 {
    50.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeDimension {
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

impl TimeDimension {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeDimension::Week => "week",
            TimeDimension::Month => "month",
            TimeDimension::Quarter => "quarter",
            TimeDimension::Year => "year",
        }
    }
}

impl std::str::FromStr for TimeDimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" | "woche" | "wochen" => Ok(TimeDimension::Week),
            "month" | "monat" | "monate" => Ok(TimeDimension::Month),
            "quarter" | "quartal" => Ok(TimeDimension::Quarter),
            "year" | "jahr" | "jahre" => Ok(TimeDimension::Year),
            other => Err(format!("unknown time dimension '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default = "default_rating")]
    pub confidence: u8,
    #[serde(default = "default_rating")]
    pub likelihood: u8,
    #[serde(default = "default_rating")]
    pub desirability: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_scenario_id: Option<ScenarioId>,
}

fn default_rating() -> u8 {
    DEFAULT_RATING
}

impl Scenario {
    pub fn new(id: impl Into<ScenarioId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            remark: String::new(),
            confidence: DEFAULT_RATING,
            likelihood: DEFAULT_RATING,
            desirability: DEFAULT_RATING,
            base_scenario_id: None,
        }
    }

    pub fn based_on(mut self, base: impl Into<ScenarioId>) -> Self {
        self.base_scenario_id = Some(base.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.base_scenario_id.is_none()
    }
}

/// Payload for adding a scenario; absent fields take the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDraft {
    #[serde(default)]
    pub id: Option<ScenarioId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub confidence: Option<i64>,
    #[serde(default)]
    pub likelihood: Option<i64>,
    #[serde(default)]
    pub desirability: Option<i64>,
    #[serde(default)]
    pub base_scenario_id: Option<ScenarioId>,
}

impl ScenarioDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn based_on(mut self, base: impl Into<ScenarioId>) -> Self {
        self.base_scenario_id = Some(base.into());
        self
    }

    pub fn into_scenario(self) -> Scenario {
        Scenario {
            id: self.id.unwrap_or_else(ScenarioId::generate),
            name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCENARIO_NAME.to_string()),
            remark: self.remark.unwrap_or_default(),
            confidence: self.confidence.map_or(DEFAULT_RATING, clamp_rating),
            likelihood: self.likelihood.map_or(DEFAULT_RATING, clamp_rating),
            desirability: self.desirability.map_or(DEFAULT_RATING, clamp_rating),
            base_scenario_id: self.base_scenario_id,
        }
    }
}

/// Partial update of a scenario record.
///
/// `base_scenario_id` uses a nested option: `Some(None)` detaches the
/// scenario into a root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScenarioPatch {
    pub name: Option<String>,
    pub remark: Option<String>,
    pub confidence: Option<i64>,
    pub likelihood: Option<i64>,
    pub desirability: Option<i64>,
    pub base_scenario_id: Option<Option<ScenarioId>>,
}

impl ScenarioPatch {
    pub fn apply_to(&self, scenario: &mut Scenario) {
        if let Some(name) = &self.name {
            scenario.name = name.clone();
        }
        if let Some(remark) = &self.remark {
            scenario.remark = remark.clone();
        }
        if let Some(v) = self.confidence {
            scenario.confidence = clamp_rating(v);
        }
        if let Some(v) = self.likelihood {
            scenario.likelihood = clamp_rating(v);
        }
        if let Some(v) = self.desirability {
            scenario.desirability = clamp_rating(v);
        }
        if let Some(base) = &self.base_scenario_id {
            scenario.base_scenario_id = base.clone();
        }
    }
}

pub fn clamp_rating(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// Everything a scenario owns privately: its deltas and its catalogs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScenarioStoreDef {
    #[serde(default)]
    pub deltas: Vec<ItemDelta>,
    #[serde(default)]
    pub groups: Vec<GroupDef>,
    #[serde(default)]
    pub qualifications: Vec<QualificationDef>,
}

/// One change a scenario applies on top of its base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ItemDelta {
    /// Insert or overwrite an item.
    Add { item: DataItem },
    /// Overwrite an item that is live at this point of the chain.
    Edit { item: DataItem },
    /// Remove an item, whichever ancestor contributed it.
    Tombstone { id: ItemId },
}

impl ItemDelta {
    pub fn item_id(&self) -> &ItemId {
        match self {
            ItemDelta::Add { item } | ItemDelta::Edit { item } => &item.id,
            ItemDelta::Tombstone { id } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Demand,
    Capacity,
}

impl ItemKind {
    /// Label used in change tags ("Kind" for children, "Mitarbeiter" for staff).
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Demand => "Kind",
            ItemKind::Capacity => "Mitarbeiter",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: String,
    /// Identifier in the originating system (Adebis), used to link bookings.
    #[serde(default, rename = "externalId", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub parseddata: ParsedData,
}

impl DataItem {
    pub fn new(id: impl Into<ItemId>, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            source: MANUAL_ENTRY_SOURCE.to_string(),
            external_id: None,
            parseddata: ParsedData::default(),
        }
    }

    pub fn is_manual_entry(&self) -> bool {
        self.source == MANUAL_ENTRY_SOURCE
    }

    /// True when some day of the item's enrolment window has no active
    /// group membership. Those days are charted under the `"0"` group.
    pub fn has_ungrouped_days(&self) -> bool {
        let data = &self.parseddata;
        let first = data.start_date().unwrap_or(NaiveDate::MIN);
        let last = data.end_date().unwrap_or(NaiveDate::MAX);
        if first > last {
            return false;
        }
        let mut memberships: Vec<(NaiveDate, NaiveDate)> = data
            .group
            .iter()
            .map(|g| {
                (
                    g.start_date().unwrap_or(NaiveDate::MIN),
                    g.end_date().unwrap_or(NaiveDate::MAX),
                )
            })
            .filter(|(start, end)| start <= end)
            .collect();
        memberships.sort();

        // first day not yet covered by a membership
        let mut uncovered = first;
        for (start, end) in memberships {
            if start > uncovered {
                break;
            }
            match end.succ_opt() {
                Some(next) => uncovered = uncovered.max(next),
                None => return false,
            }
            if uncovered > last {
                return false;
            }
        }
        uncovered <= last
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParsedData {
    /// `DD.MM.YYYY`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startdate: Option<String>,
    /// `DD.MM.YYYY`, inclusive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enddate: Option<String>,
    #[serde(default)]
    pub group: Vec<GroupAssignment>,
    #[serde(default)]
    pub booking: Vec<Booking>,
    #[serde(default)]
    pub paused: Pause,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
}

impl ParsedData {
    pub fn start_date(&self) -> Option<NaiveDate> {
        opt_display_date(self.startdate.as_deref())
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        opt_display_date(self.enddate.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupAssignment {
    /// Catalog id; falls back to `name` for files written without ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl GroupAssignment {
    pub fn key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        opt_display_date(self.start.as_deref())
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        opt_display_date(self.end.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Booking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startdate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enddate: Option<String>,
    #[serde(default)]
    pub times: Vec<BookingDay>,
}

impl Booking {
    pub fn start_date(&self) -> Option<NaiveDate> {
        opt_display_date(self.startdate.as_deref())
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        opt_display_date(self.enddate.as_deref())
    }

    /// Booked hours per week. Unparseable or inverted segments count as zero.
    pub fn weekly_hours(&self) -> f64 {
        self.times
            .iter()
            .flat_map(|day| day.segments.iter())
            .map(TimeSegment::hours)
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDay {
    /// Weekday label as exported ("Mo", "Di", ...).
    pub day: String,
    #[serde(default)]
    pub segments: Vec<TimeSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSegment {
    /// `HH:MM`
    pub booking_start: String,
    /// `HH:MM`
    pub booking_end: String,
}

impl TimeSegment {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            booking_start: start.into(),
            booking_end: end.into(),
        }
    }

    pub fn hours(&self) -> f64 {
        let parse = |s: &str| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok();
        match (parse(&self.booking_start), parse(&self.booking_end)) {
            (Some(start), Some(end)) if end > start => {
                (end - start).num_minutes() as f64 / 60.0
            }
            _ => 0.0,
        }
    }
}

/// Pause window; dates are stored as ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Pause {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl Pause {
    pub fn start_date(&self) -> Option<NaiveDate> {
        opt_iso_date(self.start.as_deref())
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        opt_iso_date(self.end.as_deref())
    }

    /// Whether the pause applies on `day`. An enabled pause with one
    /// parseable bound is open on the other side; with none it is ignored.
    pub fn covers(&self, day: NaiveDate) -> bool {
        let (start, end) = (self.start_date(), self.end_date());
        if !self.enabled || (start.is_none() && end.is_none()) {
            return false;
        }
        start.map_or(true, |s| s <= day) && end.map_or(true, |e| day <= e)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupDef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualificationDef {
    pub key: String,
    pub name: String,
    /// Counts towards the Fachkraft quota.
    #[serde(default)]
    pub specialist: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_defaults() {
        let s = ScenarioDraft::default().into_scenario();
        assert_eq!(s.name, DEFAULT_SCENARIO_NAME);
        assert_eq!(s.confidence, 50);
        assert_eq!(s.likelihood, 50);
        assert_eq!(s.desirability, 50);
        assert!(s.is_root());
    }

    #[test]
    fn draft_clamps_ratings() {
        let s = ScenarioDraft {
            id: Some("a".into()),
            confidence: Some(140),
            likelihood: Some(-3),
            ..ScenarioDraft::default()
        }
        .into_scenario();
        assert_eq!(s.id.as_str(), "a");
        assert_eq!(s.confidence, 100);
        assert_eq!(s.likelihood, 0);
    }

    #[test]
    fn patch_can_detach_base() {
        let mut s = Scenario::new("child", "Child").based_on("base");
        ScenarioPatch {
            base_scenario_id: Some(None),
            name: Some("Renamed".to_string()),
            ..ScenarioPatch::default()
        }
        .apply_to(&mut s);
        assert!(s.is_root());
        assert_eq!(s.name, "Renamed");
    }

    #[test]
    fn booking_weekly_hours_sum_segments() {
        let booking = Booking {
            startdate: None,
            enddate: None,
            times: vec![
                BookingDay {
                    day: "Mo".to_string(),
                    segments: vec![
                        TimeSegment::new("08:00", "12:30"),
                        TimeSegment::new("13:00", "15:00"),
                    ],
                },
                BookingDay {
                    day: "Di".to_string(),
                    segments: vec![
                        TimeSegment::new("08:00", "08:00"),
                        TimeSegment::new("x", "12:00"),
                    ],
                },
            ],
        };
        assert!((booking.weekly_hours() - 6.5).abs() < 1e-9);
    }

    #[test]
    fn pause_covers_enabled_window_only() {
        let day = NaiveDate::from_ymd_opt(2025, 4, 10).unwrap();
        let mut pause = Pause {
            enabled: false,
            start: Some("2025-04-01".to_string()),
            end: Some("2025-04-30".to_string()),
        };
        assert!(!pause.covers(day));
        pause.enabled = true;
        assert!(pause.covers(day));
        assert!(!pause.covers(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()));

        pause.start = Some(String::new());
        pause.end = Some("kaputt".to_string());
        assert!(!pause.covers(day));
    }

    #[test]
    fn ungrouped_days_cover_gaps_and_tails() {
        let membership = |start: Option<&str>, end: Option<&str>| GroupAssignment {
            id: Some("g1".to_string()),
            name: "Krippe".to_string(),
            start: start.map(str::to_string),
            end: end.map(str::to_string),
        };
        let mut item = DataItem::new("k1", ItemKind::Demand, "Mia");
        assert!(item.has_ungrouped_days());

        item.parseddata.group.push(membership(None, None));
        assert!(!item.has_ungrouped_days());

        item.parseddata.startdate = Some("01.01.2025".to_string());
        item.parseddata.enddate = Some("30.06.2025".to_string());
        item.parseddata.group[0] = membership(None, Some("31.03.2025"));
        assert!(item.has_ungrouped_days());

        item.parseddata.group.push(membership(Some("01.04.2025"), None));
        assert!(!item.has_ungrouped_days());

        item.parseddata.group[1] = membership(Some("02.04.2025"), Some("30.06.2025"));
        assert!(item.has_ungrouped_days());
    }

    #[test]
    fn scenario_uses_camel_case_base_field() {
        let s = Scenario::new("child", "Child").based_on("base");
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"baseScenarioId\":\"base\""));
    }

    #[test]
    fn delta_tagging() {
        let delta: ItemDelta = serde_json::from_str(r#"{"op":"tombstone","id":"k1"}"#).unwrap();
        assert_eq!(delta.item_id().as_str(), "k1");
    }
}
