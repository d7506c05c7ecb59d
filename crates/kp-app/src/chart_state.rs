//! Chart filter state: view-only selections, never persisted with the plan.
//!
//! The weekly and the midterm chart keep their own group and qualification
//! selections. Edits go to whichever chart is visible and to both when both
//! are.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use kp_core::{NO_GROUP_ID, NO_QUALIFICATION_KEY};
use kp_project::{DataItem, GroupDef, ItemKind, QualificationDef, TimeDimension};
use serde::{Deserialize, Serialize};

pub const NO_GROUP_LABEL: &str = "keine Gruppe";
pub const NO_QUALIFICATION_LABEL: &str = "keine Qualifikation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartToggle {
    Weekly,
    Midterm,
}

/// Selectable filter values, id or key to display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub groups: BTreeMap<String, String>,
    pub qualifications: BTreeMap<String, String>,
}

impl FilterOptions {
    /// Catalog entries plus the sentinels when some item needs them: `"0"`
    /// for items with days outside any group and for staff without a
    /// qualification.
    pub fn from_catalogs<'a>(
        groups: &[GroupDef],
        qualifications: &[QualificationDef],
        items: impl IntoIterator<Item = &'a DataItem>,
    ) -> Self {
        let mut options = Self {
            groups: groups.iter().map(|g| (g.id.clone(), g.name.clone())).collect(),
            qualifications: qualifications
                .iter()
                .map(|q| (q.key.clone(), q.name.clone()))
                .collect(),
        };
        for item in items {
            if item.has_ungrouped_days() {
                options
                    .groups
                    .insert(NO_GROUP_ID.to_string(), NO_GROUP_LABEL.to_string());
            }
            let unqualified = item
                .parseddata
                .qualification
                .as_deref()
                .map_or(true, str::is_empty);
            if item.kind == ItemKind::Capacity && unqualified {
                options.qualifications.insert(
                    NO_QUALIFICATION_KEY.to_string(),
                    NO_QUALIFICATION_LABEL.to_string(),
                );
            }
        }
        options
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFilterState {
    /// Reference date; `None` means today.
    pub stichtag: Option<NaiveDate>,
    pub selected_groups: Vec<String>,
    pub selected_qualifications: Vec<String>,
    pub midterm_time_dimension: TimeDimension,
    pub midterm_selected_groups: Vec<String>,
    pub midterm_selected_qualifications: Vec<String>,
    pub chart_toggles: BTreeSet<ChartToggle>,
    default_dimension: TimeDimension,
}

impl Default for ChartFilterState {
    fn default() -> Self {
        Self::new(TimeDimension::default())
    }
}

impl ChartFilterState {
    pub fn new(default_dimension: TimeDimension) -> Self {
        Self {
            stichtag: None,
            selected_groups: Vec::new(),
            selected_qualifications: Vec::new(),
            midterm_time_dimension: default_dimension,
            midterm_selected_groups: Vec::new(),
            midterm_selected_qualifications: Vec::new(),
            chart_toggles: BTreeSet::from([ChartToggle::Weekly, ChartToggle::Midterm]),
            default_dimension,
        }
    }

    /// Back to the initial state; scenario data is untouched.
    pub fn reset(&mut self) {
        *self = Self::new(self.default_dimension);
    }

    pub fn show_weekly(&self) -> bool {
        self.chart_toggles.contains(&ChartToggle::Weekly)
    }

    pub fn show_midterm(&self) -> bool {
        self.chart_toggles.contains(&ChartToggle::Midterm)
    }

    fn midterm_only(&self) -> bool {
        self.show_midterm() && !self.show_weekly()
    }

    pub fn current_groups(&self) -> &[String] {
        if self.midterm_only() {
            &self.midterm_selected_groups
        } else {
            &self.selected_groups
        }
    }

    pub fn current_qualifications(&self) -> &[String] {
        if self.midterm_only() {
            &self.midterm_selected_qualifications
        } else {
            &self.selected_qualifications
        }
    }

    pub fn set_groups(&mut self, groups: Vec<String>) {
        let both = self.show_weekly() && self.show_midterm();
        if self.midterm_only() || both {
            self.midterm_selected_groups = groups.clone();
        }
        if !self.midterm_only() {
            self.selected_groups = groups;
        }
    }

    pub fn set_qualifications(&mut self, qualifications: Vec<String>) {
        let both = self.show_weekly() && self.show_midterm();
        if self.midterm_only() || both {
            self.midterm_selected_qualifications = qualifications.clone();
        }
        if !self.midterm_only() {
            self.selected_qualifications = qualifications;
        }
    }

    pub fn set_toggles(&mut self, toggles: impl IntoIterator<Item = ChartToggle>) {
        self.chart_toggles = toggles.into_iter().collect();
    }

    pub fn set_stichtag(&mut self, stichtag: Option<NaiveDate>) {
        self.stichtag = stichtag;
    }

    pub fn set_midterm_time_dimension(&mut self, dimension: TimeDimension) {
        self.midterm_time_dimension = dimension;
    }

    pub fn reference_date(&self, today: NaiveDate) -> NaiveDate {
        self.stichtag.unwrap_or(today)
    }

    /// Empty selections become "everything available".
    pub fn init_from_options(&mut self, options: &FilterOptions) {
        let all_groups: Vec<String> = options.groups.keys().cloned().collect();
        let all_quals: Vec<String> = options.qualifications.keys().cloned().collect();
        for (selection, all) in [
            (&mut self.selected_groups, &all_groups),
            (&mut self.midterm_selected_groups, &all_groups),
            (&mut self.selected_qualifications, &all_quals),
            (&mut self.midterm_selected_qualifications, &all_quals),
        ] {
            if selection.is_empty() && !all.is_empty() {
                selection.clone_from(all);
            }
        }
    }
}
