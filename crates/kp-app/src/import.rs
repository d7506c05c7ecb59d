//! Import of a normalized export bundle into a new root scenario.
//!
//! Bookings and assignments arrive separately from the items and reference
//! them by the external (Adebis) identifier; they are linked to the freshly
//! generated item ids before anything is stored.

use std::collections::HashMap;
use std::path::Path;

use kp_core::{ItemId, ScenarioId, NO_GROUP_ID, NO_QUALIFICATION_KEY};
use kp_project::{
    Booking, DataItem, GroupAssignment, GroupDef, ItemDelta, ItemKind, ParsedData,
    QualificationDef, ScenarioDraft,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::session::Session;

pub const IMPORT_SOURCE: &str = "adebis export";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportBundle {
    #[serde(default)]
    pub scenario_settings: ScenarioDraft,
    #[serde(default)]
    pub group_defs: Vec<GroupDef>,
    #[serde(default)]
    pub quali_defs: Vec<QualificationDef>,
    #[serde(default)]
    pub group_assignments: Vec<ImportedGroupAssignment>,
    #[serde(default)]
    pub quali_assignments: Vec<ImportedQualification>,
    #[serde(default)]
    pub sim_data_list: Vec<ImportedItem>,
    #[serde(default)]
    pub bookings_list: Vec<ImportedBooking>,
}

/// A data item without an internal id yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub parseddata: ParsedData,
}

/// A booking keyed by the child's external id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedBooking {
    pub kind_adebis_id: String,
    #[serde(flatten)]
    pub booking: Booking,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedGroupAssignment {
    pub external_id: String,
    #[serde(flatten)]
    pub group: GroupAssignment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedQualification {
    pub external_id: String,
    pub qualification: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub scenario_id: ScenarioId,
    pub items: usize,
    pub bookings_linked: usize,
    /// Bookings whose `kindAdebisId` matched no imported child.
    pub bookings_dropped: usize,
    pub assignments_dropped: usize,
}

/// Read a bundle; `.json` is JSON, anything else YAML.
pub fn load_bundle(path: &Path) -> AppResult<ImportBundle> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::PlanFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content)
            .map_err(|e| AppError::Import(format!("Failed to parse bundle JSON: {}", e)))
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Import(format!("Failed to parse bundle YAML: {}", e)))
    }
}

/// Link bundle records to new item ids. Returns the items plus the number of
/// linked and dropped bookings and dropped assignments.
fn link_items(bundle: ImportBundle) -> (Vec<DataItem>, usize, usize, usize) {
    let mut items: Vec<DataItem> = bundle
        .sim_data_list
        .into_iter()
        .map(|imported| DataItem {
            id: ItemId::generate(),
            kind: imported.kind,
            name: imported.name,
            source: imported.source.unwrap_or_else(|| IMPORT_SOURCE.to_string()),
            external_id: imported.external_id,
            parseddata: imported.parseddata,
        })
        .collect();

    // first item wins for duplicate external ids
    let mut by_external: HashMap<(ItemKind, String), usize> = HashMap::new();
    let mut any_kind: HashMap<String, usize> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        if let Some(ext) = &item.external_id {
            by_external.entry((item.kind, ext.clone())).or_insert(index);
            any_kind.entry(ext.clone()).or_insert(index);
        }
    }

    let mut linked = 0;
    let mut dropped = 0;
    for imported in bundle.bookings_list {
        match by_external.get(&(ItemKind::Demand, imported.kind_adebis_id.clone())) {
            Some(&index) => {
                items[index].parseddata.booking.push(imported.booking);
                linked += 1;
            }
            None => {
                tracing::warn!(
                    kind_adebis_id = %imported.kind_adebis_id,
                    "dropping booking without matching child"
                );
                dropped += 1;
            }
        }
    }

    let mut assignments_dropped = 0;
    for assignment in bundle.group_assignments {
        match any_kind.get(&assignment.external_id) {
            Some(&index) => items[index].parseddata.group.push(assignment.group),
            None => assignments_dropped += 1,
        }
    }
    for assignment in bundle.quali_assignments {
        match by_external.get(&(ItemKind::Capacity, assignment.external_id)) {
            Some(&index) => items[index].parseddata.qualification = Some(assignment.qualification),
            None => assignments_dropped += 1,
        }
    }
    if assignments_dropped > 0 {
        tracing::warn!(count = assignments_dropped, "dropped assignments without matching item");
    }

    (items, linked, dropped, assignments_dropped)
}

/// Import `bundle` as a new root scenario and select it.
pub fn import_bundle(session: &mut Session, bundle: ImportBundle) -> AppResult<ImportReport> {
    // checked up front so a rejected bundle leaves no half-built scenario
    if bundle.group_defs.iter().any(|g| g.id == NO_GROUP_ID) {
        return Err(AppError::Import(format!(
            "group id '{}' is reserved for items without a group",
            NO_GROUP_ID
        )));
    }
    if bundle.quali_defs.iter().any(|q| q.key == NO_QUALIFICATION_KEY) {
        return Err(AppError::Import(format!(
            "qualification key '{}' is reserved",
            NO_QUALIFICATION_KEY
        )));
    }

    let draft = ScenarioDraft {
        id: None,
        base_scenario_id: None,
        ..bundle.scenario_settings.clone()
    };
    let groups = bundle.group_defs.clone();
    let qualifications = bundle.quali_defs.clone();
    let (items, bookings_linked, bookings_dropped, assignments_dropped) = link_items(bundle);

    let scenario_id = session.add_scenario(draft)?;
    session.set_groups(&scenario_id, groups)?;
    session.set_qualifications(&scenario_id, qualifications)?;
    let count = items.len();
    session.record_deltas(
        &scenario_id,
        items.into_iter().map(|item| ItemDelta::Add { item }),
    )?;

    tracing::debug!(
        scenario = %scenario_id,
        items = count,
        bookings_linked,
        bookings_dropped,
        "imported bundle"
    );

    Ok(ImportReport {
        scenario_id,
        items: count,
        bookings_linked,
        bookings_dropped,
        assignments_dropped,
    })
}
