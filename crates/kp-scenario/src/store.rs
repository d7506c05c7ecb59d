//! Per-scenario private data stores.

use std::collections::{BTreeMap, HashMap};

use kp_core::ScenarioId;
use kp_project::{GroupDef, ItemDelta, QualificationDef, ScenarioStoreDef};

/// Read access to each scenario's deltas and catalogs, plus the one write the
/// tree needs for cascading deletes.
pub trait DataStore {
    /// Ordered deltas owned by `scenario`; empty if it has none.
    fn deltas(&self, scenario: &ScenarioId) -> &[ItemDelta];

    fn groups(&self, scenario: &ScenarioId) -> &[GroupDef];

    fn qualifications(&self, scenario: &ScenarioId) -> &[QualificationDef];

    /// Changes whenever the scenario's deltas or catalogs change.
    fn revision(&self, scenario: &ScenarioId) -> u64;

    /// Drop everything `scenario` owns. Returns whether anything was stored.
    fn remove_scenario(&mut self, scenario: &ScenarioId) -> bool;
}

/// In-memory store backed by the plan file representation.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    stores: BTreeMap<ScenarioId, ScenarioStoreDef>,
    revisions: HashMap<ScenarioId, u64>,
    /// Monotonic across the whole store so a deleted and re-created
    /// scenario never reuses a stamp.
    next_revision: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_defs(stores: BTreeMap<ScenarioId, ScenarioStoreDef>) -> Self {
        let mut store = Self {
            stores,
            ..Self::default()
        };
        let ids: Vec<ScenarioId> = store.stores.keys().cloned().collect();
        for id in &ids {
            store.bump(id);
        }
        store
    }

    pub fn to_defs(&self) -> BTreeMap<ScenarioId, ScenarioStoreDef> {
        self.stores.clone()
    }

    pub fn has_scenario(&self, scenario: &ScenarioId) -> bool {
        self.stores.contains_key(scenario)
    }

    pub fn ensure_scenario(&mut self, scenario: &ScenarioId) -> &mut ScenarioStoreDef {
        if !self.stores.contains_key(scenario) {
            self.bump(scenario);
        }
        self.stores.entry(scenario.clone()).or_default()
    }

    /// Append a delta to the scenario's own store.
    pub fn record(&mut self, scenario: &ScenarioId, delta: ItemDelta) {
        self.ensure_scenario(scenario).deltas.push(delta);
        self.bump(scenario);
    }

    pub fn set_groups(&mut self, scenario: &ScenarioId, groups: Vec<GroupDef>) {
        self.ensure_scenario(scenario).groups = groups;
        self.bump(scenario);
    }

    pub fn set_qualifications(
        &mut self,
        scenario: &ScenarioId,
        qualifications: Vec<QualificationDef>,
    ) {
        self.ensure_scenario(scenario).qualifications = qualifications;
        self.bump(scenario);
    }

    fn bump(&mut self, scenario: &ScenarioId) {
        self.next_revision += 1;
        self.revisions.insert(scenario.clone(), self.next_revision);
    }
}

impl DataStore for MemoryStore {
    fn deltas(&self, scenario: &ScenarioId) -> &[ItemDelta] {
        self.stores.get(scenario).map_or(&[], |s| s.deltas.as_slice())
    }

    fn groups(&self, scenario: &ScenarioId) -> &[GroupDef] {
        self.stores.get(scenario).map_or(&[], |s| s.groups.as_slice())
    }

    fn qualifications(&self, scenario: &ScenarioId) -> &[QualificationDef] {
        self.stores
            .get(scenario)
            .map_or(&[], |s| s.qualifications.as_slice())
    }

    fn revision(&self, scenario: &ScenarioId) -> u64 {
        self.revisions.get(scenario).copied().unwrap_or(0)
    }

    fn remove_scenario(&mut self, scenario: &ScenarioId) -> bool {
        self.revisions.remove(scenario);
        self.stores.remove(scenario).is_some()
    }
}
