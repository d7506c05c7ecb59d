//! Scenario forest: records, base links, selection.
//!
//! Base links are only ever followed iteratively with a visited set, so a
//! corrupt file (cycle, dangling base) cannot hang a traversal.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use kp_core::ScenarioId;
use kp_project::{Scenario, ScenarioDraft, ScenarioPatch};

use crate::error::{TreeError, TreeResult};
use crate::store::DataStore;

/// Why an ancestor chain was cut short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainWarning {
    /// The walk came back to `at`; everything above it is ignored.
    Cycle { at: ScenarioId },
    /// A base link points at `missing`; the chain starts below it.
    BrokenChain { missing: ScenarioId },
}

impl std::fmt::Display for ChainWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainWarning::Cycle { at } => write!(f, "cycle in base chain at {}", at),
            ChainWarning::BrokenChain { missing } => {
                write!(f, "base scenario {} does not exist", missing)
            }
        }
    }
}

/// Ancestor chain ordered from the root-most reachable ancestor down to the
/// scenario itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorChain {
    pub ids: Vec<ScenarioId>,
    pub warning: Option<ChainWarning>,
}

impl AncestorChain {
    /// Strict view: any truncation becomes an error.
    pub fn into_result(self) -> TreeResult<Vec<ScenarioId>> {
        let Some(warning) = self.warning else {
            return Ok(self.ids);
        };
        let scenario = self.ids.last().cloned().unwrap_or_else(|| ScenarioId::new(""));
        Err(match warning {
            ChainWarning::Cycle { at } => TreeError::Cycle { scenario, at },
            ChainWarning::BrokenChain { missing } => TreeError::BrokenChain { scenario, missing },
        })
    }
}

/// Result of a cascading delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// The deleted scenario and all its transitive descendants.
    pub removed: BTreeSet<ScenarioId>,
    /// Selection after the delete.
    pub selected: Option<ScenarioId>,
}

/// One row of the nested scenario list, in pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: ScenarioId,
    pub name: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioTree {
    scenarios: BTreeMap<ScenarioId, Scenario>,
    /// Insertion order, used for listing and selection fallback.
    order: Vec<ScenarioId>,
    selected: Option<ScenarioId>,
    revisions: HashMap<ScenarioId, u64>,
    next_revision: u64,
}

impl ScenarioTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded records. Base links are taken as-is; only duplicate
    /// ids are rejected.
    pub fn from_scenarios(scenarios: impl IntoIterator<Item = Scenario>) -> TreeResult<Self> {
        let mut tree = Self::new();
        for scenario in scenarios {
            tree.insert_unchecked(scenario)?;
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn contains(&self, id: &ScenarioId) -> bool {
        self.scenarios.contains_key(id)
    }

    pub fn get(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.get(id)
    }

    /// Scenarios in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.order.iter().filter_map(|id| self.scenarios.get(id))
    }

    /// Revision stamp of a scenario record; changes on every update.
    pub fn revision(&self, id: &ScenarioId) -> u64 {
        self.revisions.get(id).copied().unwrap_or(0)
    }

    pub fn selected(&self) -> Option<&ScenarioId> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, id: &ScenarioId) -> TreeResult<()> {
        if !self.contains(id) {
            return Err(TreeError::UnknownScenario(id.clone()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    /// Restore a persisted selection, falling back to the first root when it
    /// no longer exists.
    pub fn restore_selection(&mut self, id: Option<&ScenarioId>) {
        self.selected = match id {
            Some(id) if self.contains(id) => Some(id.clone()),
            _ => self.first_root(),
        };
    }

    /// Add a scenario from a draft and select it.
    pub fn add(&mut self, draft: ScenarioDraft) -> TreeResult<ScenarioId> {
        let scenario = draft.into_scenario();
        let id = scenario.id.clone();
        self.insert(scenario)?;
        self.selected = Some(id.clone());
        Ok(id)
    }

    /// Insert a complete record without touching the selection. The base, if
    /// any, must already exist.
    pub fn insert(&mut self, scenario: Scenario) -> TreeResult<()> {
        if let Some(base) = &scenario.base_scenario_id {
            if !self.contains(base) {
                return Err(TreeError::UnknownScenario(base.clone()));
            }
        }
        self.insert_unchecked(scenario)
    }

    fn insert_unchecked(&mut self, scenario: Scenario) -> TreeResult<()> {
        if self.contains(&scenario.id) {
            return Err(TreeError::DuplicateScenario(scenario.id));
        }
        let id = scenario.id.clone();
        self.order.push(id.clone());
        self.scenarios.insert(id.clone(), scenario);
        self.bump(&id);
        Ok(())
    }

    /// Apply a patch. A base change must not point into the scenario's own
    /// descendant set.
    pub fn update(&mut self, id: &ScenarioId, patch: &ScenarioPatch) -> TreeResult<()> {
        if !self.contains(id) {
            return Err(TreeError::UnknownScenario(id.clone()));
        }
        if let Some(Some(base)) = &patch.base_scenario_id {
            if !self.contains(base) {
                return Err(TreeError::UnknownScenario(base.clone()));
            }
            if self.descendants(id)?.contains(base) {
                return Err(TreeError::WouldCreateCycle {
                    scenario: id.clone(),
                    base: base.clone(),
                });
            }
        }
        if let Some(scenario) = self.scenarios.get_mut(id) {
            patch.apply_to(scenario);
        }
        self.bump(id);
        Ok(())
    }

    /// Lenient ancestor walk, root-most first. Truncation is reported in
    /// `warning` instead of failing; only an unknown `id` is an error.
    pub fn ancestor_chain(&self, id: &ScenarioId) -> TreeResult<AncestorChain> {
        let mut current = self
            .scenarios
            .get(id)
            .ok_or_else(|| TreeError::UnknownScenario(id.clone()))?;

        let mut ids = vec![current.id.clone()];
        let mut visited: HashSet<&ScenarioId> = HashSet::from([&current.id]);
        let mut warning = None;

        // Every step visits a distinct scenario, so len() bounds the walk.
        for _ in 0..self.scenarios.len() {
            let Some(base) = &current.base_scenario_id else {
                break;
            };
            if visited.contains(base) {
                warning = Some(ChainWarning::Cycle { at: base.clone() });
                break;
            }
            match self.scenarios.get(base) {
                Some(parent) => {
                    visited.insert(&parent.id);
                    ids.push(parent.id.clone());
                    current = parent;
                }
                None => {
                    warning = Some(ChainWarning::BrokenChain {
                        missing: base.clone(),
                    });
                    break;
                }
            }
        }

        ids.reverse();
        Ok(AncestorChain { ids, warning })
    }

    /// Ancestors from the root down to `id` itself; fails on a cycle or a
    /// dangling base link.
    pub fn ancestors(&self, id: &ScenarioId) -> TreeResult<Vec<ScenarioId>> {
        self.ancestor_chain(id)?.into_result()
    }

    /// Base -> children adjacency, children in insertion order.
    fn children_index(&self) -> HashMap<&ScenarioId, Vec<&ScenarioId>> {
        let mut index: HashMap<&ScenarioId, Vec<&ScenarioId>> = HashMap::new();
        for scenario in self.iter() {
            if let Some(base) = &scenario.base_scenario_id {
                index.entry(base).or_default().push(&scenario.id);
            }
        }
        index
    }

    /// `id` plus all scenarios transitively based on it.
    pub fn descendants(&self, id: &ScenarioId) -> TreeResult<BTreeSet<ScenarioId>> {
        if !self.contains(id) {
            return Err(TreeError::UnknownScenario(id.clone()));
        }
        let index = self.children_index();
        let mut result = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            if !result.insert(next.clone()) {
                continue;
            }
            if let Some(children) = index.get(next) {
                queue.extend(children.iter().copied());
            }
        }
        Ok(result)
    }

    /// Direct children of `id`, in insertion order.
    pub fn children(&self, id: &ScenarioId) -> Vec<&Scenario> {
        self.iter()
            .filter(|s| s.base_scenario_id.as_ref() == Some(id))
            .collect()
    }

    /// Scenarios without a base, plus those whose base no longer exists.
    pub fn roots(&self) -> Vec<&Scenario> {
        self.iter()
            .filter(|s| match &s.base_scenario_id {
                None => true,
                Some(base) => !self.contains(base),
            })
            .collect()
    }

    fn first_root(&self) -> Option<ScenarioId> {
        self.roots()
            .first()
            .map(|s| s.id.clone())
            .or_else(|| self.order.first().cloned())
    }

    /// Scenarios `id` may be rebased onto: everything outside its own
    /// descendant set.
    pub fn base_candidates(&self, id: &ScenarioId) -> TreeResult<Vec<&Scenario>> {
        let excluded = self.descendants(id)?;
        Ok(self.iter().filter(|s| !excluded.contains(&s.id)).collect())
    }

    /// Pre-order listing with depths. Scenarios unreachable from any root
    /// (members of a cycle) are appended as extra roots.
    pub fn tree_view(&self) -> Vec<TreeRow> {
        let index = self.children_index();
        let mut rows = Vec::with_capacity(self.len());
        let mut visited: HashSet<&ScenarioId> = HashSet::new();

        let mut starts: Vec<&ScenarioId> = self.roots().into_iter().map(|s| &s.id).collect();
        starts.extend(self.order.iter());

        for start in starts {
            if visited.contains(start) {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            while let Some((id, depth)) = stack.pop() {
                if !visited.insert(id) {
                    continue;
                }
                if let Some(scenario) = self.scenarios.get(id) {
                    rows.push(TreeRow {
                        id: id.clone(),
                        name: scenario.name.clone(),
                        depth,
                    });
                }
                if let Some(children) = index.get(id) {
                    for child in children.iter().rev() {
                        stack.push((*child, depth + 1));
                    }
                }
            }
        }
        rows
    }

    /// Delete `id` and its descendants, dropping their private stores.
    ///
    /// If the selection was removed it falls back to a remaining root, or to
    /// nothing when the tree is empty.
    pub fn delete<S: DataStore + ?Sized>(
        &mut self,
        id: &ScenarioId,
        store: &mut S,
    ) -> TreeResult<DeleteOutcome> {
        let removed = self.descendants(id)?;

        for scenario_id in &removed {
            self.scenarios.remove(scenario_id);
            self.revisions.remove(scenario_id);
            store.remove_scenario(scenario_id);
        }
        self.order.retain(|s| !removed.contains(s));

        if self
            .selected
            .as_ref()
            .is_some_and(|selected| removed.contains(selected))
        {
            self.selected = self.first_root();
        }

        tracing::debug!(scenario = %id, removed = removed.len(), "deleted scenario subtree");

        Ok(DeleteOutcome {
            removed,
            selected: self.selected.clone(),
        })
    }

    /// Records in insertion order, for persistence.
    pub fn to_scenarios(&self) -> Vec<Scenario> {
        self.iter().cloned().collect()
    }

    fn bump(&mut self, id: &ScenarioId) {
        self.next_revision += 1;
        self.revisions.insert(id.clone(), self.next_revision);
    }
}
