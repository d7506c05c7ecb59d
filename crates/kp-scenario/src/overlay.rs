//! Overlay resolution: a scenario's effective items are its ancestor chain's
//! deltas folded root to leaf.

use std::collections::BTreeMap;

use kp_core::{ItemId, ScenarioId};
use kp_project::{DataItem, GroupDef, ItemDelta, ItemKind, QualificationDef};

use crate::error::TreeResult;
use crate::store::DataStore;
use crate::tree::{ChainWarning, ScenarioTree};

/// Effective items keyed by id.
pub type EffectiveItems = BTreeMap<ItemId, DataItem>;

/// Apply one delta to an accumulated view.
///
/// An edit only overwrites an id that is live at this point; edits of absent
/// or tombstoned ids are dropped. Only `Add` can revive an id.
pub fn apply_delta(mut items: EffectiveItems, delta: &ItemDelta) -> EffectiveItems {
    match delta {
        ItemDelta::Add { item } => {
            items.insert(item.id.clone(), item.clone());
        }
        ItemDelta::Edit { item } => {
            if let Some(slot) = items.get_mut(&item.id) {
                *slot = item.clone();
            }
        }
        ItemDelta::Tombstone { id } => {
            items.remove(id);
        }
    }
    items
}

pub fn fold_deltas<'d>(
    items: EffectiveItems,
    deltas: impl IntoIterator<Item = &'d ItemDelta>,
) -> EffectiveItems {
    deltas.into_iter().fold(items, apply_delta)
}

/// The resolved view of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveView {
    pub scenario_id: ScenarioId,
    /// Chain members actually folded, root-most first.
    pub chain: Vec<ScenarioId>,
    pub items: EffectiveItems,
    pub warning: Option<ChainWarning>,
}

impl EffectiveView {
    pub fn get(&self, id: &ItemId) -> Option<&DataItem> {
        self.items.get(id)
    }

    pub fn of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &DataItem> {
        self.items.values().filter(move |item| item.kind == kind)
    }

    pub fn demand(&self) -> impl Iterator<Item = &DataItem> {
        self.of_kind(ItemKind::Demand)
    }

    pub fn capacity(&self) -> impl Iterator<Item = &DataItem> {
        self.of_kind(ItemKind::Capacity)
    }

    pub fn into_items(self) -> Vec<DataItem> {
        self.items.into_values().collect()
    }
}

/// Read-only resolver over a tree and a store. Resolving never mutates
/// either.
pub struct OverlayResolver<'a, S: DataStore + ?Sized> {
    tree: &'a ScenarioTree,
    store: &'a S,
}

impl<'a, S: DataStore + ?Sized> OverlayResolver<'a, S> {
    pub fn new(tree: &'a ScenarioTree, store: &'a S) -> Self {
        Self { tree, store }
    }

    pub fn tree(&self) -> &'a ScenarioTree {
        self.tree
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Effective items of `scenario`. A truncated chain is folded as far as
    /// it reaches and reported in `warning`.
    pub fn resolve_effective_items(&self, scenario: &ScenarioId) -> TreeResult<EffectiveView> {
        let chain = self.tree.ancestor_chain(scenario)?;
        if let Some(warning) = &chain.warning {
            tracing::warn!(scenario = %scenario, %warning, "resolving truncated base chain");
        }

        let items = chain
            .ids
            .iter()
            .fold(EffectiveItems::new(), |acc, id| fold_deltas(acc, self.store.deltas(id)));

        tracing::debug!(
            scenario = %scenario,
            depth = chain.ids.len(),
            items = items.len(),
            "resolved effective items"
        );

        Ok(EffectiveView {
            scenario_id: scenario.clone(),
            chain: chain.ids,
            items,
            warning: chain.warning,
        })
    }

    /// One effective item, taken from the full resolution.
    pub fn get_effective_item(
        &self,
        scenario: &ScenarioId,
        item: &ItemId,
    ) -> TreeResult<Option<DataItem>> {
        let mut view = self.resolve_effective_items(scenario)?;
        Ok(view.items.remove(item))
    }

    /// The accumulated view after each chain member, root-most first. The last
    /// layer equals `resolve_effective_items`.
    pub fn resolve_layers(
        &self,
        scenario: &ScenarioId,
    ) -> TreeResult<Vec<(ScenarioId, EffectiveItems)>> {
        let chain = self.tree.ancestor_chain(scenario)?;
        let mut layers = Vec::with_capacity(chain.ids.len());
        let mut acc = EffectiveItems::new();
        for id in chain.ids {
            acc = fold_deltas(acc, self.store.deltas(&id));
            layers.push((id, acc.clone()));
        }
        Ok(layers)
    }

    /// Group catalog of the nearest chain member that has one.
    pub fn effective_groups(&self, scenario: &ScenarioId) -> TreeResult<Vec<GroupDef>> {
        let chain = self.tree.ancestor_chain(scenario)?;
        Ok(chain
            .ids
            .iter()
            .rev()
            .map(|id| self.store.groups(id))
            .find(|groups| !groups.is_empty())
            .map(<[GroupDef]>::to_vec)
            .unwrap_or_default())
    }

    pub fn effective_qualifications(
        &self,
        scenario: &ScenarioId,
    ) -> TreeResult<Vec<QualificationDef>> {
        let chain = self.tree.ancestor_chain(scenario)?;
        Ok(chain
            .ids
            .iter()
            .rev()
            .map(|id| self.store.qualifications(id))
            .find(|quals| !quals.is_empty())
            .map(<[QualificationDef]>::to_vec)
            .unwrap_or_default())
    }

    /// `(scenario, record revision, store revision)` for every chain member,
    /// root-most first. A change in any of them invalidates anything derived
    /// from the chain.
    pub fn chain_stamps(&self, scenario: &ScenarioId) -> TreeResult<Vec<(ScenarioId, u64, u64)>> {
        let chain = self.tree.ancestor_chain(scenario)?;
        Ok(chain
            .ids
            .into_iter()
            .map(|id| {
                let record = self.tree.revision(&id);
                let store = self.store.revision(&id);
                (id, record, store)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use kp_project::Scenario;

    fn item(id: &str, name: &str) -> DataItem {
        DataItem::new(id, ItemKind::Demand, name)
    }

    fn add(id: &str, name: &str) -> ItemDelta {
        ItemDelta::Add {
            item: item(id, name),
        }
    }

    fn edit(id: &str, name: &str) -> ItemDelta {
        ItemDelta::Edit {
            item: item(id, name),
        }
    }

    fn tomb(id: &str) -> ItemDelta {
        ItemDelta::Tombstone { id: id.into() }
    }

    #[test]
    fn edit_of_absent_id_is_noop() {
        let view = fold_deltas(EffectiveItems::new(), &[edit("k1", "Ghost")]);
        assert!(view.is_empty());
    }

    #[test]
    fn add_overwrites_and_tombstone_removes() {
        let view = fold_deltas(
            EffectiveItems::new(),
            &[add("k1", "A"), add("k1", "B"), add("k2", "C"), tomb("k2")],
        );
        assert_eq!(view.len(), 1);
        assert_eq!(view[&ItemId::from("k1")].name, "B");
    }

    fn chain_fixture() -> (ScenarioTree, MemoryStore) {
        let tree = ScenarioTree::from_scenarios([
            Scenario::new("root", "Root"),
            Scenario::new("mid", "Mid").based_on("root"),
            Scenario::new("leaf", "Leaf").based_on("mid"),
        ])
        .unwrap();
        let mut store = MemoryStore::new();
        store.record(&"root".into(), add("k1", "root"));
        store.record(&"root".into(), add("k2", "keep"));
        store.record(&"mid".into(), edit("k1", "mid"));
        store.record(&"leaf".into(), tomb("k2"));
        (tree, store)
    }

    #[test]
    fn layers_end_in_effective_view() {
        let (tree, store) = chain_fixture();
        let resolver = OverlayResolver::new(&tree, &store);
        let layers = resolver.resolve_layers(&"leaf".into()).unwrap();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].1[&ItemId::from("k1")].name, "root");
        assert_eq!(layers[1].1[&ItemId::from("k1")].name, "mid");
        assert_eq!(
            layers[2].1,
            resolver.resolve_effective_items(&"leaf".into()).unwrap().items
        );
    }

    #[test]
    fn single_item_matches_full_view() {
        let (tree, store) = chain_fixture();
        let resolver = OverlayResolver::new(&tree, &store);
        let leaf = ScenarioId::from("leaf");
        let full = resolver.resolve_effective_items(&leaf).unwrap();
        for id in ["k1", "k2", "k3"] {
            let id = ItemId::from(id);
            assert_eq!(
                resolver.get_effective_item(&leaf, &id).unwrap().as_ref(),
                full.get(&id)
            );
        }
    }

    #[test]
    fn resolving_does_not_touch_ancestor() {
        let (tree, store) = chain_fixture();
        let resolver = OverlayResolver::new(&tree, &store);
        let root = resolver.resolve_effective_items(&"root".into()).unwrap();
        assert_eq!(root.items.len(), 2);
        assert_eq!(root.items[&ItemId::from("k1")].name, "root");
    }

    #[test]
    fn catalogs_come_from_nearest_non_empty_member() {
        let (tree, mut store) = chain_fixture();
        store.set_groups(
            &"root".into(),
            vec![GroupDef {
                id: "g1".to_string(),
                name: "Krippe".to_string(),
            }],
        );
        store.set_groups(
            &"mid".into(),
            vec![GroupDef {
                id: "g2".to_string(),
                name: "Hort".to_string(),
            }],
        );
        let resolver = OverlayResolver::new(&tree, &store);
        let groups = resolver.effective_groups(&"leaf".into()).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "g2");
        assert!(resolver.effective_qualifications(&"leaf".into()).unwrap().is_empty());
    }

    #[test]
    fn broken_chain_resolves_available_members() {
        let tree = ScenarioTree::from_scenarios([
            Scenario::new("a", "A").based_on("gone"),
            Scenario::new("b", "B").based_on("a"),
        ])
        .unwrap();
        let mut store = MemoryStore::new();
        store.record(&"a".into(), add("k1", "A"));
        let view = OverlayResolver::new(&tree, &store)
            .resolve_effective_items(&"b".into())
            .unwrap();
        assert_eq!(view.items.len(), 1);
        let missing = "gone".into();
        assert_eq!(view.warning, Some(ChainWarning::BrokenChain { missing }));
    }

    #[test]
    fn chain_stamps_follow_edits() {
        let (tree, mut store) = chain_fixture();
        let before = OverlayResolver::new(&tree, &store)
            .chain_stamps(&"leaf".into())
            .unwrap();
        store.record(&"root".into(), add("k9", "late"));
        let after = OverlayResolver::new(&tree, &store)
            .chain_stamps(&"leaf".into())
            .unwrap();
        assert_ne!(before, after);
        assert_eq!(before[2], after[2]);
    }
}
