use kp_core::ScenarioId;
use kp_project::{DataItem, ItemDelta, ItemKind, Scenario, ScenarioPatch};
use kp_results::{compute_cache_key, CacheKey, CacheQuery, Memo, QueryKind};
use kp_scenario::{EffectiveView, MemoryStore, OverlayResolver, ScenarioTree, TreeError};

fn fixture() -> (ScenarioTree, MemoryStore) {
    let tree = ScenarioTree::from_scenarios([
        Scenario::new("base", "Ist"),
        Scenario::new("plan", "Plan").based_on("base"),
        Scenario::new("side", "Seitenzweig"),
    ])
    .unwrap();
    let mut store = MemoryStore::new();
    let item = DataItem::new("k1", ItemKind::Demand, "Mia");
    store.record(&"base".into(), ItemDelta::Add { item });
    (tree, store)
}

fn view_key(tree: &ScenarioTree, store: &MemoryStore, scenario: &ScenarioId) -> CacheKey {
    let stamps = OverlayResolver::new(tree, store).chain_stamps(scenario).unwrap();
    compute_cache_key(&CacheQuery::new(QueryKind::EffectiveItems, scenario), &stamps)
}

fn cached_len(
    memo: &mut Memo<EffectiveView>,
    tree: &ScenarioTree,
    store: &MemoryStore,
    scenario: &ScenarioId,
) -> usize {
    let key = view_key(tree, store, scenario);
    memo.get_or_try_insert_with(key, || {
        OverlayResolver::new(tree, store).resolve_effective_items(scenario)
    })
    .map(|view| view.items.len())
    .unwrap()
}

#[test]
fn unchanged_chain_hits() {
    let (tree, store) = fixture();
    let plan = ScenarioId::from("plan");
    let mut memo = Memo::new();

    assert_eq!(cached_len(&mut memo, &tree, &store, &plan), 1);
    assert_eq!(cached_len(&mut memo, &tree, &store, &plan), 1);
    assert_eq!(memo.stats().hits, 1);
    assert_eq!(memo.stats().misses, 1);
}

#[test]
fn ancestor_delta_misses() {
    let (tree, mut store) = fixture();
    let plan = ScenarioId::from("plan");
    let mut memo = Memo::new();
    assert_eq!(cached_len(&mut memo, &tree, &store, &plan), 1);

    store.record(&"base".into(), ItemDelta::Tombstone { id: "k1".into() });
    assert_eq!(cached_len(&mut memo, &tree, &store, &plan), 0);
    assert_eq!(memo.stats().misses, 2);
}

#[test]
fn ancestor_record_edit_changes_key() {
    let (mut tree, store) = fixture();
    let plan = ScenarioId::from("plan");
    let before = view_key(&tree, &store, &plan);

    tree.update(
        &"base".into(),
        &ScenarioPatch {
            remark: Some("geändert".to_string()),
            ..ScenarioPatch::default()
        },
    )
    .unwrap();
    assert_ne!(before, view_key(&tree, &store, &plan));
}

#[test]
fn unrelated_scenario_edit_keeps_key() {
    let (tree, mut store) = fixture();
    let plan = ScenarioId::from("plan");
    let before = view_key(&tree, &store, &plan);

    let item = DataItem::new("m1", ItemKind::Capacity, "Frau Huber");
    store.record(&"side".into(), ItemDelta::Add { item });
    assert_eq!(before, view_key(&tree, &store, &plan));
}

#[test]
fn unknown_scenario_error_is_not_cached() {
    let (tree, store) = fixture();
    let ghost = ScenarioId::from("ghost");
    let mut memo: Memo<EffectiveView> = Memo::new();
    let key = compute_cache_key(&CacheQuery::new(QueryKind::EffectiveItems, &ghost), &[]);
    let result = memo.get_or_try_insert_with(key, || {
        OverlayResolver::new(&tree, &store).resolve_effective_items(&ghost)
    });
    assert!(matches!(result, Err(TreeError::UnknownScenario(_))));
    assert!(memo.is_empty());
}
