//! kp-scenario: scenario forest, per-scenario delta stores and overlay
//! resolution.
//!
//! Provides:
//! - `ScenarioTree`: scenario records, base links, selection, cascading delete
//! - `DataStore` / `MemoryStore`: each scenario's private deltas and catalogs
//! - `OverlayResolver`: the effective item view of a scenario
//!
//! # Example
//!
//! ```
//! use kp_project::{DataItem, ItemDelta, ItemKind, Scenario};
//! use kp_scenario::{MemoryStore, OverlayResolver, ScenarioTree};
//!
//! let mut tree = ScenarioTree::new();
//! tree.insert(Scenario::new("base", "Ist")).unwrap();
//! tree.insert(Scenario::new("plan", "Plan").based_on("base")).unwrap();
//!
//! let mut store = MemoryStore::new();
//! let item = DataItem::new("k1", ItemKind::Demand, "Mia");
//! store.record(&"base".into(), ItemDelta::Add { item });
//! store.record(&"plan".into(), ItemDelta::Tombstone { id: "k1".into() });
//!
//! let resolver = OverlayResolver::new(&tree, &store);
//! assert_eq!(resolver.resolve_effective_items(&"base".into()).unwrap().items.len(), 1);
//! assert!(resolver.resolve_effective_items(&"plan".into()).unwrap().items.is_empty());
//! ```

pub mod error;
pub mod overlay;
pub mod store;
pub mod tree;

// Re-exports for ergonomics
pub use error::{TreeError, TreeResult};
pub use overlay::{apply_delta, fold_deltas, EffectiveItems, EffectiveView, OverlayResolver};
pub use store::{DataStore, MemoryStore};
pub use tree::{AncestorChain, ChainWarning, DeleteOutcome, ScenarioTree, TreeRow};
