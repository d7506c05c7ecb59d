//! The session owns a loaded plan and is the only way to change it.
//!
//! Reads of effective views and charts go through per-query memo tables
//! keyed by the ancestor chain's revision stamps.

use chrono::NaiveDate;
use kp_core::{format_iso, ItemId, ScenarioId, NO_GROUP_ID, NO_QUALIFICATION_KEY};
use kp_project::{
    validate_plan, DataItem, GroupDef, ItemDelta, ItemKind, PlanFile, PlannerSettings,
    QualificationDef, RegulationDef, Scenario, ScenarioDraft, ScenarioPatch, TimeDimension,
    LATEST_VERSION,
};
use kp_results::{compute_cache_key, CacheQuery, CacheStats, Memo, QueryKind};
use kp_scenario::{
    DeleteOutcome, EffectiveView, MemoryStore, OverlayResolver, ScenarioTree, TreeError,
};
use kp_timeline::{
    aggregate_with, extract_dates_of_interest, weekly_profile, ChartData, DateOfInterest,
    Regulation, WeekdayHours,
};

use crate::chart_state::{ChartFilterState, FilterOptions};
use crate::error::{AppError, AppResult};

type Resolver<'a> = OverlayResolver<'a, MemoryStore>;
type ChainStamp = (ScenarioId, u64, u64);

#[derive(Debug, Default)]
struct ResultCache {
    views: Memo<EffectiveView>,
    charts: Memo<ChartData>,
    dates: Memo<Vec<DateOfInterest>>,
    profiles: Memo<Vec<WeekdayHours>>,
}

impl ResultCache {
    fn clear_derived(&mut self) {
        self.charts.clear();
        self.profiles.clear();
    }
}

#[derive(Debug)]
pub struct Session {
    pub name: String,
    settings: PlannerSettings,
    tree: ScenarioTree,
    store: MemoryStore,
    pub filters: ChartFilterState,
    cache: ResultCache,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        let settings = PlannerSettings::default();
        Self {
            name: name.into(),
            filters: ChartFilterState::new(settings.default_dimension),
            settings,
            tree: ScenarioTree::new(),
            store: MemoryStore::new(),
            cache: ResultCache::default(),
        }
    }

    pub fn from_plan(plan: PlanFile) -> AppResult<Self> {
        validate_plan(&plan)?;
        let mut tree = ScenarioTree::from_scenarios(plan.scenarios)?;
        tree.restore_selection(plan.selected_scenario_id.as_ref());
        tracing::debug!(name = %plan.name, scenarios = tree.len(), "session opened");
        Ok(Self {
            name: plan.name,
            filters: ChartFilterState::new(plan.settings.default_dimension),
            settings: plan.settings,
            tree,
            store: MemoryStore::from_defs(plan.stores),
            cache: ResultCache::default(),
        })
    }

    pub fn to_plan(&self) -> PlanFile {
        PlanFile {
            version: LATEST_VERSION,
            name: self.name.clone(),
            settings: self.settings.clone(),
            scenarios: self.tree.to_scenarios(),
            selected_scenario_id: self.tree.selected().cloned(),
            stores: self.store.to_defs(),
        }
    }

    pub fn tree(&self) -> &ScenarioTree {
        &self.tree
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    fn resolver(&self) -> Resolver<'_> {
        OverlayResolver::new(&self.tree, &self.store)
    }

    fn require_scenario(&self, scenario: &ScenarioId) -> AppResult<()> {
        if self.tree.contains(scenario) {
            Ok(())
        } else {
            Err(TreeError::UnknownScenario(scenario.clone()).into())
        }
    }

    // ---- scenarios ----

    pub fn scenario(&self, id: &ScenarioId) -> AppResult<&Scenario> {
        self.tree
            .get(id)
            .ok_or_else(|| TreeError::UnknownScenario(id.clone()).into())
    }

    /// Add a scenario, give it an empty store and select it.
    pub fn add_scenario(&mut self, draft: ScenarioDraft) -> AppResult<ScenarioId> {
        let id = self.tree.add(draft)?;
        self.store.ensure_scenario(&id);
        tracing::debug!(scenario = %id, "added scenario");
        Ok(id)
    }

    pub fn update_scenario(&mut self, id: &ScenarioId, patch: &ScenarioPatch) -> AppResult<()> {
        Ok(self.tree.update(id, patch)?)
    }

    /// Delete a scenario with all descendants and their private data.
    pub fn delete_scenario(&mut self, id: &ScenarioId) -> AppResult<DeleteOutcome> {
        Ok(self.tree.delete(id, &mut self.store)?)
    }

    pub fn select_scenario(&mut self, id: &ScenarioId) -> AppResult<()> {
        Ok(self.tree.select(id)?)
    }

    pub fn selected_scenario(&self) -> AppResult<&ScenarioId> {
        self.tree.selected().ok_or(AppError::NoScenarioSelected)
    }

    pub fn ancestors(&self, id: &ScenarioId) -> AppResult<Vec<ScenarioId>> {
        Ok(self.tree.ancestors(id)?)
    }

    pub fn descendants(&self, id: &ScenarioId) -> AppResult<Vec<ScenarioId>> {
        Ok(self.tree.descendants(id)?.into_iter().collect())
    }

    // ---- items ----

    /// Append deltas to a scenario's own store.
    pub fn record_deltas(
        &mut self,
        scenario: &ScenarioId,
        deltas: impl IntoIterator<Item = ItemDelta>,
    ) -> AppResult<()> {
        self.require_scenario(scenario)?;
        for delta in deltas {
            self.store.record(scenario, delta);
        }
        Ok(())
    }

    /// Add an item to `scenario`; an empty id is replaced by a fresh one.
    pub fn add_item(&mut self, scenario: &ScenarioId, mut item: DataItem) -> AppResult<ItemId> {
        if item.id.as_str().is_empty() {
            item.id = ItemId::generate();
        }
        let id = item.id.clone();
        self.record_deltas(scenario, [ItemDelta::Add { item }])?;
        Ok(id)
    }

    /// Add a blank manually entered item.
    pub fn new_manual_item(&mut self, scenario: &ScenarioId, kind: ItemKind) -> AppResult<ItemId> {
        let name = match kind {
            ItemKind::Demand => "Neues Kind",
            ItemKind::Capacity => "Neuer Mitarbeiter",
        };
        self.add_item(scenario, DataItem::new(ItemId::generate(), kind, name))
    }

    fn require_live_item(&self, scenario: &ScenarioId, item: &ItemId) -> AppResult<()> {
        match self.resolver().get_effective_item(scenario, item)? {
            Some(_) => Ok(()),
            None => Err(AppError::ItemNotFound {
                scenario: scenario.clone(),
                item: item.clone(),
            }),
        }
    }

    /// Overwrite an item visible in `scenario`, wherever it was added.
    pub fn update_item(&mut self, scenario: &ScenarioId, item: DataItem) -> AppResult<()> {
        self.require_live_item(scenario, &item.id)?;
        self.record_deltas(scenario, [ItemDelta::Edit { item }])
    }

    /// Remove an item from `scenario` and its descendants.
    pub fn delete_item(&mut self, scenario: &ScenarioId, item: &ItemId) -> AppResult<()> {
        self.require_live_item(scenario, item)?;
        self.record_deltas(scenario, [ItemDelta::Tombstone { id: item.clone() }])
    }

    // ---- catalogs and settings ----

    pub fn set_groups(&mut self, scenario: &ScenarioId, groups: Vec<GroupDef>) -> AppResult<()> {
        self.require_scenario(scenario)?;
        if groups.iter().any(|g| g.id == NO_GROUP_ID) {
            return Err(AppError::InvalidInput(format!(
                "group id '{}' is reserved",
                NO_GROUP_ID
            )));
        }
        self.store.set_groups(scenario, groups);
        Ok(())
    }

    pub fn set_qualifications(
        &mut self,
        scenario: &ScenarioId,
        qualifications: Vec<QualificationDef>,
    ) -> AppResult<()> {
        self.require_scenario(scenario)?;
        if qualifications.iter().any(|q| q.key == NO_QUALIFICATION_KEY) {
            return Err(AppError::InvalidInput(format!(
                "qualification key '{}' is reserved",
                NO_QUALIFICATION_KEY
            )));
        }
        self.store.set_qualifications(scenario, qualifications);
        Ok(())
    }

    pub fn effective_groups(&self, scenario: &ScenarioId) -> AppResult<Vec<GroupDef>> {
        Ok(self.resolver().effective_groups(scenario)?)
    }

    pub fn effective_qualifications(
        &self,
        scenario: &ScenarioId,
    ) -> AppResult<Vec<QualificationDef>> {
        Ok(self.resolver().effective_qualifications(scenario)?)
    }

    /// Replace the regulation thresholds. Cached charts are dropped since
    /// their keys do not cover settings.
    pub fn set_regulation(&mut self, regulation: RegulationDef) -> AppResult<()> {
        if !regulation.required_ratio.is_finite() || regulation.required_ratio <= 0.0 {
            return Err(AppError::InvalidInput(format!(
                "required ratio must be positive, got {}",
                regulation.required_ratio
            )));
        }
        if !(0.0..=100.0).contains(&regulation.min_specialist_quota_percent) {
            return Err(AppError::InvalidInput(format!(
                "specialist quota must be within 0..=100, got {}",
                regulation.min_specialist_quota_percent
            )));
        }
        self.settings.regulation = regulation;
        self.cache.clear_derived();
        Ok(())
    }

    pub fn regulation_for(&self, scenario: &ScenarioId) -> AppResult<Regulation> {
        let qualifications = self.effective_qualifications(scenario)?;
        Ok(Regulation::from_settings(&self.settings.regulation, &qualifications))
    }

    // ---- cached reads ----

    pub fn effective_view(&mut self, scenario: &ScenarioId) -> AppResult<&EffectiveView> {
        let resolver = OverlayResolver::new(&self.tree, &self.store);
        let stamps = resolver.chain_stamps(scenario)?;
        cached_view(&mut self.cache.views, &resolver, scenario, &stamps)
    }

    /// Effective items of `scenario`, ordered by id.
    pub fn effective_items(&mut self, scenario: &ScenarioId) -> AppResult<Vec<DataItem>> {
        Ok(self.effective_view(scenario)?.items.values().cloned().collect())
    }

    pub fn effective_item(
        &mut self,
        scenario: &ScenarioId,
        item: &ItemId,
    ) -> AppResult<Option<DataItem>> {
        Ok(self.effective_view(scenario)?.get(item).cloned())
    }

    pub fn chart(
        &mut self,
        scenario: &ScenarioId,
        dimension: TimeDimension,
        groups: &[String],
        qualifications: &[String],
    ) -> AppResult<&ChartData> {
        let resolver = OverlayResolver::new(&self.tree, &self.store);
        let stamps = resolver.chain_stamps(scenario)?;
        let key = compute_cache_key(
            &CacheQuery::new(QueryKind::Chart, scenario)
                .with_dimension(dimension)
                .with_filter(groups, qualifications),
            &stamps,
        );
        let views = &mut self.cache.views;
        let settings = &self.settings;
        Ok(self.cache.charts.get_or_try_insert_with(key, || -> AppResult<ChartData> {
            let regulation = Regulation::from_settings(
                &settings.regulation,
                &resolver.effective_qualifications(scenario)?,
            );
            let view = cached_view(views, &resolver, scenario, &stamps)?;
            let items: Vec<DataItem> = view.items.values().cloned().collect();
            Ok(aggregate_with(&items, dimension, groups, qualifications, &regulation))
        })?)
    }

    pub fn dates_of_interest(
        &mut self,
        scenario: &ScenarioId,
        reference: NaiveDate,
    ) -> AppResult<&[DateOfInterest]> {
        let resolver = OverlayResolver::new(&self.tree, &self.store);
        let stamps = resolver.chain_stamps(scenario)?;
        let key = compute_cache_key(
            &CacheQuery::new(QueryKind::DatesOfInterest, scenario)
                .with_reference(format_iso(reference)),
            &stamps,
        );
        let views = &mut self.cache.views;
        let dates = self.cache.dates.get_or_try_insert_with(key, || -> AppResult<_> {
            let view = cached_view(views, &resolver, scenario, &stamps)?;
            Ok(extract_dates_of_interest(view.items.values(), reference))
        })?;
        Ok(dates.as_slice())
    }

    pub fn weekly_profile(
        &mut self,
        scenario: &ScenarioId,
        reference: NaiveDate,
        groups: &[String],
        qualifications: &[String],
    ) -> AppResult<&[WeekdayHours]> {
        let resolver = OverlayResolver::new(&self.tree, &self.store);
        let stamps = resolver.chain_stamps(scenario)?;
        let key = compute_cache_key(
            &CacheQuery::new(QueryKind::WeeklyProfile, scenario)
                .with_filter(groups, qualifications)
                .with_reference(format_iso(reference)),
            &stamps,
        );
        let views = &mut self.cache.views;
        let profile = self.cache.profiles.get_or_try_insert_with(key, || -> AppResult<_> {
            let view = cached_view(views, &resolver, scenario, &stamps)?;
            let items: Vec<DataItem> = view.items.values().cloned().collect();
            Ok(weekly_profile(&items, reference, groups, qualifications))
        })?;
        Ok(profile.as_slice())
    }

    /// Filter values offered for `scenario`, sentinels included.
    pub fn filter_options(&mut self, scenario: &ScenarioId) -> AppResult<FilterOptions> {
        let groups = self.effective_groups(scenario)?;
        let qualifications = self.effective_qualifications(scenario)?;
        let view = self.effective_view(scenario)?;
        Ok(FilterOptions::from_catalogs(&groups, &qualifications, view.items.values()))
    }

    /// Combined statistics of all memo tables.
    pub fn cache_stats(&self) -> CacheStats {
        [
            self.cache.views.stats(),
            self.cache.charts.stats(),
            self.cache.dates.stats(),
            self.cache.profiles.stats(),
        ]
        .into_iter()
        .fold(CacheStats::default(), |acc, s| CacheStats {
            hits: acc.hits + s.hits,
            misses: acc.misses + s.misses,
            entries: acc.entries + s.entries,
        })
    }
}

fn cached_view<'c>(
    views: &'c mut Memo<EffectiveView>,
    resolver: &Resolver<'_>,
    scenario: &ScenarioId,
    stamps: &[ChainStamp],
) -> AppResult<&'c EffectiveView> {
    let key = compute_cache_key(&CacheQuery::new(QueryKind::EffectiveItems, scenario), stamps);
    Ok(views.get_or_try_insert_with(key, || resolver.resolve_effective_items(scenario))?)
}
