//! Content-based cache keys.

use kp_core::ScenarioId;
use kp_project::TimeDimension;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// What a cached value was derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    EffectiveItems,
    Chart,
    DatesOfInterest,
    WeeklyProfile,
}

/// Query half of a cache key. Filter selections are sorted and deduplicated,
/// so the order in which groups were picked does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheQuery<'a> {
    pub kind: QueryKind,
    pub scenario: &'a ScenarioId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<TimeDimension>,
    pub groups: Vec<&'a str>,
    pub qualifications: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl<'a> CacheQuery<'a> {
    pub fn new(kind: QueryKind, scenario: &'a ScenarioId) -> Self {
        Self {
            kind,
            scenario,
            dimension: None,
            groups: Vec::new(),
            qualifications: Vec::new(),
            reference: None,
        }
    }

    pub fn with_dimension(mut self, dimension: TimeDimension) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_filter(mut self, groups: &'a [String], qualifications: &'a [String]) -> Self {
        self.groups = normalized(groups);
        self.qualifications = normalized(qualifications);
        self
    }

    /// Reference day as an ISO date string.
    pub fn with_reference(mut self, iso: impl Into<String>) -> Self {
        self.reference = Some(iso.into());
        self
    }
}

fn normalized(values: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = values.iter().map(String::as_str).collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 over the query and the `(scenario, record revision, store
/// revision)` stamps of the ancestor chain.
pub fn compute_cache_key(
    query: &CacheQuery<'_>,
    chain_stamps: &[(ScenarioId, u64, u64)],
) -> CacheKey {
    let mut hasher = Sha256::new();

    let query_json = serde_json::to_string(query).unwrap_or_default();
    hasher.update(query_json.as_bytes());

    for (scenario, record, store) in chain_stamps {
        hasher.update(scenario.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(record.to_le_bytes());
        hasher.update(store.to_le_bytes());
    }

    CacheKey(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamps() -> Vec<(ScenarioId, u64, u64)> {
        vec![("base".into(), 1, 2), ("plan".into(), 3, 4)]
    }

    #[test]
    fn hash_stability() {
        let scenario = ScenarioId::from("plan");
        let query = CacheQuery::new(QueryKind::EffectiveItems, &scenario);
        assert_eq!(
            compute_cache_key(&query, &stamps()),
            compute_cache_key(&query, &stamps())
        );
    }

    #[test]
    fn selection_order_is_irrelevant() {
        let scenario = ScenarioId::from("plan");
        let a = vec!["g2".to_string(), "g1".to_string(), "g1".to_string()];
        let b = vec!["g1".to_string(), "g2".to_string()];
        let quals: Vec<String> = Vec::new();
        let qa = CacheQuery::new(QueryKind::Chart, &scenario).with_filter(&a, &quals);
        let qb = CacheQuery::new(QueryKind::Chart, &scenario).with_filter(&b, &quals);
        assert_eq!(compute_cache_key(&qa, &stamps()), compute_cache_key(&qb, &stamps()));
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let scenario = ScenarioId::from("plan");
        let chart = CacheQuery::new(QueryKind::Chart, &scenario);
        let month = chart.clone().with_dimension(TimeDimension::Month);
        let week = chart.with_dimension(TimeDimension::Week);
        assert_ne!(compute_cache_key(&month, &stamps()), compute_cache_key(&week, &stamps()));

        let mut bumped = stamps();
        bumped[0].2 += 1;
        assert_ne!(compute_cache_key(&month, &stamps()), compute_cache_key(&month, &bumped));

        let items = CacheQuery::new(QueryKind::EffectiveItems, &scenario);
        let dates =
            CacheQuery::new(QueryKind::DatesOfInterest, &scenario).with_reference("2025-01-01");
        assert_ne!(compute_cache_key(&items, &stamps()), compute_cache_key(&dates, &stamps()));
    }
}
