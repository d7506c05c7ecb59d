//! Plan file validation logic.

use std::collections::{HashMap, HashSet};

use crate::schema::{PlanFile, ScenarioStoreDef};
use kp_core::ScenarioId;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Scenario {id} is its own ancestor")]
    CycleDetected { id: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_plan(plan: &PlanFile) -> Result<(), ValidationError> {
    if plan.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: plan.version,
        });
    }

    let mut scenario_ids = HashSet::new();
    for scenario in &plan.scenarios {
        if !scenario_ids.insert(&scenario.id) {
            return Err(ValidationError::DuplicateId {
                id: scenario.id.to_string(),
                context: "scenarios".to_string(),
            });
        }
        for (field, value) in [
            ("confidence", scenario.confidence),
            ("likelihood", scenario.likelihood),
            ("desirability", scenario.desirability),
        ] {
            if value > 100 {
                return Err(ValidationError::InvalidValue {
                    field: format!("scenario '{}' {}", scenario.id, field),
                    value: value.to_string(),
                    reason: "ratings range from 0 to 100".to_string(),
                });
            }
        }
    }

    let parents: HashMap<&ScenarioId, Option<&ScenarioId>> = plan
        .scenarios
        .iter()
        .map(|s| (&s.id, s.base_scenario_id.as_ref()))
        .collect();

    for scenario in &plan.scenarios {
        if let Some(base) = &scenario.base_scenario_id {
            if !scenario_ids.contains(base) {
                return Err(ValidationError::MissingReference {
                    id: base.to_string(),
                    context: format!("scenario '{}' baseScenarioId", scenario.id),
                });
            }
        }
        check_acyclic(&scenario.id, &parents)?;
    }

    if let Some(selected) = &plan.selected_scenario_id {
        if !scenario_ids.contains(selected) {
            return Err(ValidationError::MissingReference {
                id: selected.to_string(),
                context: "selected_scenario_id".to_string(),
            });
        }
    }

    for (scenario_id, store) in &plan.stores {
        if !scenario_ids.contains(scenario_id) {
            return Err(ValidationError::MissingReference {
                id: scenario_id.to_string(),
                context: "stores".to_string(),
            });
        }
        validate_store(scenario_id, store)?;
    }

    let regulation = &plan.settings.regulation;
    if !(regulation.required_ratio.is_finite() && regulation.required_ratio > 0.0) {
        return Err(ValidationError::InvalidValue {
            field: "settings.regulation.required_ratio".to_string(),
            value: regulation.required_ratio.to_string(),
            reason: "must be a positive number".to_string(),
        });
    }
    if !(0.0..=100.0).contains(&regulation.min_specialist_quota_percent) {
        return Err(ValidationError::InvalidValue {
            field: "settings.regulation.min_specialist_quota_percent".to_string(),
            value: regulation.min_specialist_quota_percent.to_string(),
            reason: "must be within 0..=100".to_string(),
        });
    }

    Ok(())
}

/// Walk the base links from `start`; bounded by the number of scenarios.
fn check_acyclic(
    start: &ScenarioId,
    parents: &HashMap<&ScenarioId, Option<&ScenarioId>>,
) -> Result<(), ValidationError> {
    let mut visited = HashSet::new();
    let mut current = Some(start);
    while let Some(id) = current {
        if !visited.insert(id) {
            return Err(ValidationError::CycleDetected { id: id.to_string() });
        }
        current = parents.get(id).copied().flatten();
    }
    Ok(())
}

fn validate_store(
    scenario_id: &ScenarioId,
    store: &ScenarioStoreDef,
) -> Result<(), ValidationError> {
    let mut group_ids = HashSet::new();
    for group in &store.groups {
        if !group_ids.insert(&group.id) {
            return Err(ValidationError::DuplicateId {
                id: group.id.clone(),
                context: format!("scenario '{}' groups", scenario_id),
            });
        }
        if group.id == kp_core::NO_GROUP_ID {
            return Err(ValidationError::InvalidValue {
                field: format!("scenario '{}' group id", scenario_id),
                value: group.id.clone(),
                reason: "'0' is reserved for items without a group".to_string(),
            });
        }
    }

    let mut qualification_keys = HashSet::new();
    for qualification in &store.qualifications {
        if !qualification_keys.insert(&qualification.key) {
            return Err(ValidationError::DuplicateId {
                id: qualification.key.clone(),
                context: format!("scenario '{}' qualifications", scenario_id),
            });
        }
        if qualification.key == kp_core::NO_QUALIFICATION_KEY {
            return Err(ValidationError::InvalidValue {
                field: format!("scenario '{}' qualification key", scenario_id),
                value: qualification.key.clone(),
                reason: "'0' is reserved for staff without a qualification".to_string(),
            });
        }
    }

    for delta in &store.deltas {
        if delta.item_id().as_str().trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("scenario '{}' delta item id", scenario_id),
                value: String::new(),
                reason: "item ids must not be empty".to_string(),
            });
        }
    }

    Ok(())
}
