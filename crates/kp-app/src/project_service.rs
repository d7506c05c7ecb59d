//! Plan loading, saving, validation, and introspection.

use std::path::Path;

use kp_core::ScenarioId;
use kp_project::{PlanFile, ProjectError};
use kp_scenario::DataStore;

use crate::error::{AppError, AppResult};
use crate::session::Session;

/// Summary of a scenario for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSummary {
    pub id: ScenarioId,
    pub name: String,
    pub depth: usize,
    pub base_scenario_id: Option<ScenarioId>,
    pub confidence: u8,
    pub likelihood: u8,
    pub desirability: u8,
    /// Deltas the scenario itself owns, not counting ancestors.
    pub own_deltas: usize,
    pub selected: bool,
}

/// Load a plan file (YAML or JSON by extension), migrate and validate it.
pub fn load_plan_file(path: &Path) -> AppResult<PlanFile> {
    kp_project::load_plan(path).map_err(|err| match err {
        ProjectError::Io(source) => AppError::PlanFileRead {
            path: path.to_path_buf(),
            source,
        },
        other => other.into(),
    })
}

pub fn load_session(path: &Path) -> AppResult<Session> {
    Session::from_plan(load_plan_file(path)?)
}

/// Save the session's plan; the format follows the extension.
pub fn save_session(path: &Path, session: &Session) -> AppResult<()> {
    kp_project::save_plan(path, &session.to_plan()).map_err(|err| match err {
        ProjectError::Io(source) => AppError::PlanFileWrite {
            path: path.to_path_buf(),
            source,
        },
        other => other.into(),
    })
}

/// Validate structure plus the ancestor chain of every scenario.
pub fn validate_session(session: &Session) -> AppResult<()> {
    kp_project::validate_plan(&session.to_plan())?;
    for scenario in session.tree().iter() {
        session.ancestors(&scenario.id)?;
    }
    Ok(())
}

/// Scenarios in tree order (parents before children).
pub fn list_scenarios(session: &Session) -> Vec<ScenarioSummary> {
    let selected = session.tree().selected();
    session
        .tree()
        .tree_view()
        .into_iter()
        .filter_map(|row| {
            let scenario = session.tree().get(&row.id)?;
            Some(ScenarioSummary {
                id: row.id.clone(),
                name: scenario.name.clone(),
                depth: row.depth,
                base_scenario_id: scenario.base_scenario_id.clone(),
                confidence: scenario.confidence,
                likelihood: scenario.likelihood,
                desirability: scenario.desirability,
                own_deltas: session.store().deltas(&row.id).len(),
                selected: selected == Some(&row.id),
            })
        })
        .collect()
}

/// Resolve a scenario argument: an id, or failing that a unique name.
pub fn find_scenario(session: &Session, id_or_name: &str) -> AppResult<ScenarioId> {
    let id = ScenarioId::from(id_or_name);
    if session.tree().contains(&id) {
        return Ok(id);
    }
    let mut by_name = session.tree().iter().filter(|s| s.name == id_or_name);
    match (by_name.next(), by_name.next()) {
        (Some(scenario), None) => Ok(scenario.id.clone()),
        (Some(_), Some(_)) => Err(AppError::InvalidInput(format!(
            "scenario name '{}' is ambiguous, use the id",
            id_or_name
        ))),
        (None, _) => Err(kp_scenario::TreeError::UnknownScenario(id).into()),
    }
}
