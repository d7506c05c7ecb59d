//! Scenario tree errors.

use kp_core::ScenarioId;
use thiserror::Error;

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Scenario not found: {0}")]
    UnknownScenario(ScenarioId),

    #[error("Scenario already exists: {0}")]
    DuplicateScenario(ScenarioId),

    /// The base chain revisits `at`.
    #[error("Cycle in base chain of {scenario} at {at}")]
    Cycle { scenario: ScenarioId, at: ScenarioId },

    /// The base chain points at a scenario that does not exist.
    #[error("Broken base chain of {scenario}: {missing} does not exist")]
    BrokenChain {
        scenario: ScenarioId,
        missing: ScenarioId,
    },

    #[error("Basing {scenario} on {base} would make it its own ancestor")]
    WouldCreateCycle { scenario: ScenarioId, base: ScenarioId },
}
