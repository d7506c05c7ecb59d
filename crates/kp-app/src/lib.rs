//! Shared application service layer for the Kita planner.
//!
//! The CLI drives everything through a [`Session`]: scenario and item
//! changes, imports, chart filter selections, and cached chart reads.

pub mod chart_state;
pub mod error;
pub mod import;
pub mod project_service;
pub mod session;

// Re-export key types for convenience
pub use chart_state::{
    ChartFilterState, ChartToggle, FilterOptions, NO_GROUP_LABEL, NO_QUALIFICATION_LABEL,
};
pub use error::{AppError, AppResult};
pub use import::{import_bundle, load_bundle, ImportBundle, ImportReport};
pub use project_service::{
    find_scenario, list_scenarios, load_plan_file, load_session, save_session, validate_session,
    ScenarioSummary,
};
pub use session::Session;
