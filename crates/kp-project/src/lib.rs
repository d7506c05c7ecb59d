//! kp-project: canonical plan file format and validation.

pub mod migrate;
pub mod schema;
pub mod validate;

pub use migrate::{migrate_to_latest, LATEST_VERSION};
pub use schema::*;
pub use validate::{validate_plan, ValidationError};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<PlanFile> {
    let content = std::fs::read_to_string(path)?;
    let mut plan: PlanFile = serde_yaml::from_str(&content)?;
    plan = migrate_to_latest(plan)?;
    validate_plan(&plan)?;
    Ok(plan)
}

pub fn save_yaml(path: &std::path::Path, plan: &PlanFile) -> ProjectResult<()> {
    validate_plan(plan)?;
    let content = serde_yaml::to_string(plan)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<PlanFile> {
    let content = std::fs::read_to_string(path)?;
    let mut plan: PlanFile = serde_json::from_str(&content)?;
    plan = migrate_to_latest(plan)?;
    validate_plan(&plan)?;
    Ok(plan)
}

pub fn save_json(path: &std::path::Path, plan: &PlanFile) -> ProjectResult<()> {
    validate_plan(plan)?;
    let content = serde_json::to_string_pretty(plan)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` is JSON, anything else YAML.
pub fn load_plan(path: &std::path::Path) -> ProjectResult<PlanFile> {
    if is_json(path) {
        load_json(path)
    } else {
        load_yaml(path)
    }
}

/// Save by extension: `.json` is JSON, anything else YAML.
pub fn save_plan(path: &std::path::Path, plan: &PlanFile) -> ProjectResult<()> {
    if is_json(path) {
        save_json(path, plan)
    } else {
        save_yaml(path, plan)
    }
}

fn is_json(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
