//! Schema migration framework.

use crate::ProjectError;
use crate::schema::PlanFile;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut plan: PlanFile) -> Result<PlanFile, ProjectError> {
    while plan.version < LATEST_VERSION {
        plan = migrate_one_version(plan)?;
    }
    Ok(plan)
}

fn migrate_one_version(plan: PlanFile) -> Result<PlanFile, ProjectError> {
    match plan.version {
        0 => migrate_v0_to_v1(plan),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 files were written by an editor that did not bound the rating
/// sliders and could leave a scenario pointing at itself.
fn migrate_v0_to_v1(mut plan: PlanFile) -> Result<PlanFile, ProjectError> {
    for scenario in &mut plan.scenarios {
        scenario.confidence = scenario.confidence.min(100);
        scenario.likelihood = scenario.likelihood.min(100);
        scenario.desirability = scenario.desirability.min(100);
        if scenario.base_scenario_id.as_ref() == Some(&scenario.id) {
            scenario.base_scenario_id = None;
        }
    }

    plan.version = 1;
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Scenario;

    #[test]
    fn v0_ratings_are_clamped_and_self_links_dropped() {
        let mut plan = PlanFile::new("old");
        plan.version = 0;
        let mut s = Scenario::new("a", "A").based_on("a");
        s.confidence = 180;
        plan.scenarios.push(s);

        let migrated = migrate_to_latest(plan).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
        assert_eq!(migrated.scenarios[0].confidence, 100);
        assert!(migrated.scenarios[0].is_root());
    }

    #[test]
    fn latest_is_untouched() {
        let plan = PlanFile::new("new");
        assert_eq!(migrate_to_latest(plan.clone()).unwrap(), plan);
    }
}
