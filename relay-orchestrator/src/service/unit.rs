//! Unit Service
//!
//! Reports the current state of the three release targets.

use relay_core::domain::unit::{ComputeUnit, UnitRole};
use relay_engine::registry::RegistryError;

use crate::state::AppState;

/// Current state of the application, migration and cleanup units
pub async fn list_units(state: &AppState) -> Result<Vec<ComputeUnit>, RegistryError> {
    let mut units = Vec::with_capacity(UnitRole::ALL.len());
    for role in UnitRole::ALL {
        units.push(state.registry.get_unit(state.targets.name_for(role)).await?);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;

    #[tokio::test]
    async fn test_lists_release_targets() {
        let state = testing::state();

        let units = list_units(&state).await.unwrap();
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["DeployedLambda", "MigrationLambda", "CleanUpLambda"]);
        assert!(units.iter().all(|u| u.code_version.is_none()));
    }
}
