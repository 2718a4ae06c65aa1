//! Grant Service
//!
//! Read-only view of the provisioned permission model.

use relay_core::domain::grant::{Grant, Principal};

use crate::state::AppState;

/// List grants, optionally only those of one principal
///
/// `principal` uses the display form, e.g. `code-deployer:migration`.
pub fn list_grants(state: &AppState, principal: Option<&str>) -> Result<Vec<Grant>, String> {
    match principal {
        Some(name) => {
            let principal = name.parse::<Principal>()?;
            Ok(state.permissions.grants_for(principal).into_iter().collect())
        }
        None => Ok(state.permissions.all_grants()),
    }
}
