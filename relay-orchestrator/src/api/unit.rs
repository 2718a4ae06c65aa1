//! Unit API Handlers

use axum::{Json, extract::State};
use relay_core::domain::unit::ComputeUnit;

use crate::api::error::ApiResult;
use crate::service::unit_service;
use crate::state::AppState;

/// GET /unit/list
/// Current code version and profile of every release target
pub async fn list_units(State(state): State<AppState>) -> ApiResult<Json<Vec<ComputeUnit>>> {
    let units = unit_service::list_units(&state).await?;

    Ok(Json(units))
}
