//! Grant API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use relay_core::domain::grant::Grant;
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::service::grant_service;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GrantQuery {
    pub principal: Option<String>,
}

/// GET /grants
///
/// Query parameters:
/// - `principal` (optional): only grants of this principal, e.g. `build-project`
pub async fn list_grants(
    State(state): State<AppState>,
    Query(query): Query<GrantQuery>,
) -> ApiResult<Json<Vec<Grant>>> {
    let grants = grant_service::list_grants(&state, query.principal.as_deref())
        .map_err(ApiError::BadRequest)?;

    Ok(Json(grants))
}
