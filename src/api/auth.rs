use std::sync::Arc;

use axum::extract::State;
use serde::Deserialize;

use super::extract::Json;
use super::{check_rate, envelope, ApiError, ApiResult};
use crate::ratelimit::RateAction;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    pub identifier: String,
}

/// Credential checking lives elsewhere; this endpoint only throttles
/// attempts per identifier and acknowledges the rest.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> ApiResult {
    if body.identifier.trim().is_empty() {
        return Err(ApiError::BadRequest("identifier is required".to_string()));
    }

    check_rate(&state, &body.identifier, RateAction::Login)?;

    Ok(envelope("identifier", body.identifier))
}
