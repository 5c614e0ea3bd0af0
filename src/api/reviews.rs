use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::Json;
use super::{actor, check_rate, envelope, require, ApiError, ApiResult};
use crate::entities::ReviewTarget;
use crate::permissions::Capability;
use crate::ratelimit::RateAction;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub target: ReviewTarget,
    pub rating: u8,
    #[serde(default)]
    pub body: String,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SubmitBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ReviewCreate)?;
    check_rate(&state, &actor.id, RateAction::ReviewCreate)?;

    let review = state
        .handler
        .submit_review(&actor.id, body.target, body.rating, body.body)
        .await?;

    Ok(envelope("review", review))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub kind: String,
    pub id: Uuid,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let target = match params.kind.as_str() {
        "product" => ReviewTarget::Product(params.id),
        "service" => ReviewTarget::Service(params.id),
        other => {
            return Err(ApiError::BadRequest(format!(
                "unknown review target kind: {}",
                other
            )))
        }
    };

    let reviews = state.handler.list_reviews(target).await?;

    Ok(envelope("reviews", reviews))
}

pub async fn mark_helpful(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;

    let review = state.handler.mark_review_helpful(&actor.id, id).await?;

    Ok(envelope("review", review))
}
