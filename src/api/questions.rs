use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::Json;
use super::{actor, check_rate, envelope, ApiResult};
use crate::ratelimit::RateAction;
use crate::repositories::QuestionQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskBody {
    pub body: String,
}

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AskBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    check_rate(&state, &actor.id, RateAction::QuestionCreate)?;

    let question = state
        .handler
        .ask_question(&actor.id, product_id, body.body)
        .await?;

    Ok(envelope("question", question))
}

pub async fn list_for_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> ApiResult {
    let questions = state
        .handler
        .list_questions(QuestionQuery {
            product_id: Some(product_id),
            ..Default::default()
        })
        .await?;

    Ok(envelope("questions", questions))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyBody {
    pub body: String,
}

pub async fn reply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ReplyBody>,
) -> ApiResult {
    let actor = actor(&headers)?;

    let question = state.handler.reply_question(&actor.id, id, body.body).await?;

    Ok(envelope("question", question))
}

pub async fn mark_helpful(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;

    let question = state.handler.mark_question_helpful(&actor.id, id).await?;

    Ok(envelope("question", question))
}
