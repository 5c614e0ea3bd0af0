use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::Json;
use super::{actor, check_rate, envelope, require, ApiResult};
use crate::entities::{ConversationStatus, SenderRole};
use crate::handlers::messaging::NewConversation;
use crate::permissions::{Capability, Role};
use crate::ratelimit::RateAction;
use crate::repositories::ConversationQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBody {
    pub vendor_id: String,
    pub subject: String,
    pub product_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
}

pub async fn open(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<OpenBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ConversationAccess)?;

    let conversation = state
        .handler
        .open_conversation(NewConversation {
            customer_id: actor.id,
            vendor_id: body.vendor_id,
            subject: body.subject,
            product_id: body.product_id,
            order_id: body.order_id,
        })
        .await?;

    Ok(envelope("conversation", conversation))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<ConversationStatus>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ConversationAccess)?;

    let query = match actor.role {
        Role::Vendor => ConversationQuery {
            vendor_id: Some(actor.id),
            status: params.status,
            ..Default::default()
        },
        _ => ConversationQuery {
            customer_id: Some(actor.id),
            status: params.status,
            ..Default::default()
        },
    };

    let conversations = state.handler.list_conversations(query).await?;

    Ok(envelope("conversations", conversations))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBody {
    /// Anything outside {customer, vendor} is rejected at extraction
    /// with 400, so an invalid role never reaches the store.
    pub sender_role: SenderRole,
    pub content: String,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<SendBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ConversationAccess)?;
    check_rate(&state, &actor.id, RateAction::MessageSend)?;

    let message = state
        .handler
        .send_message(id, &actor.id, body.sender_role, body.content)
        .await?;

    Ok(envelope("message", message))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesParams {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<MessagesParams>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ConversationAccess)?;

    let messages = state
        .handler
        .list_messages(&actor.id, id, params.unread_only)
        .await?;

    Ok(envelope("messages", messages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadBody {
    pub reader_role: SenderRole,
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ReadBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ConversationAccess)?;

    let touched = state
        .handler
        .mark_conversation_read(&actor.id, id, body.reader_role)
        .await?;

    Ok(envelope("markedRead", touched))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub status: ConversationStatus,
}

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<StatusBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ConversationAccess)?;

    let conversation = state
        .handler
        .set_conversation_status(&actor.id, id, body.status)
        .await?;

    Ok(envelope("conversation", conversation))
}
