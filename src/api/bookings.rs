use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::Json;
use super::{actor, envelope, require, ApiResult};
use crate::entities::{BookingStatus, SenderRole};
use crate::permissions::{Capability, Role};
use crate::repositories::BookingQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub service_id: Uuid,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> ApiResult {
    let actor = actor(&headers)?;

    let booking = state.handler.create_booking(&actor.id, body.service_id).await?;

    Ok(envelope("booking", booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<BookingStatus>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;

    let query = match actor.role {
        Role::Vendor => BookingQuery {
            vendor_id: Some(actor.id),
            status: params.status,
            ..Default::default()
        },
        _ => BookingQuery {
            customer_id: Some(actor.id),
            status: params.status,
            ..Default::default()
        },
    };

    let bookings = state.handler.list_bookings(query).await?;

    Ok(envelope("bookings", bookings))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleBody {
    pub scheduled_date: DateTime<Utc>,
}

pub async fn schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<ScheduleBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::BookingManage)?;

    let booking = state
        .handler
        .schedule_booking(&actor.id, id, body.scheduled_date)
        .await?;

    Ok(envelope("booking", booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub status: BookingStatus,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<StatusBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::BookingManage)?;

    let booking = state
        .handler
        .update_booking_status(&actor.id, id, body.status)
        .await?;

    Ok(envelope("booking", booking))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;

    let booking = state.handler.cancel_booking(&actor.id, id).await?;

    Ok(envelope("booking", booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBody {
    pub sender_role: SenderRole,
    pub content: String,
}

pub async fn add_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<NoteBody>,
) -> ApiResult {
    let actor = actor(&headers)?;

    let booking = state
        .handler
        .add_booking_note(id, &actor.id, body.sender_role, body.content)
        .await?;

    Ok(envelope("booking", booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBody {
    pub rating: u8,
    #[serde(default)]
    pub feedback: String,
}

pub async fn rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<RatingBody>,
) -> ApiResult {
    let actor = actor(&headers)?;

    let booking = state
        .handler
        .rate_booking(&actor.id, id, body.rating, body.feedback)
        .await?;

    Ok(envelope("booking", booking))
}
