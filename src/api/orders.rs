use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::extract::Json;
use super::{actor, envelope, require, ApiResult};
use crate::entities::{OrderItem, OrderStatus};
use crate::handlers::orders::NewOrder;
use crate::permissions::{Capability, Role};
use crate::repositories::OrderQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub vendor_id: String,
    pub items: Vec<OrderItem>,
    pub customer_email: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::OrderPlace)?;

    let placed = state
        .handler
        .create_order(NewOrder {
            customer_id: actor.id,
            vendor_id: body.vendor_id,
            items: body.items,
            customer_email: body.customer_email,
        })
        .await?;

    Ok(axum::Json(json!({
        "success": true,
        "order": placed.order,
        "payment": placed.payment.map(|p| json!({
            "authorizationUrl": p.authorization_url,
            "reference": p.reference,
        })),
    })))
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;

    let order = state.handler.get_order(&actor.id, id).await?;

    Ok(envelope("order", order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<OrderStatus>,
}

/// Customers see their own orders, vendors their own sales.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;

    let query = match actor.role {
        Role::Vendor => OrderQuery {
            vendor_id: Some(actor.id),
            status: params.status,
            ..Default::default()
        },
        _ => OrderQuery {
            customer_id: Some(actor.id),
            status: params.status,
            ..Default::default()
        },
    };

    let orders = state.handler.list_orders(query).await?;

    Ok(envelope("orders", orders))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<StatusBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::OrderFulfil)?;

    let order = state
        .handler
        .update_order_status(&actor.id, id, body.status, body.tracking_number)
        .await?;

    Ok(envelope("order", order))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::OrderCancel)?;

    let order = state
        .handler
        .cancel_order(&actor.id, id, matches!(actor.role, Role::Admin))
        .await?;

    Ok(envelope("order", order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub reference: String,
}

pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentBody>,
) -> ApiResult {
    let order = state.handler.confirm_payment(id, &body.reference).await?;

    Ok(envelope("order", order))
}
