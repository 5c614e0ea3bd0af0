use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::Json;
use super::{actor, envelope, require, ApiError, ApiResult};
use crate::entities::{ProductKind, ProductStatus};
use crate::handlers::catalog::{NewProduct, ProductEdit};
use crate::permissions::Capability;
use crate::repositories::ProductQuery;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub kind: ProductKind,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ProductWrite)?;

    let product = state
        .handler
        .create_product(NewProduct {
            vendor_id: actor.id,
            name: body.name,
            description: body.description,
            price: body.price,
            kind: body.kind,
        })
        .await?;

    Ok(envelope("product", product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub vendor_id: Option<String>,
    pub status: Option<ProductStatus>,
    pub name: Option<String>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let name = match params.name {
        Some(pattern) => Some(
            Regex::new(&pattern)
                .map_err(|_| ApiError::BadRequest("invalid name pattern".to_string()))?,
        ),
        None => None,
    };

    let products = state
        .handler
        .list_products(ProductQuery {
            vendor_id: params.vendor_id,
            status: params.status,
            name,
        })
        .await?;

    Ok(envelope("products", products))
}

pub async fn show(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> ApiResult {
    let product = state.handler.get_product(id).await?;

    Ok(envelope("product", product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ProductWrite)?;

    let product = state
        .handler
        .update_product(
            &actor.id,
            id,
            ProductEdit {
                name: body.name,
                description: body.description,
                price: body.price,
            },
        )
        .await?;

    Ok(envelope("product", product))
}

pub async fn archive(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::ProductWrite)?;

    let product = state.handler.archive_product(&actor.id, id).await?;

    Ok(envelope("product", product))
}
