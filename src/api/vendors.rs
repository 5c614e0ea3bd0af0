use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::Deserialize;

use super::extract::Json;
use super::{actor, envelope, require, ApiError, ApiResult};
use crate::permissions::Capability;
use crate::state::AppState;

pub async fn show_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let profile = state.handler.get_vendor_profile(&id).await?;

    Ok(envelope("profile", profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    pub store_name: String,
    #[serde(default)]
    pub description: String,
    pub contact_email: String,
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ProfileBody>,
) -> ApiResult {
    let actor = actor(&headers)?;
    require(&actor, Capability::StoreSettings)?;

    if actor.id != id {
        return Err(ApiError::Forbidden(
            "cannot edit another vendor's store".to_string(),
        ));
    }

    let profile = state
        .handler
        .update_vendor_profile(&id, &body.store_name, &body.description, &body.contact_email)
        .await?;

    Ok(envelope("profile", profile))
}
