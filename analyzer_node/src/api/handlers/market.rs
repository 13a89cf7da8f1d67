//! `GET /market?type=…` and `GET /market/{path…}`.

use std::sync::Arc;

use axum::extract::{Path, Query, RawQuery, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::market::MarketReply;

#[derive(Debug, Deserialize)]
pub struct TypedQuery {
    #[serde(rename = "type", default)]
    pub data_type: String,
}

pub async fn typed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TypedQuery>,
) -> Result<Json<Value>, ApiError> {
    let body = state.market.fetch_typed(&query.data_type).await?;
    Ok(Json(body))
}

pub async fn passthrough(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> MarketReply {
    state.market.fetch_path(&path, query.as_deref()).await
}
