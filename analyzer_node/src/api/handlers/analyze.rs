//! `POST /analyze` — full security analysis of code or an address.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::ai::report::Report;
use crate::api::errors::ApiError;
use crate::api::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub contract_code: Option<String>,
    pub contract_address: Option<String>,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Report>, ApiError> {
    let report = state
        .orchestrator
        .analyze(
            request.contract_code.as_deref(),
            request.contract_address.as_deref(),
        )
        .await?;
    Ok(Json(report))
}
