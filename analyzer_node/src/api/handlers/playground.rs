//! Playground endpoints: analyze-and-compare against the held original.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::ai::report::Report;
use crate::api::errors::ApiError;
use crate::api::AppState;
use crate::orchestrator::PlaygroundOutcome;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundRequest {
    pub contract_code: Option<String>,
    pub contract_address: Option<String>,
}

/// Analyze edited code (or a fetched address) against the original slot.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlaygroundRequest>,
) -> Result<Json<PlaygroundOutcome>, ApiError> {
    let outcome = match (&request.contract_code, &request.contract_address) {
        (Some(code), _) => state.orchestrator.playground_analyze(code).await?,
        (None, Some(address)) => state.orchestrator.playground_analyze_address(address).await?,
        (None, None) => {
            return Err(ApiError::InvalidInput(
                "Contract code or address is required".to_string(),
            ))
        }
    };
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOriginalRequest {
    pub contract_code: String,
    pub report: Option<Report>,
}

pub async fn set_original(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetOriginalRequest>,
) -> Result<Json<Report>, ApiError> {
    let report = state
        .orchestrator
        .set_as_original(&request.contract_code, request.report)
        .await?;
    Ok(Json(report))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> StatusCode {
    state.orchestrator.reset_comparison().await;
    StatusCode::NO_CONTENT
}
