//! `POST /fetch-contract` and `POST /contract-info`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::validation::validate_address;
use crate::api::AppState;
use crate::explorer::{etherscan_address_url, ContractInfo, ExplorerError};

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    #[serde(default)]
    pub address: String,
}

/// Resolve verified source. Not-found and not-verified answers keep the
/// address (and explorer link) in the body so the UI can render them.
pub async fn fetch_contract(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddressRequest>,
) -> Response {
    if let Err(err) = validate_address(&request.address) {
        return err.into_response();
    }
    let explorer = match state.orchestrator.explorer_client() {
        Ok(explorer) => explorer,
        Err(err) => return err.into_response(),
    };

    match explorer.get_source(&request.address).await {
        Ok(bundle) => Json(bundle).into_response(),
        Err(ExplorerError::NotVerified {
            contract_name,
            address,
        }) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Contract source code not verified on Etherscan",
                "contractName": contract_name,
                "address": address,
            })),
        )
            .into_response(),
        Err(ExplorerError::NotFound { address }) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Contract not found or not verified on Etherscan",
                "address": address,
                "etherscanUrl": etherscan_address_url(&address),
            })),
        )
            .into_response(),
        Err(ExplorerError::Upstream(message)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message, "address": request.address })),
        )
            .into_response(),
    }
}

pub async fn contract_info(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddressRequest>,
) -> Result<Json<ContractInfo>, ApiError> {
    let info = state.orchestrator.contract_info(&request.address).await?;
    Ok(Json(info))
}
