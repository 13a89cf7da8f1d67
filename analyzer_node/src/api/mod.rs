//! HTTP surface: router construction and shared application state.

pub mod errors;
pub mod handlers;
pub mod validation;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::ai::provider::{GrokClient, TextGenerator};
use crate::config::Config;
use crate::explorer::ExplorerClient;
use crate::market::MarketProxy;
use crate::orchestrator::Orchestrator;

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub market: MarketProxy,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let generator: Option<Arc<dyn TextGenerator>> = config.llm_api_key.as_ref().map(|key| {
            Arc::new(GrokClient::new(
                config.llm_base_url.clone(),
                key.clone(),
                config.llm_model.clone(),
            )) as Arc<dyn TextGenerator>
        });
        let explorer = config
            .explorer_api_key
            .as_ref()
            .map(|key| ExplorerClient::new(config.explorer_base_url.clone(), key.clone()));

        AppState {
            orchestrator: Orchestrator::new(generator, explorer),
            market: MarketProxy::new(config.market_base_url.clone(), config.market_api_key.clone()),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(handlers::analyze::analyze))
        .route("/chat", post(handlers::chat::chat))
        .route("/translate", post(handlers::chat::translate))
        .route("/fetch-contract", post(handlers::contracts::fetch_contract))
        .route("/contract-info", post(handlers::contracts::contract_info))
        .route("/market", get(handlers::market::typed))
        .route("/market/*path", get(handlers::market::passthrough))
        .route(
            "/playground/analyze",
            post(handlers::playground::analyze),
        )
        .route(
            "/playground/original",
            post(handlers::playground::set_original),
        )
        .route("/playground/reset", post(handlers::playground::reset))
        .route("/health", get(|| async { "OK" }))
        .layer(cors)
        .with_state(state)
}
