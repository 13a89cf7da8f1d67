use std::sync::Arc;

use anyhow::Result;

use smartscribe_node::api::{self, AppState};
use smartscribe_node::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env();
    if config.llm_api_key.is_none() {
        log::warn!("LLM_API_KEY not set; analysis endpoints will report a configuration error");
    }
    if config.explorer_api_key.is_none() {
        log::warn!("EXPLORER_API_KEY not set; contract lookup endpoints will report a configuration error");
    }

    let state = Arc::new(AppState::from_config(&config));
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    log::info!("analysis node listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
