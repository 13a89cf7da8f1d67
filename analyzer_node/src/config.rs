//! Node configuration sourced from environment variables.

/// Runtime configuration for the analysis node.
///
/// Credentials are optional at startup; endpoints that need a missing
/// credential answer with a configuration error instead of failing boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Credential for the LLM provider (`/analyze`, `/chat`, `/translate`).
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_base_url: String,
    /// Credential for the block explorer (`/fetch-contract`, `/contract-info`).
    pub explorer_api_key: Option<String>,
    pub explorer_base_url: String,
    /// Optional market data credential, forwarded as a provider header.
    pub market_api_key: Option<String>,
    pub market_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8090),
            llm_api_key: non_empty_var("LLM_API_KEY"),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "grok-3".to_string()),
            llm_base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.x.ai/v1".to_string()),
            explorer_api_key: non_empty_var("EXPLORER_API_KEY"),
            explorer_base_url: std::env::var("EXPLORER_BASE_URL")
                .unwrap_or_else(|_| "https://api.etherscan.io/api".to_string()),
            market_api_key: non_empty_var("MARKET_API_KEY"),
            market_base_url: std::env::var("MARKET_BASE_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".to_string()),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
