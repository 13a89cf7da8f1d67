//! Block explorer (Etherscan-compatible) client.

pub mod metadata;
pub mod source;

use serde::Deserialize;
use thiserror::Error;

pub use metadata::ContractInfo;
pub use source::SourceBundle;

pub const ETHERSCAN_SITE: &str = "https://etherscan.io";

pub fn etherscan_address_url(address: &str) -> String {
    format!("{}/address/{}", ETHERSCAN_SITE, address)
}

/// Errors from the source resolver. Address validation happens before the
/// client is reached, so `InvalidAddress` never originates here.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExplorerError {
    #[error("Contract source code not verified on Etherscan")]
    NotVerified {
        contract_name: String,
        address: String,
    },
    #[error("Contract not found or not verified on Etherscan")]
    NotFound { address: String },
    #[error("{0}")]
    Upstream(String),
}

/// Standard Etherscan response envelope: `status` is `"1"` on success and
/// `result` carries the module-specific payload.
#[derive(Debug, Deserialize)]
pub struct ExplorerEnvelope<T> {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub result: T,
}

pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ExplorerClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        ExplorerClient {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    fn url(&self, module: &str, action: &str, params: &str) -> String {
        format!(
            "{}?module={}&action={}&{}&apikey={}",
            self.base_url, module, action, params, self.api_key
        )
    }

    /// One GET returning the raw JSON body, with upstream failures reduced
    /// to a user-presentable message.
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, ExplorerError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            log::warn!("explorer request failed: {}", e);
            ExplorerError::Upstream(
                "Network error or Etherscan API is unreachable. Please try again later."
                    .to_string(),
            )
        })?;

        if response.status().as_u16() == 403 {
            return Err(ExplorerError::Upstream(
                "Etherscan API key might be invalid or rate-limited. Please check your API key."
                    .to_string(),
            ));
        }

        response.json().await.map_err(|e| {
            log::warn!("explorer response was not JSON: {}", e);
            ExplorerError::Upstream(
                "Failed to fetch contract from Etherscan. Please check the address and try again."
                    .to_string(),
            )
        })
    }
}
