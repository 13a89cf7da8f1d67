//! Contract metadata aggregation: balance, tx count, verification status,
//! and creation timestamp.

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{etherscan_address_url, ExplorerClient, ExplorerError};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub address: String,
    pub etherscan_url: String,
    pub balance: String,
    pub transaction_count: u64,
    pub is_contract: bool,
    pub is_verified: bool,
    pub contract_name: String,
    pub compiler_version: Option<String>,
    /// ISO-8601, or `None` when the creation chain could not be resolved.
    pub creation_date: Option<String>,
}

impl ExplorerClient {
    /// Aggregate metadata for `address`.
    ///
    /// The three independent lookups run in parallel and each degrades to
    /// its default on failure; the creation-date chain runs sequentially
    /// afterwards and is swallowed entirely on any failure.
    pub async fn contract_info(&self, address: &str) -> Result<ContractInfo, ExplorerError> {
        let source_url = self.url("contract", "getsourcecode", &format!("address={}", address));
        let balance_url = self.url(
            "account",
            "balance",
            &format!("address={}&tag=latest", address),
        );
        let tx_count_url = self.url(
            "proxy",
            "eth_getTransactionCount",
            &format!("address={}&tag=latest", address),
        );

        let (source, balance, tx_count) = tokio::join!(
            self.fetch_json(&source_url),
            self.fetch_json(&balance_url),
            self.fetch_json(&tx_count_url),
        );

        let mut info = ContractInfo {
            address: address.to_string(),
            etherscan_url: etherscan_address_url(address),
            balance: balance.map(|b| format_balance(&b)).unwrap_or_else(|e| {
                log::warn!("balance lookup failed: {}", e);
                "0 ETH".to_string()
            }),
            transaction_count: tx_count
                .ok()
                .and_then(|t| t.get("result").and_then(Value::as_str).map(parse_hex_u64))
                .unwrap_or(0),
            is_contract: false,
            is_verified: false,
            contract_name: "Unknown Contract".to_string(),
            compiler_version: None,
            creation_date: None,
        };

        if let Ok(source) = source {
            if source.get("status").and_then(Value::as_str) == Some("1") {
                if let Some(record) = source
                    .get("result")
                    .and_then(Value::as_array)
                    .and_then(|r| r.first())
                {
                    info.is_contract = true;
                    let source_code = record
                        .get("SourceCode")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    info.is_verified = !source_code.is_empty();
                    if let Some(name) = record
                        .get("ContractName")
                        .and_then(Value::as_str)
                        .filter(|n| !n.is_empty())
                    {
                        info.contract_name = name.to_string();
                    }
                    info.compiler_version = record
                        .get("CompilerVersion")
                        .and_then(Value::as_str)
                        .filter(|v| !v.is_empty())
                        .map(|v| v.to_string());
                }
            }
        }

        info.creation_date = self.creation_date(address).await;
        Ok(info)
    }

    /// Creation timestamp via getcontractcreation -> tx -> block. Each call
    /// depends on the previous response, so the chain is sequential, and
    /// any failure leaves the field unset.
    async fn creation_date(&self, address: &str) -> Option<String> {
        let creation_url = self.url(
            "contract",
            "getcontractcreation",
            &format!("contractaddresses={}", address),
        );
        let creation = match self.fetch_json(&creation_url).await {
            Ok(v) => v,
            Err(e) => {
                log::info!("could not fetch creation date: {}", e);
                return None;
            }
        };
        if creation.get("status").and_then(Value::as_str) != Some("1") {
            return None;
        }
        let tx_hash = creation
            .get("result")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .and_then(|r| r.get("txHash"))
            .and_then(Value::as_str)?
            .to_string();

        let tx_url = self.url(
            "proxy",
            "eth_getTransactionByHash",
            &format!("txhash={}", tx_hash),
        );
        let tx = self.fetch_json(&tx_url).await.ok()?;
        let block_number = tx
            .get("result")
            .and_then(|r| r.get("blockNumber"))
            .and_then(Value::as_str)?
            .to_string();

        let block_url = self.url(
            "proxy",
            "eth_getBlockByNumber",
            &format!("tag={}&boolean=false", block_number),
        );
        let block = self.fetch_json(&block_url).await.ok()?;
        let timestamp_hex = block
            .get("result")
            .and_then(|r| r.get("timestamp"))
            .and_then(Value::as_str)?;

        format_creation_date(timestamp_hex)
    }
}

/// Wei (decimal string from the explorer, or hex from proxy endpoints) to a
/// display balance in ETH with four decimals.
fn format_balance(body: &Value) -> String {
    if body.get("status").and_then(Value::as_str) != Some("1") {
        return "0 ETH".to_string();
    }
    let Some(result) = body.get("result").and_then(Value::as_str) else {
        return "0 ETH".to_string();
    };
    let wei = parse_wei(result);
    format!("{:.4} ETH", wei / 1e18)
}

fn parse_wei(raw: &str) -> f64 {
    if let Some(hex) = raw.strip_prefix("0x") {
        u128::from_str_radix(hex, 16).map(|v| v as f64).unwrap_or(0.0)
    } else {
        raw.parse::<f64>().unwrap_or(0.0)
    }
}

fn parse_hex_u64(raw: &str) -> u64 {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).unwrap_or(0)
}

fn format_creation_date(timestamp_hex: &str) -> Option<String> {
    let seconds = i64::from_str_radix(timestamp_hex.strip_prefix("0x")?, 16).ok()?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
