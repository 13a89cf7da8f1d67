//! Verified source resolution, including multi-file bundle disambiguation.

use serde::{Deserialize, Serialize};

use super::{etherscan_address_url, ExplorerClient, ExplorerEnvelope, ExplorerError};

/// Resolved, single-text contract source plus explorer metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceBundle {
    pub source_code: String,
    pub contract_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructor_arguments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
    pub is_verified: bool,
    pub address: String,
    pub etherscan_url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct SourceRecord {
    #[serde(rename = "SourceCode", default)]
    pub source_code: String,
    #[serde(rename = "ContractName", default)]
    pub contract_name: String,
    #[serde(rename = "CompilerVersion", default)]
    pub compiler_version: String,
    #[serde(rename = "ABI", default)]
    pub abi: String,
    #[serde(rename = "ConstructorArguments", default)]
    pub constructor_arguments: String,
}

impl ExplorerClient {
    /// Fetch and normalize verified source for `address`.
    ///
    /// The address must already be validated. Multi-file bundles are
    /// flattened to the single most relevant source text.
    pub async fn get_source(&self, address: &str) -> Result<SourceBundle, ExplorerError> {
        let url = self.url("contract", "getsourcecode", &format!("address={}", address));
        let body = self.fetch_json(&url).await?;

        let envelope: ExplorerEnvelope<Vec<SourceRecord>> = serde_json::from_value(body)
            .map_err(|e| {
                log::warn!("unexpected getsourcecode payload: {}", e);
                ExplorerError::Upstream(
                    "Failed to fetch contract from Etherscan. Please check the address and try again."
                        .to_string(),
                )
            })?;

        if envelope.status != "1" || envelope.result.is_empty() {
            return Err(ExplorerError::NotFound {
                address: address.to_string(),
            });
        }
        let record = &envelope.result[0];

        let contract_name = if record.contract_name.is_empty() {
            "Unknown Contract".to_string()
        } else {
            record.contract_name.clone()
        };

        if record.source_code.is_empty() {
            return Err(ExplorerError::NotVerified {
                contract_name,
                address: address.to_string(),
            });
        }

        Ok(SourceBundle {
            source_code: flatten_source(&record.source_code, &contract_name),
            contract_name,
            compiler_version: non_empty(&record.compiler_version),
            constructor_arguments: non_empty(&record.constructor_arguments),
            abi: non_empty(&record.abi),
            is_verified: true,
            address: address.to_string(),
            etherscan_url: etherscan_address_url(address),
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Flatten a multi-file source payload to one text.
///
/// Etherscan wraps standard-JSON bundles in an extra pair of braces, so the
/// outer braces are stripped before parsing. File preference: a key
/// containing the contract name, then any `.sol` key, then the first key.
/// If the payload does not parse it is returned raw.
pub(super) fn flatten_source(raw: &str, contract_name: &str) -> String {
    if !raw.starts_with('{') {
        return raw.to_string();
    }

    let inner = raw
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(raw);

    let parsed: serde_json::Value = match serde_json::from_str(inner) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("could not parse multi-file source, using raw source: {}", e);
            return raw.to_string();
        }
    };

    let Some(sources) = parsed.get("sources").and_then(|s| s.as_object()) else {
        return raw.to_string();
    };

    let selected = sources
        .keys()
        .find(|key| key.contains(contract_name))
        .or_else(|| sources.keys().find(|key| key.ends_with(".sol")))
        .or_else(|| sources.keys().next());

    selected
        .and_then(|key| sources[key].get("content"))
        .and_then(|c| c.as_str())
        .map(|content| content.to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_source_passes_through() {
        let source = "pragma solidity ^0.8.0;\ncontract A {}";
        assert_eq!(flatten_source(source, "A"), source);
    }

    #[test]
    fn bundle_prefers_key_matching_contract_name() {
        let raw = r#"{{ "sources": { "A.sol": {"content":"alpha"}, "MyToken.sol": {"content":"beta"} } }}"#;
        assert_eq!(flatten_source(raw, "MyToken"), "beta");
    }

    #[test]
    fn bundle_falls_back_to_sol_key() {
        let raw = r#"{{ "sources": { "README.md": {"content":"docs"}, "Token.sol": {"content":"code"} } }}"#;
        assert_eq!(flatten_source(raw, "Missing"), "code");
    }

    #[test]
    fn bundle_falls_back_to_first_key() {
        let raw = r#"{{ "sources": { "one.vy": {"content":"first"}, "two.vy": {"content":"second"} } }}"#;
        assert_eq!(flatten_source(raw, "Missing"), "first");
    }

    #[test]
    fn unparseable_bundle_returns_raw() {
        let raw = "{not json at all";
        assert_eq!(flatten_source(raw, "X"), raw);
    }

    #[test]
    fn brace_strip_survives_multibyte_payloads() {
        // Brace stripping must stay on char boundaries; a payload ending
        // in a multibyte character passes through instead of panicking.
        assert_eq!(flatten_source("{é", "X"), "{é");
        assert_eq!(flatten_source("{über}", "X"), "{über}");
        assert_eq!(flatten_source("{\u{00e9}", "X"), "{\u{00e9}");
    }

    #[test]
    fn bundle_without_sources_returns_raw() {
        let raw = r#"{{ "language": "Solidity" }}"#;
        assert_eq!(flatten_source(raw, "X"), raw);
    }

    #[test]
    fn envelope_with_failure_status_is_not_found() {
        let envelope: ExplorerEnvelope<Vec<SourceRecord>> = serde_json::from_str(
            r#"{ "status": "0", "message": "NOTOK", "result": [] }"#,
        )
        .unwrap();
        assert_eq!(envelope.status, "0");
        assert!(envelope.result.is_empty());
    }

    #[test]
    fn record_fields_deserialize_from_etherscan_names() {
        let record: SourceRecord = serde_json::from_str(
            r#"{ "SourceCode": "contract A {}", "ContractName": "A", "CompilerVersion": "v0.8.19" }"#,
        )
        .unwrap();
        assert_eq!(record.source_code, "contract A {}");
        assert_eq!(record.contract_name, "A");
        assert_eq!(record.compiler_version, "v0.8.19");
        assert!(record.abi.is_empty());
    }
}
