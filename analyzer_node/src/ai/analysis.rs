//! Analysis engine: drives the LLM with a structured prompt, extracts the
//! JSON report from the raw completion, and falls back to a deterministic
//! report when the model output cannot be parsed.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ai::provider::{LlmError, TextGenerator};
use crate::ai::report::{fallback_report, Report};
use crate::api::errors::ApiError;
use crate::retry::with_retry;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Greedy first-`{` to last-`}` scan; the model is asked for a bare JSON
/// object but often wraps it in prose.
static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("json object regex"));

/// Analyze a contract given its source code or its address (at least one
/// is required; code wins when both are present).
pub async fn analyze_contract(
    generator: &dyn TextGenerator,
    contract_code: Option<&str>,
    contract_address: Option<&str>,
) -> Result<Report, ApiError> {
    if contract_code.is_none() && contract_address.is_none() {
        return Err(ApiError::InvalidInput(
            "Contract code or address is required".to_string(),
        ));
    }

    let prompt = build_analysis_prompt(contract_code, contract_address);

    let text = with_retry(
        || generator.generate(&prompt),
        MAX_ATTEMPTS,
        INITIAL_DELAY,
        LlmError::is_retryable,
    )
    .await
    .map_err(map_llm_error)?;

    Ok(parse_report(&text, contract_code, contract_address))
}

fn map_llm_error(err: LlmError) -> ApiError {
    match err {
        LlmError::Overloaded(_) => ApiError::UpstreamOverloaded(
            "The AI model is currently overloaded after multiple attempts. Please try again later."
                .to_string(),
        ),
        LlmError::ModelNotFound(_) => ApiError::ModelUnavailable(
            "AI model temporarily unavailable. Please try again later.".to_string(),
        ),
        LlmError::Auth(_) => ApiError::ConfigMissing(
            "AI service configuration error. Please ensure your API key is valid.".to_string(),
        ),
        LlmError::Other(_) => ApiError::Unexpected(
            "Failed to analyze contract. An unexpected error occurred. Please try again."
                .to_string(),
        ),
    }
}

/// Extract and normalize the report, substituting the fallback when no
/// parseable JSON object is present in the completion.
fn parse_report(text: &str, contract_code: Option<&str>, contract_address: Option<&str>) -> Report {
    let parsed = JSON_OBJECT_RE
        .find(text)
        .and_then(|m| serde_json::from_str::<Report>(m.as_str()).ok());

    match parsed {
        Some(mut report) => {
            report.normalize();
            report
        }
        None => {
            log::warn!("model response had no parseable JSON, returning fallback report");
            fallback_report(contract_code, contract_address, text.to_string())
        }
    }
}

fn build_analysis_prompt(contract_code: Option<&str>, contract_address: Option<&str>) -> String {
    let subject = match contract_code {
        Some(code) => format!("Contract Code:\n{}", code),
        None => format!(
            "Contract Address: {}",
            contract_address.unwrap_or_default()
        ),
    };

    format!(
        r#"You are a smart contract security expert. Analyze the following Ethereum smart contract and provide a comprehensive analysis in JSON format.

{subject}

Please analyze and return a JSON response with the following structure:
{{
"contractName": "string",
"summary": "string (2-3 sentences describing what the contract does)",
"functions": [
{{
  "name": "string",
  "access": "string (Public/Private/Owner Only/etc)",
  "risk": "string (low/medium/high)",
  "description": "string"
}}
],
"risks": [
{{
  "level": "string (low/medium/high)",
  "title": "string",
  "description": "string"
}}
],
"securityScore": number (0-10),
"recommendations": [
"string (security recommendations)"
],
"isUpgradeable": boolean,
"hasOwnerPrivileges": boolean,
"tokenStandard": "string (ERC20/ERC721/Custom/etc)"
}}

Focus on:
1. Security vulnerabilities
2. Access control issues
3. Centralization risks
4. Reentrancy attacks
5. Integer overflow/underflow
6. Gas optimization issues
7. Upgradeability patterns

Provide practical, actionable insights that both developers and non-technical users can understand.
"#
    )
}
