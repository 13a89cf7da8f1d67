//! Chat engine: contract-grounded or general guidance prompts.
//!
//! Unlike the analysis engine this path performs no retries; a transient
//! provider failure surfaces to the user immediately.

use serde_json::Value;

use crate::ai::provider::{LlmError, TextGenerator};
use crate::api::errors::ApiError;

/// Answer a user question, grounding the prompt in the analyzed contract
/// when `contract_data.hasContract` is set.
pub async fn chat(
    generator: &dyn TextGenerator,
    message: &str,
    contract_data: Option<&Value>,
) -> Result<String, ApiError> {
    if message.is_empty() {
        return Err(ApiError::InvalidInput("Message is required".to_string()));
    }

    let prompt = match contract_data.filter(|c| has_contract(c)) {
        Some(contract) => grounded_prompt(message, contract),
        None => general_prompt(message),
    };

    generator.generate(&prompt).await.map_err(|err| match err {
        LlmError::ModelNotFound(_) => ApiError::ModelUnavailable(
            "AI assistant temporarily unavailable. Please try again later.".to_string(),
        ),
        LlmError::Auth(_) => ApiError::ConfigMissing(
            "AI service configuration error. Please contact support.".to_string(),
        ),
        _ => ApiError::Unexpected(
            "I'm sorry, I encountered an error processing your question. Please try again."
                .to_string(),
        ),
    })
}

// Mirrors script-style truthiness: false, null, 0 and "" all opt out of
// the grounded prompt.
fn has_contract(contract_data: &Value) -> bool {
    match contract_data.get("hasContract") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn grounded_prompt(message: &str, contract: &Value) -> String {
    let str_field = |key: &str, default: &str| {
        contract
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let json_field = |key: &str| {
        contract
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::Array(vec![]))
            .to_string()
    };
    let score = contract
        .get("securityScore")
        .and_then(Value::as_f64)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let flag = |key: &str| {
        contract
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    let code_section = contract
        .get("contractCode")
        .and_then(Value::as_str)
        .map(|code| format!("Contract Code:\n{}\n\n", code))
        .unwrap_or_default();

    format!(
        r#"You are a smart contract expert assistant. You have analyzed the following smart contract:

Contract Name: {name}
Summary: {summary}
Security Score: {score}/10
Functions: {functions}
Risks: {risks}
Is Upgradeable: {upgradeable}
Has Owner Privileges: {owner}
Token Standard: {standard}

{code_section}User Question: "{message}"

Please provide a helpful, accurate answer about this specific smart contract. Keep your response:
1. Focused on the analyzed contract
2. Clear and understandable for both technical and non-technical users
3. Specific about risks, functions, and security implications
4. Conversational but informative

If the question is about specific functions, refer to the function list above.
If asked about risks, reference the identified risks.
If asked about security, mention the security score and specific vulnerabilities.
"#,
        name = str_field("contractName", "Smart Contract"),
        summary = str_field("summary", "Contract analysis available"),
        score = score,
        functions = json_field("functions"),
        risks = json_field("risks"),
        upgradeable = flag("isUpgradeable"),
        owner = flag("hasOwnerPrivileges"),
        standard = str_field("tokenStandard", "Custom"),
        code_section = code_section,
        message = message,
    )
}

fn general_prompt(message: &str) -> String {
    format!(
        r#"You are a smart contract expert assistant. The user hasn't uploaded a specific contract yet, so provide general guidance about smart contracts, security, and blockchain development.

User Question: "{message}"

Please provide a helpful answer about smart contracts, focusing on:
1. General smart contract security principles
2. Common vulnerabilities and how to avoid them
3. Best practices for smart contract development
4. Solidity programming guidance
5. DeFi and blockchain concepts

Keep your response clear, educational, and actionable. If the user asks about analyzing a specific contract, suggest they upload their contract code first for personalized analysis.
"#
    )
}
