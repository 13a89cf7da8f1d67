//! Canonical analysis report schema.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const RISK_LEVELS: [&str; 3] = ["low", "medium", "high"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default = "default_level")]
    pub risk: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskInfo {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Canonical report produced by the analysis engine.
///
/// Deserialization tolerates missing fields by supplying the fallback
/// defaults, so a sparse but valid model response still yields a complete
/// report. [`Report::normalize`] enforces the schema invariants afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default = "default_contract_name")]
    pub contract_name: String,
    #[serde(default = "default_summary")]
    pub summary: String,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    #[serde(default)]
    pub risks: Vec<RiskInfo>,
    #[serde(default = "default_score")]
    pub security_score: f64,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub is_upgradeable: bool,
    #[serde(default = "default_true")]
    pub has_owner_privileges: bool,
    #[serde(default = "default_token_standard")]
    pub token_standard: String,
    /// Raw model output, retained only when the fallback path was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    /// Set when the model response could not be parsed and the
    /// deterministic fallback report was substituted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl Report {
    /// Enforce the schema invariants: `securityScore` clamped to `[0, 10]`
    /// and risk levels lowercased into the {low, medium, high} enum.
    pub fn normalize(&mut self) {
        self.security_score = self.security_score.clamp(0.0, 10.0);
        for risk in &mut self.risks {
            risk.level = normalize_level(&risk.level);
        }
        for function in &mut self.functions {
            function.risk = normalize_level(&function.risk);
        }
    }
}

fn normalize_level(level: &str) -> String {
    let lowered = level.trim().to_lowercase();
    if RISK_LEVELS.contains(&lowered.as_str()) {
        lowered
    } else {
        default_level()
    }
}

fn default_contract_name() -> String {
    "Smart Contract".to_string()
}

fn default_summary() -> String {
    "Contract analysis available".to_string()
}

fn default_access() -> String {
    "Public".to_string()
}

fn default_level() -> String {
    "medium".to_string()
}

fn default_score() -> f64 {
    7.5
}

fn default_true() -> bool {
    true
}

fn default_token_standard() -> String {
    "Custom".to_string()
}

static CONTRACT_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"contract\s+(\w+)").expect("contract heading regex"));

/// Deterministic report returned when the model output cannot be parsed.
///
/// The illustrative function list is intentionally fixed; `degraded` marks
/// the substitution and `ai_response` preserves the raw output.
pub fn fallback_report(
    contract_code: Option<&str>,
    contract_address: Option<&str>,
    raw_response: String,
) -> Report {
    let contract_name = match (contract_code, contract_address) {
        (Some(code), _) => CONTRACT_HEADING_RE
            .captures(code)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "Smart Contract Analysis".to_string()),
        (None, Some(address)) => {
            format!("Contract {}...", &address[..address.len().min(10)])
        }
        (None, None) => "Smart Contract Analysis".to_string(),
    };

    Report {
        contract_name,
        summary: "AI analysis completed. The contract has been analyzed for security \
                  vulnerabilities and functionality."
            .to_string(),
        functions: vec![
            FunctionInfo {
                name: "transfer".to_string(),
                access: "Public".to_string(),
                risk: "low".to_string(),
                description: "Standard token transfer function".to_string(),
            },
            FunctionInfo {
                name: "approve".to_string(),
                access: "Public".to_string(),
                risk: "low".to_string(),
                description: "Approve spending allowance for another address".to_string(),
            },
            FunctionInfo {
                name: "mint".to_string(),
                access: "Owner Only".to_string(),
                risk: "high".to_string(),
                description: "Create new tokens (if present)".to_string(),
            },
        ],
        risks: vec![RiskInfo {
            level: "medium".to_string(),
            title: "Analysis Completed".to_string(),
            description: "Detailed analysis available in full report".to_string(),
        }],
        security_score: 7.5,
        recommendations: vec![
            "Review contract thoroughly".to_string(),
            "Consider security audit".to_string(),
        ],
        is_upgradeable: false,
        has_owner_privileges: true,
        token_standard: "Custom".to_string(),
        ai_response: Some(raw_response),
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_score_and_lowercases_levels() {
        let mut report: Report = serde_json::from_str(
            r#"{
                "contractName": "X",
                "securityScore": 14.2,
                "risks": [{ "level": "HIGH", "title": "Reentrancy" }],
                "functions": [{ "name": "mint", "risk": "Medium" }]
            }"#,
        )
        .unwrap();
        report.normalize();
        assert_eq!(report.security_score, 10.0);
        assert_eq!(report.risks[0].level, "high");
        assert_eq!(report.functions[0].risk, "medium");
    }

    #[test]
    fn normalize_replaces_unknown_levels() {
        let mut report: Report = serde_json::from_str(
            r#"{ "risks": [{ "level": "catastrophic", "title": "T" }] }"#,
        )
        .unwrap();
        report.normalize();
        assert_eq!(report.risks[0].level, "medium");
    }

    #[test]
    fn sparse_json_fills_all_fields() {
        let report: Report = serde_json::from_str(r#"{ "contractName": "Y" }"#).unwrap();
        assert_eq!(report.contract_name, "Y");
        assert_eq!(report.security_score, 7.5);
        assert_eq!(report.token_standard, "Custom");
        assert!(report.has_owner_privileges);
        assert!(!report.degraded);
        assert!(report.ai_response.is_none());
    }

    #[test]
    fn fallback_name_from_code_heading() {
        let report = fallback_report(
            Some("pragma solidity ^0.8.0;\ncontract MyToken is ERC20 {}"),
            None,
            "I cannot help.".to_string(),
        );
        assert_eq!(report.contract_name, "MyToken");
        assert!(report.degraded);
        assert_eq!(report.ai_response.as_deref(), Some("I cannot help."));
    }

    #[test]
    fn fallback_name_from_address() {
        let report = fallback_report(
            None,
            Some("0xdAC17F958D2ee523a2206206994597C13D831ec7"),
            String::new(),
        );
        assert_eq!(report.contract_name, "Contract 0xdAC17F95...");
    }

    #[test]
    fn fallback_is_schema_complete() {
        let report = fallback_report(Some("contract A {}"), None, "raw".to_string());
        assert_eq!(report.functions.len(), 3);
        assert_eq!(report.functions[0].name, "transfer");
        assert_eq!(report.functions[1].name, "approve");
        assert_eq!(report.functions[2].name, "mint");
        assert_eq!(report.risks.len(), 1);
        assert_eq!(report.risks[0].level, "medium");
        assert_eq!(report.security_score, 7.5);
        assert!(!report.is_upgradeable);
        assert!(report.has_owner_privileges);
        assert_eq!(report.token_standard, "Custom");
    }

    #[test]
    fn degraded_flag_omitted_from_clean_reports() {
        let report: Report = serde_json::from_str(r#"{ "contractName": "Z" }"#).unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("degraded").is_none());
        assert!(value.get("aiResponse").is_none());

        let fallback = fallback_report(None, None, "text".to_string());
        let value = serde_json::to_value(&fallback).unwrap();
        assert_eq!(value["degraded"], true);
        assert_eq!(value["aiResponse"], "text");
    }
}
