//! Request dispatch: routes user actions to the engines and holds the
//! two-slot original/modified state used for playground comparison.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::ai::analysis::analyze_contract;
use crate::ai::chat::chat;
use crate::ai::provider::TextGenerator;
use crate::ai::report::Report;
use crate::ai::translate::translate;
use crate::api::errors::ApiError;
use crate::api::validation::validate_address;
use crate::comparison::{compare_reports, ComparisonResult};
use crate::explorer::{ContractInfo, ExplorerClient, ExplorerError, SourceBundle};

/// One analyzed contract held for comparison.
#[derive(Debug, Clone)]
pub struct AnalysisSlot {
    pub code: String,
    pub report: Report,
}

/// At most two reports are held at a time: the original and the latest
/// modified version. Not persisted.
#[derive(Debug, Default)]
pub struct ComparisonSession {
    pub original: Option<AnalysisSlot>,
    pub modified: Option<AnalysisSlot>,
}

/// Playground outcome: the fresh report, plus a comparison against the
/// original slot when one was already held.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundOutcome {
    pub report: Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonResult>,
}

pub struct Orchestrator {
    generator: Option<Arc<dyn TextGenerator>>,
    explorer: Option<ExplorerClient>,
    session: RwLock<ComparisonSession>,
}

impl Orchestrator {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        explorer: Option<ExplorerClient>,
    ) -> Self {
        Orchestrator {
            generator,
            explorer,
            session: RwLock::new(ComparisonSession::default()),
        }
    }

    fn generator(&self) -> Result<&dyn TextGenerator, ApiError> {
        self.generator.as_deref().ok_or_else(|| {
            ApiError::ConfigMissing(
                "AI service configuration error: LLM API key is missing.".to_string(),
            )
        })
    }

    pub fn explorer_client(&self) -> Result<&ExplorerClient, ApiError> {
        self.explorer.as_ref().ok_or_else(|| {
            ApiError::ConfigMissing("Etherscan API key is not configured.".to_string())
        })
    }

    /// `/analyze`: direct analysis of code and/or address (the prompt gets
    /// whichever was supplied, code winning when both are).
    pub async fn analyze(
        &self,
        contract_code: Option<&str>,
        contract_address: Option<&str>,
    ) -> Result<Report, ApiError> {
        if let Some(address) = contract_address {
            validate_address(address)?;
        }
        analyze_contract(self.generator()?, contract_code, contract_address).await
    }

    /// Resolve verified source for an address, then analyze the code.
    pub async fn analyze_address(&self, address: &str) -> Result<(SourceBundle, Report), ApiError> {
        let bundle = self.fetch_source(address).await?;
        let report = analyze_contract(self.generator()?, Some(&bundle.source_code), None).await?;
        Ok((bundle, report))
    }

    pub async fn fetch_source(&self, address: &str) -> Result<SourceBundle, ApiError> {
        validate_address(address)?;
        self.explorer_client()?
            .get_source(address)
            .await
            .map_err(map_explorer_error)
    }

    pub async fn contract_info(&self, address: &str) -> Result<ContractInfo, ApiError> {
        validate_address(address)?;
        self.explorer_client()?
            .contract_info(address)
            .await
            .map_err(map_explorer_error)
    }

    pub async fn chat(
        &self,
        message: &str,
        contract_data: Option<&Value>,
    ) -> Result<String, ApiError> {
        chat(self.generator()?, message, contract_data).await
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String, ApiError> {
        translate(self.generator()?, text, target_language).await
    }

    /// Playground analysis. The first analyzed contract becomes the
    /// original; each subsequent one becomes the modified slot and is
    /// compared against the original.
    pub async fn playground_analyze(&self, code: &str) -> Result<PlaygroundOutcome, ApiError> {
        let report = analyze_contract(self.generator()?, Some(code), None).await?;
        Ok(self.record_playground(code, report).await)
    }

    /// Playground analysis from an address: resolve the verified source,
    /// analyze it once, then run the same slot accounting.
    pub async fn playground_analyze_address(
        &self,
        address: &str,
    ) -> Result<PlaygroundOutcome, ApiError> {
        let (bundle, report) = self.analyze_address(address).await?;
        Ok(self.record_playground(&bundle.source_code, report).await)
    }

    async fn record_playground(&self, code: &str, report: Report) -> PlaygroundOutcome {
        let mut session = self.session.write().await;

        match &session.original {
            Some(original) => {
                let comparison =
                    compare_reports(&original.report, &report, &original.code, code);
                session.modified = Some(AnalysisSlot {
                    code: code.to_string(),
                    report: report.clone(),
                });
                PlaygroundOutcome {
                    report,
                    comparison: Some(comparison),
                }
            }
            None => {
                session.original = Some(AnalysisSlot {
                    code: code.to_string(),
                    report: report.clone(),
                });
                PlaygroundOutcome {
                    report,
                    comparison: None,
                }
            }
        }
    }

    /// Replace the original slot with the given code and report (the
    /// report is recomputed when not supplied). Clears the modified slot.
    pub async fn set_as_original(
        &self,
        code: &str,
        report: Option<Report>,
    ) -> Result<Report, ApiError> {
        let report = match report {
            Some(report) => report,
            None => analyze_contract(self.generator()?, Some(code), None).await?,
        };
        let mut session = self.session.write().await;
        session.original = Some(AnalysisSlot {
            code: code.to_string(),
            report: report.clone(),
        });
        session.modified = None;
        Ok(report)
    }

    /// Clear both comparison slots.
    pub async fn reset_comparison(&self) {
        let mut session = self.session.write().await;
        session.original = None;
        session.modified = None;
    }

    pub async fn has_original(&self) -> bool {
        self.session.read().await.original.is_some()
    }
}

fn map_explorer_error(err: ExplorerError) -> ApiError {
    match err {
        ExplorerError::NotVerified { .. } => ApiError::NotVerified(err.to_string()),
        ExplorerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
        ExplorerError::Upstream(message) => ApiError::UpstreamUnavailable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingGenerator {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!(
                r#"{{"contractName":"C{}","securityScore":{}}}"#,
                n,
                5 + n
            ))
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            Some(Arc::new(CountingGenerator {
                calls: AtomicU32::new(0),
            })),
            None,
        )
    }

    #[tokio::test]
    async fn missing_llm_key_is_config_error() {
        let orchestrator = Orchestrator::new(None, None);
        let err = orchestrator
            .analyze(Some("contract A {}"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ConfigMissing(_)));
    }

    #[tokio::test]
    async fn missing_explorer_key_is_config_error() {
        let orchestrator = orchestrator();
        let err = orchestrator
            .fetch_source("0x0000000000000000000000000000000000000001")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ConfigMissing(_)));
        let err = orchestrator
            .analyze_address("0x0000000000000000000000000000000000000001")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ConfigMissing(_)));
    }

    #[tokio::test]
    async fn invalid_address_fails_before_any_network_call() {
        // No explorer configured: a validation failure must win.
        let orchestrator = orchestrator();
        let err = orchestrator.fetch_source("0x123").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        let err = orchestrator.contract_info("bogus").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn playground_address_fails_before_touching_the_session() {
        let orchestrator = orchestrator();
        let err = orchestrator
            .playground_analyze_address("0x123")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        // No explorer configured: a valid address still cannot resolve.
        let err = orchestrator
            .playground_analyze_address("0x0000000000000000000000000000000000000001")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ConfigMissing(_)));
        assert!(!orchestrator.has_original().await);
    }

    #[tokio::test]
    async fn first_playground_analysis_becomes_original() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .playground_analyze("contract A {}")
            .await
            .unwrap();
        assert!(outcome.comparison.is_none());
        assert!(orchestrator.has_original().await);
    }

    #[tokio::test]
    async fn second_playground_analysis_is_compared() {
        let orchestrator = orchestrator();
        orchestrator
            .playground_analyze("contract A {}")
            .await
            .unwrap();
        let outcome = orchestrator
            .playground_analyze("contract A { function f() external {} }")
            .await
            .unwrap();

        let comparison = outcome.comparison.expect("comparison against original");
        // Scores come from the counting generator: 5 then 6.
        assert_eq!(comparison.security_score_change, 1.0);
    }

    #[tokio::test]
    async fn reset_clears_both_slots() {
        let orchestrator = orchestrator();
        orchestrator
            .playground_analyze("contract A {}")
            .await
            .unwrap();
        orchestrator
            .playground_analyze("contract B {}")
            .await
            .unwrap();
        orchestrator.reset_comparison().await;
        assert!(!orchestrator.has_original().await);

        let outcome = orchestrator
            .playground_analyze("contract C {}")
            .await
            .unwrap();
        assert!(outcome.comparison.is_none());
    }

    #[tokio::test]
    async fn set_as_original_replaces_slot_with_given_report() {
        let orchestrator = orchestrator();
        orchestrator
            .playground_analyze("contract A {}")
            .await
            .unwrap();

        let mut report: Report = serde_json::from_str("{}").unwrap();
        report.security_score = 9.0;
        orchestrator
            .set_as_original("contract B {}", Some(report))
            .await
            .unwrap();

        let outcome = orchestrator
            .playground_analyze("contract C {}")
            .await
            .unwrap();
        let comparison = outcome.comparison.unwrap();
        // Generator scores count up from 5; this is its second call.
        assert_eq!(comparison.security_score_change, 6.0 - 9.0);
    }
}
