//! Structured diff of two analysis reports plus a line diff of the two
//! source texts, with a deterministic improvement verdict.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

use crate::ai::report::{FunctionInfo, Report, RiskInfo};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Modified<T> {
    pub before: T,
    pub after: T,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskChanges {
    pub added: Vec<RiskInfo>,
    pub removed: Vec<RiskInfo>,
    pub modified: Vec<Modified<RiskInfo>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionChanges {
    pub added: Vec<FunctionInfo>,
    pub removed: Vec<FunctionInfo>,
    pub modified: Vec<Modified<FunctionInfo>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Unchanged,
}

/// One diff chunk; `line_number` is the 1-based chunk ordinal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChange {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub value: String,
    pub line_number: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Improvement {
    Better,
    Worse,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub security_score_change: f64,
    pub risk_changes: RiskChanges,
    pub function_changes: FunctionChanges,
    pub code_changes: Vec<CodeChange>,
    pub summary: String,
    pub improvement: Improvement,
}

/// Compare two reports and their source texts.
///
/// Risks are keyed by `title`, functions by `name`; every key lands in
/// exactly one of added/removed/modified or implicitly unchanged.
pub fn compare_reports(
    original: &Report,
    modified: &Report,
    original_code: &str,
    modified_code: &str,
) -> ComparisonResult {
    let security_score_change = modified.security_score - original.security_score;

    let risk_changes = RiskChanges {
        added: modified
            .risks
            .iter()
            .filter(|risk| !original.risks.iter().any(|o| o.title == risk.title))
            .cloned()
            .collect(),
        removed: original
            .risks
            .iter()
            .filter(|risk| !modified.risks.iter().any(|m| m.title == risk.title))
            .cloned()
            .collect(),
        modified: original
            .risks
            .iter()
            .filter_map(|before| {
                modified
                    .risks
                    .iter()
                    .find(|m| m.title == before.title)
                    .filter(|after| {
                        after.level != before.level || after.description != before.description
                    })
                    .map(|after| Modified {
                        before: before.clone(),
                        after: after.clone(),
                    })
            })
            .collect(),
    };

    let function_changes = FunctionChanges {
        added: modified
            .functions
            .iter()
            .filter(|func| !original.functions.iter().any(|o| o.name == func.name))
            .cloned()
            .collect(),
        removed: original
            .functions
            .iter()
            .filter(|func| !modified.functions.iter().any(|m| m.name == func.name))
            .cloned()
            .collect(),
        modified: original
            .functions
            .iter()
            .filter_map(|before| {
                modified
                    .functions
                    .iter()
                    .find(|m| m.name == before.name)
                    .filter(|after| after.risk != before.risk || after.access != before.access)
                    .map(|after| Modified {
                        before: before.clone(),
                        after: after.clone(),
                    })
            })
            .collect(),
    };

    let code_changes = diff_code(original_code, modified_code);
    let (summary, improvement) =
        summarize(security_score_change, &risk_changes, &function_changes);

    ComparisonResult {
        security_score_change,
        risk_changes,
        function_changes,
        code_changes,
        summary,
        improvement,
    }
}

/// Line-granularity diff grouped into chunks of consecutive lines sharing
/// one change type, in document order.
fn diff_code(original_code: &str, modified_code: &str) -> Vec<CodeChange> {
    let diff = TextDiff::from_lines(original_code, modified_code);
    let mut chunks: Vec<(ChangeKind, String)> = Vec::new();

    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Insert => ChangeKind::Added,
            ChangeTag::Delete => ChangeKind::Removed,
            ChangeTag::Equal => ChangeKind::Unchanged,
        };
        match chunks.last_mut() {
            Some((last_kind, value)) if *last_kind == kind => value.push_str(change.value()),
            _ => chunks.push((kind, change.value().to_string())),
        }
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, (kind, value))| CodeChange {
            kind,
            value,
            line_number: index + 1,
        })
        .collect()
}

/// Deterministic verdict: score delta first, then new risks force `worse`,
/// then resolved risks override to `better`.
fn summarize(
    score_change: f64,
    risks: &RiskChanges,
    functions: &FunctionChanges,
) -> (String, Improvement) {
    let mut summary = String::new();
    let mut improvement = Improvement::Neutral;

    if score_change > 0.0 {
        summary.push_str(&format!(
            "Security score improved by {:.1} points. ",
            score_change
        ));
        improvement = Improvement::Better;
    } else if score_change < 0.0 {
        summary.push_str(&format!(
            "Security score decreased by {:.1} points. ",
            score_change.abs()
        ));
        improvement = Improvement::Worse;
    } else {
        summary.push_str("Security score remained the same. ");
    }

    if !risks.added.is_empty() {
        summary.push_str(&format!("{} new risk(s) introduced. ", risks.added.len()));
        improvement = Improvement::Worse;
    }

    if !risks.removed.is_empty() {
        summary.push_str(&format!("{} risk(s) resolved. ", risks.removed.len()));
        improvement = Improvement::Better;
    }

    if !functions.added.is_empty() {
        summary.push_str(&format!(
            "{} new function(s) added. ",
            functions.added.len()
        ));
    }

    if !functions.removed.is_empty() {
        summary.push_str(&format!(
            "{} function(s) removed. ",
            functions.removed.len()
        ));
    }

    let summary = summary.trim().to_string();
    let summary = if summary.is_empty() {
        "No significant changes detected.".to_string()
    } else {
        summary
    };

    (summary, improvement)
}
