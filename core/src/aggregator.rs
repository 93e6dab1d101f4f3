//! Risk aggregation — combines per-source findings into one verdict.
//!
//! RULES:
//!   - aggregate() is a pure function of its input. Same set of findings,
//!     same verdict, bit for bit, regardless of arrival order.
//!   - The worst single source sets the baseline score (max, not sum).
//!   - The tier is derived only from the overall score and the count of
//!     high-severity records. Nothing sets it directly.
//!   - Out-of-range scores are programmer errors and are reported, never
//!     clamped here. Clamping belongs in adapters.

use crate::{
    config::TierThresholds,
    error::{CheckError, CheckResult},
    finding::{Category, SourceFinding},
    name_matcher::NameMatcher,
    types::SourceId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Multiplier from the [0, 1] source scale to the [0, 10] overall scale.
pub const OVERALL_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    /// Ordered thresholds, first match wins.
    pub fn classify(overall_score: f64, high_findings: usize, t: &TierThresholds) -> Self {
        if overall_score >= t.critical_score || high_findings >= t.critical_findings {
            Self::Critical
        } else if overall_score >= t.high_score || high_findings >= t.high_findings {
            Self::High
        } else if overall_score >= t.medium_score || high_findings >= t.medium_findings {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Tier-specific standard actions. A Critical verdict that is not a hard
/// block gets review actions instead of block actions.
pub fn tier_actions(tier: RiskTier, block_transaction: bool) -> &'static [&'static str] {
    match (tier, block_transaction) {
        (RiskTier::Low, _) => &[
            "Continue standard KYC onboarding",
            "Schedule periodic rescreening at the standard review interval",
        ],
        (RiskTier::Medium, _) => &[
            "Apply enhanced transaction monitoring",
            "Request additional identity verification documents",
        ],
        (RiskTier::High, _) => &[
            "Hold the transaction pending compliance officer approval",
            "Perform enhanced due diligence before onboarding",
        ],
        (RiskTier::Critical, true) => &[
            "Block the transaction and all pending activity",
            "Escalate immediately to the money laundering reporting officer (MLRO)",
        ],
        (RiskTier::Critical, false) => &[
            "Hold for senior compliance review before any transaction proceeds",
            "Escalate to the money laundering reporting officer (MLRO)",
        ],
    }
}

/// Immutable result of one aggregation. Recomputed, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateVerdict {
    pub overall_score: f64,
    pub tier: RiskTier,
    /// Distinct high-severity records across all evaluated sources.
    pub total_findings: usize,
    pub block_transaction: bool,
    pub requires_approval: bool,
    /// Every finding, failed ones included, ordered by source id.
    pub contributing_findings: Vec<SourceFinding>,
    pub recommended_actions: Vec<String>,
}

impl AggregateVerdict {
    pub fn unavailable_sources(&self) -> impl Iterator<Item = &SourceFinding> {
        self.contributing_findings.iter().filter(|f| f.source_failed)
    }

    pub fn evaluated_sources(&self) -> impl Iterator<Item = &SourceFinding> {
        self.contributing_findings.iter().filter(|f| !f.source_failed)
    }
}

#[derive(Debug, Clone)]
pub struct RiskAggregator {
    thresholds: TierThresholds,
}

impl RiskAggregator {
    pub fn new(thresholds: TierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn aggregate(&self, findings: &[SourceFinding]) -> CheckResult<AggregateVerdict> {
        let mut ordered: Vec<SourceFinding> = findings.to_vec();
        ordered.sort_by(|a, b| a.source_id.cmp(&b.source_id));

        for finding in &ordered {
            check_invariants(finding)?;
        }

        let baseline = ordered
            .iter()
            .filter(|f| !f.source_failed)
            .map(|f| f.source_risk_score)
            .fold(0.0, f64::max);
        let overall_score = baseline * OVERALL_SCALE;
        if !(0.0..=OVERALL_SCALE).contains(&overall_score) {
            return Err(CheckError::AggregationInvariantViolation(format!(
                "overall score {overall_score} outside [0, {OVERALL_SCALE}]"
            )));
        }

        let high_records: BTreeSet<(SourceId, String, Category)> = ordered
            .iter()
            .flat_map(|f| f.high_severity_records())
            .map(|r| {
                (
                    r.source_id.clone(),
                    NameMatcher::normalize(&r.candidate_name),
                    r.category,
                )
            })
            .collect();
        let total_findings = high_records.len();

        let tier = RiskTier::classify(overall_score, total_findings, &self.thresholds);
        // Critical on moderate findings alone means human review, not a hard block.
        let block_transaction = tier == RiskTier::Critical && total_findings > 0;
        let requires_approval = tier >= RiskTier::High;

        let mut recommended_actions: Vec<String> = tier_actions(tier, block_transaction)
            .iter()
            .map(|a| a.to_string())
            .collect();
        for action in ordered
            .iter()
            .filter(|f| !f.source_failed)
            .flat_map(|f| f.escalations.iter())
        {
            if !recommended_actions.contains(action) {
                recommended_actions.push(action.clone());
            }
        }

        Ok(AggregateVerdict {
            overall_score,
            tier,
            total_findings,
            block_transaction,
            requires_approval,
            contributing_findings: ordered,
            recommended_actions,
        })
    }
}

fn check_invariants(finding: &SourceFinding) -> CheckResult<()> {
    let score = finding.source_risk_score;
    if !(0.0..=1.0).contains(&score) {
        return Err(CheckError::AggregationInvariantViolation(format!(
            "source '{}' risk score {score} outside [0, 1]",
            finding.source_id
        )));
    }
    for record in &finding.records {
        if !(0.0..=1.0).contains(&record.match_score) {
            return Err(CheckError::AggregationInvariantViolation(format!(
                "source '{}' record '{}' match score {} outside [0, 1]",
                finding.source_id, record.candidate_name, record.match_score
            )));
        }
    }
    Ok(())
}
