//! Verdict report building — structured output, no free-form prose.
//!
//! The summary is templated from the tier and finding counts only.
//! Any narrative rendering happens downstream and is non-authoritative.

use crate::{
    aggregator::{AggregateVerdict, RiskTier},
    finding::{SourceFinding, SourceRecord},
    subject::Subject,
    types::{CheckId, SourceId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNAVAILABLE_LABEL: &str = "unavailable — not evaluated";
pub const EVALUATED_LABEL: &str = "evaluated";
pub const DISCLAIMER: &str = "This report supports a human compliance decision. \
It is not an automatically approved or automatically denied outcome.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Evaluated,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSection {
    pub source_id: SourceId,
    pub status: SourceStatus,
    pub status_label: String,
    pub source_risk_score: f64,
    pub records: Vec<SourceRecord>,
    pub failure_reason: Option<String>,
}

impl SourceSection {
    fn from_finding(finding: &SourceFinding) -> Self {
        let (status, status_label) = if finding.source_failed {
            (SourceStatus::Unavailable, UNAVAILABLE_LABEL)
        } else {
            (SourceStatus::Evaluated, EVALUATED_LABEL)
        };
        Self {
            source_id: finding.source_id.clone(),
            status,
            status_label: status_label.to_string(),
            source_risk_score: if finding.source_failed { 0.0 } else { finding.source_risk_score },
            records: finding.records.clone(),
            failure_reason: finding.failure_reason.clone(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.status == SourceStatus::Unavailable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub check_id: Option<CheckId>,
    pub generated_at: DateTime<Utc>,
    pub subject: Subject,
    pub tier: RiskTier,
    pub overall_score: f64,
    pub total_findings: usize,
    pub block_transaction: bool,
    pub requires_approval: bool,
    pub summary: String,
    /// One section per source, grouped by source id.
    pub sources: Vec<SourceSection>,
    pub next_steps: Vec<String>,
    pub audit_notes: Vec<String>,
    pub disclaimer: String,
}

impl Report {
    pub fn section(&self, source_id: &str) -> Option<&SourceSection> {
        self.sources.iter().find(|s| s.source_id == source_id)
    }

    pub fn unavailable_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.is_unavailable())
            .map(|s| s.source_id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerdictReportBuilder {
    check_id: Option<CheckId>,
}

impl VerdictReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_check(check_id: impl Into<CheckId>) -> Self {
        Self {
            check_id: Some(check_id.into()),
        }
    }

    pub fn build(&self, subject: &Subject, verdict: &AggregateVerdict) -> Report {
        let sources: Vec<SourceSection> = verdict
            .contributing_findings
            .iter()
            .map(SourceSection::from_finding)
            .collect();

        let audit_notes = verdict
            .unavailable_sources()
            .map(|f| {
                format!(
                    "Source '{}' {}: {}",
                    f.source_id,
                    UNAVAILABLE_LABEL,
                    f.failure_reason.as_deref().unwrap_or("no reason reported")
                )
            })
            .collect();

        Report {
            check_id: self.check_id.clone(),
            generated_at: Utc::now(),
            subject: subject.clone(),
            tier: verdict.tier,
            overall_score: verdict.overall_score,
            total_findings: verdict.total_findings,
            block_transaction: verdict.block_transaction,
            requires_approval: verdict.requires_approval,
            summary: summary_text(verdict),
            sources,
            next_steps: verdict.recommended_actions.clone(),
            audit_notes,
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

fn summary_text(verdict: &AggregateVerdict) -> String {
    let evaluated = verdict.evaluated_sources().count();
    let unavailable = verdict.unavailable_sources().count();
    let outcome = match verdict.tier {
        RiskTier::Low => "No adverse information was found in the evaluated sources.",
        RiskTier::Medium => "Adverse indicators warrant enhanced monitoring.",
        RiskTier::High => "Compliance approval is required before proceeding.",
        RiskTier::Critical if verdict.block_transaction => {
            "The transaction must be blocked pending investigation."
        }
        RiskTier::Critical => {
            "Senior compliance review is required before any transaction proceeds."
        }
    };
    format!(
        "Risk tier {} (score {:.1}/10). {} high-severity finding(s) across {} evaluated source(s); {} source(s) unavailable. {}",
        verdict.tier.label(),
        verdict.overall_score,
        verdict.total_findings,
        evaluated,
        unavailable,
        outcome
    )
}
