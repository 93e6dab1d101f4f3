//! Typed records and findings produced by source adapters.
//!
//! RULE: Records and findings are write-once. An adapter builds them,
//! the pipeline owns them, nothing mutates them afterwards.

use crate::types::SourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sanction,
    Pep,
    CriminalRecord,
    WatchList,
    CommunityReport,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sanction => "sanction",
            Self::Pep => "politically exposed person",
            Self::CriminalRecord => "criminal record",
            Self::WatchList => "watch list",
            Self::CommunityReport => "community report",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    AliasExact,
    Partial,
}

impl MatchKind {
    /// Tie-break rank: higher wins (Exact > AliasExact > Partial).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Exact => 3,
            Self::AliasExact => 2,
            Self::Partial => 1,
        }
    }
}

/// One candidate hit from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source_id: SourceId,
    pub candidate_name: String,
    pub candidate_aliases: BTreeSet<String>,
    pub category: Category,
    pub severity: Severity,
    pub match_score: f64,
    pub match_kind: MatchKind,
    pub evidence_refs: Vec<String>,
}

/// An adapter's complete output for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFinding {
    pub source_id: SourceId,
    pub records: Vec<SourceRecord>,
    pub source_risk_score: f64,
    pub source_failed: bool,
    pub failure_reason: Option<String>,
    /// Source-specific escalation steps, folded into the verdict's
    /// recommended actions.
    #[serde(default)]
    pub escalations: Vec<String>,
}

impl SourceFinding {
    /// A source that was consulted and had nothing on the subject.
    pub fn clean(source_id: impl Into<SourceId>) -> Self {
        Self {
            source_id: source_id.into(),
            records: Vec::new(),
            source_risk_score: 0.0,
            source_failed: false,
            failure_reason: None,
            escalations: Vec::new(),
        }
    }

    /// A source that could not be evaluated. Contributes zero risk but is
    /// kept for the audit trail.
    pub fn failed(source_id: impl Into<SourceId>, reason: impl Into<String>) -> Self {
        Self {
            failure_reason: Some(reason.into()),
            source_failed: true,
            ..Self::clean(source_id)
        }
    }

    pub fn with_records(
        source_id: impl Into<SourceId>,
        records: Vec<SourceRecord>,
        source_risk_score: f64,
        escalations: Vec<String>,
    ) -> Self {
        Self {
            records,
            source_risk_score,
            escalations,
            ..Self::clean(source_id)
        }
    }

    pub fn has_hits(&self) -> bool {
        !self.source_failed && !self.records.is_empty()
    }

    /// Records with `High` severity, ignoring failed findings.
    pub fn high_severity_records(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records
            .iter()
            .filter(move |r| !self.source_failed && r.severity == Severity::High)
    }
}
