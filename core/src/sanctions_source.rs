//! Sanctions source adapter.
//!
//! Scoring:
//!   - An exact match on a sanctions list scores high enough to force the
//!     whole check to Critical on its own.
//!   - Any other match is floored at a score that forces at least High.
//!   - The source score is the strongest single hit; hits do not add up.

use crate::{
    adapter::{fetch_candidates, match_candidates, requires_sar, to_record, SourceAdapter, SAR_ACTION},
    config::{EngineConfig, SanctionsScoring},
    data_source::{CandidateEntry, RecordSource},
    finding::{Category, MatchKind, Severity, SourceFinding, SourceRecord},
    name_matcher::NameMatcher,
    subject::Subject,
    types::source_ids,
};
use async_trait::async_trait;
use std::sync::Arc;

const FREEZE_ACTION: &str =
    "Freeze pending transactions and refer the case to the sanctions compliance officer";
const ADJUDICATE_ACTION: &str =
    "Manually adjudicate the potential sanctions match against identity documents";

pub struct SanctionsAdapter {
    source: Arc<dyn RecordSource>,
    matcher: NameMatcher,
    scoring: SanctionsScoring,
}

impl SanctionsAdapter {
    pub fn new(source: Arc<dyn RecordSource>, config: &EngineConfig) -> Self {
        Self {
            source,
            matcher: NameMatcher::new(config.matcher.clone()),
            scoring: config.sanctions.clone(),
        }
    }

    /// Sanction entries and exact hits are always High, whatever the
    /// upstream says.
    fn severity_for(entry: &CandidateEntry, kind: MatchKind) -> Severity {
        if entry.category == Category::Sanction || kind == MatchKind::Exact {
            return Severity::High;
        }
        entry.severity.unwrap_or(match entry.category {
            Category::CriminalRecord => Severity::High,
            _ => Severity::Medium,
        })
    }

    /// Score of a single record.
    pub fn record_score(&self, record: &SourceRecord) -> f64 {
        let raw = match record.match_kind {
            MatchKind::Exact => self.scoring.exact_score,
            MatchKind::AliasExact => self.scoring.alias_exact_score,
            MatchKind::Partial => self.scoring.partial_score,
        };
        raw.max(self.scoring.minimum_hit_score).clamp(0.0, 1.0)
    }

    /// Strongest single hit, or zero when there are none.
    pub fn score_records(&self, records: &[SourceRecord]) -> f64 {
        records
            .iter()
            .map(|r| self.record_score(r))
            .fold(0.0, f64::max)
    }

    fn escalations(records: &[SourceRecord]) -> Vec<String> {
        let mut actions = Vec::new();
        let confirmed = records
            .iter()
            .any(|r| r.match_kind != MatchKind::Partial && r.category == Category::Sanction);
        if requires_sar(records) {
            actions.push(SAR_ACTION.to_string());
        }
        if confirmed {
            actions.push(FREEZE_ACTION.to_string());
        }
        if records.iter().any(|r| r.match_kind == MatchKind::Partial) {
            actions.push(ADJUDICATE_ACTION.to_string());
        }
        actions
    }
}

#[async_trait]
impl SourceAdapter for SanctionsAdapter {
    fn source_id(&self) -> &str {
        source_ids::SANCTIONS
    }

    async fn check(&self, subject: &Subject) -> SourceFinding {
        let candidates = match fetch_candidates(self.source_id(), self.source.as_ref(), subject).await {
            Ok(c) => c,
            Err(failed) => return failed,
        };

        let records: Vec<SourceRecord> = match_candidates(&self.matcher, subject, candidates)
            .into_iter()
            .map(|(entry, found)| to_record(self.source_id(), &entry, found, Self::severity_for(&entry, found.kind)))
            .collect();

        if records.is_empty() {
            return SourceFinding::clean(self.source_id());
        }

        let score = self.score_records(&records);
        let escalations = Self::escalations(&records);
        log::debug!(
            "Sanctions: {} hit(s) for '{}', score {score:.2}",
            records.len(),
            subject.primary_name()
        );
        SourceFinding::with_records(self.source_id(), records, score, escalations)
    }
}
