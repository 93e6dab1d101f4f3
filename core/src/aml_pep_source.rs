//! AML / PEP source adapter.
//!
//! Scoring is additive within the source:
//!   score = Σ weight(category) × match_score
//!         + jurisdiction modifier + industry modifier
//! capped at the source's max contribution. Modifiers only apply when the
//! subject actually has hits; a clean lookup always scores zero.

use crate::{
    adapter::{fetch_candidates, match_candidates, requires_sar, to_record, SourceAdapter, SAR_ACTION},
    config::{AmlPepScoring, EngineConfig},
    data_source::{CandidateEntry, RecordSource},
    finding::{Category, Severity, SourceFinding, SourceRecord},
    name_matcher::NameMatcher,
    subject::Subject,
    types::source_ids,
};
use async_trait::async_trait;
use std::sync::Arc;

const EDD_ACTION: &str =
    "Perform enhanced due diligence including source-of-funds and source-of-wealth verification";
const SENIOR_SIGNOFF_ACTION: &str =
    "Obtain senior management sign-off for the politically exposed person relationship";

pub struct AmlPepAdapter {
    source: Arc<dyn RecordSource>,
    matcher: NameMatcher,
    scoring: AmlPepScoring,
}

impl AmlPepAdapter {
    pub fn new(source: Arc<dyn RecordSource>, config: &EngineConfig) -> Self {
        Self {
            source,
            matcher: NameMatcher::new(config.matcher.clone()),
            scoring: config.aml_pep.clone(),
        }
    }

    fn severity_for(entry: &CandidateEntry) -> Severity {
        entry.severity.unwrap_or(match entry.category {
            Category::CriminalRecord | Category::Sanction => Severity::High,
            Category::Pep => Severity::Medium,
            Category::WatchList | Category::CommunityReport => Severity::Low,
        })
    }

    fn category_weight(&self, category: Category) -> f64 {
        match category {
            Category::CriminalRecord | Category::Sanction => self.scoring.criminal_record_weight,
            Category::Pep => self.scoring.pep_weight,
            Category::WatchList | Category::CommunityReport => self.scoring.watch_list_weight,
        }
    }

    pub fn jurisdiction_modifier(&self, subject: &Subject) -> f64 {
        subject
            .jurisdiction()
            .and_then(|j| self.scoring.jurisdiction_risk.get(j))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn industry_modifier(&self, subject: &Subject) -> f64 {
        subject
            .industry()
            .and_then(|i| self.scoring.industry_risk.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn score_records(&self, subject: &Subject, records: &[SourceRecord]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        let base: f64 = records
            .iter()
            .map(|r| self.category_weight(r.category) * r.match_score)
            .sum();
        let total = base + self.jurisdiction_modifier(subject) + self.industry_modifier(subject);
        total.min(self.scoring.max_contribution).clamp(0.0, 1.0)
    }

    fn escalations(&self, subject: &Subject, records: &[SourceRecord]) -> Vec<String> {
        let mut actions = Vec::new();
        if requires_sar(records) {
            actions.push(SAR_ACTION.to_string());
        }
        if records.iter().any(|r| r.category == Category::Pep) {
            actions.push(EDD_ACTION.to_string());
            actions.push(SENIOR_SIGNOFF_ACTION.to_string());
        }
        if self.jurisdiction_modifier(subject) > 0.0 {
            if let Some(j) = subject.jurisdiction() {
                actions.push(format!(
                    "Document the geographic risk rationale for high-risk jurisdiction {j}"
                ));
            }
        }
        if self.industry_modifier(subject) > 0.0 {
            if let Some(i) = subject.industry() {
                actions.push(format!("Apply sector-specific AML controls for industry '{i}'"));
            }
        }
        actions
    }
}

#[async_trait]
impl SourceAdapter for AmlPepAdapter {
    fn source_id(&self) -> &str {
        source_ids::AML_PEP
    }

    async fn check(&self, subject: &Subject) -> SourceFinding {
        let candidates = match fetch_candidates(self.source_id(), self.source.as_ref(), subject).await {
            Ok(c) => c,
            Err(failed) => return failed,
        };

        let records: Vec<SourceRecord> = match_candidates(&self.matcher, subject, candidates)
            .into_iter()
            .map(|(entry, found)| to_record(self.source_id(), &entry, found, Self::severity_for(&entry)))
            .collect();

        if records.is_empty() {
            return SourceFinding::clean(self.source_id());
        }

        let score = self.score_records(subject, &records);
        let escalations = self.escalations(subject, &records);
        SourceFinding::with_records(self.source_id(), records, score, escalations)
    }
}
