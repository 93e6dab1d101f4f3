//! Fraud-report source adapters: criminal/fraud report sites and the
//! community-reported fraud database.
//!
//! Both are binary-weighted. Any verified hit is High severity no matter
//! how many there are. Further hits corroborate with diminishing returns,
//! so a pile of unverified mentions can never outweigh a single verified
//! report.

use crate::{
    adapter::{
        diminishing_sum, fetch_candidates, match_candidates, requires_sar, to_record,
        SourceAdapter, SAR_ACTION,
    },
    config::{EngineConfig, FraudReportScoring},
    data_source::{CandidateEntry, RecordSource},
    finding::{Severity, SourceFinding, SourceRecord},
    name_matcher::NameMatcher,
    subject::Subject,
    types::source_ids,
};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudReportKind {
    CriminalFraudSite,
    CommunityFraudDb,
}

impl FraudReportKind {
    pub fn source_id(&self) -> &'static str {
        match self {
            Self::CriminalFraudSite => source_ids::CRIMINAL_FRAUD_SITE,
            Self::CommunityFraudDb => source_ids::COMMUNITY_FRAUD_DB,
        }
    }

    fn verified_action(&self) -> &'static str {
        match self {
            Self::CriminalFraudSite => {
                "Obtain and review the published fraud or court records before proceeding"
            }
            Self::CommunityFraudDb => {
                "Review verified community fraud reports with the fraud operations team"
            }
        }
    }
}

const UNVERIFIED_ACTION: &str = "Record unverified fraud mentions in the case file for context";

pub struct FraudReportAdapter {
    kind: FraudReportKind,
    source: Arc<dyn RecordSource>,
    matcher: NameMatcher,
    scoring: FraudReportScoring,
}

impl FraudReportAdapter {
    pub fn new(kind: FraudReportKind, source: Arc<dyn RecordSource>, config: &EngineConfig) -> Self {
        Self {
            kind,
            source,
            matcher: NameMatcher::new(config.matcher.clone()),
            scoring: config.fraud_reports.clone(),
        }
    }

    pub fn criminal_fraud_site(source: Arc<dyn RecordSource>, config: &EngineConfig) -> Self {
        Self::new(FraudReportKind::CriminalFraudSite, source, config)
    }

    pub fn community_fraud_db(source: Arc<dyn RecordSource>, config: &EngineConfig) -> Self {
        Self::new(FraudReportKind::CommunityFraudDb, source, config)
    }

    pub fn kind(&self) -> FraudReportKind {
        self.kind
    }

    /// Verified hits are always High; unverified ones never exceed Medium.
    fn severity_for(entry: &CandidateEntry) -> Severity {
        if entry.verified {
            Severity::High
        } else {
            entry.severity.unwrap_or(Severity::Low).min(Severity::Medium)
        }
    }

    /// High-severity records are the verified ones.
    pub fn score_records(&self, records: &[SourceRecord]) -> f64 {
        let weights = records
            .iter()
            .map(|r| {
                let weight = if r.severity == Severity::High {
                    self.scoring.verified_weight
                } else {
                    self.scoring.unverified_weight
                };
                weight * r.match_score
            })
            .collect();
        diminishing_sum(weights, self.scoring.corroboration_decay)
            .min(self.scoring.max_contribution)
            .clamp(0.0, 1.0)
    }

    fn escalations(&self, records: &[SourceRecord]) -> Vec<String> {
        let mut actions = Vec::new();
        let verified = records.iter().any(|r| r.severity == Severity::High);
        if verified && requires_sar(records) {
            actions.push(SAR_ACTION.to_string());
        }
        if verified {
            actions.push(self.kind.verified_action().to_string());
        } else {
            actions.push(UNVERIFIED_ACTION.to_string());
        }
        actions
    }
}

#[async_trait]
impl SourceAdapter for FraudReportAdapter {
    fn source_id(&self) -> &str {
        self.kind.source_id()
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

        let score = self.score_records(&records);
        let escalations = self.escalations(&records);
        SourceFinding::with_records(self.source_id(), records, score, escalations)
    }
}
