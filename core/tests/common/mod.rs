//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use duediligence_core::{
    adapter::SourceAdapter,
    data_source::{CandidateEntry, StaticTableSource},
    finding::{Category, MatchKind, Severity, SourceFinding, SourceRecord},
    pipeline::SourceSet,
    subject::{Subject, SubjectRequest},
    types::source_ids,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn subject(name: &str) -> Subject {
    Subject::from_request(SubjectRequest::named(name)).unwrap()
}

/// Small in-memory tables covering every source.
pub fn sample_sources() -> SourceSet {
    SourceSet {
        sanctions: Arc::new(StaticTableSource::new(
            source_ids::SANCTIONS,
            vec![
                CandidateEntry::new("SDN-1", "Viktor Petrov Volkov", Category::Sanction)
                    .with_alias("Viktor Volkov"),
                CandidateEntry::new("SDN-2", "Golden Crescent Trading", Category::Sanction),
            ],
        )),
        aml_pep: Arc::new(StaticTableSource::new(
            source_ids::AML_PEP,
            vec![
                CandidateEntry::new("PEP-1", "Elena Dubois", Category::Pep),
                CandidateEntry::new("CR-1", "Nikolai Petrov", Category::CriminalRecord),
            ],
        )),
        criminal_fraud_site: Arc::new(StaticTableSource::new(
            source_ids::CRIMINAL_FRAUD_SITE,
            vec![CandidateEntry::new("FR-1", "Nikolai Petrov", Category::CriminalRecord).verified()],
        )),
        community_fraud_db: Arc::new(StaticTableSource::new(
            source_ids::COMMUNITY_FRAUD_DB,
            vec![
                CandidateEntry::new("CM-1", "Maria Garcia", Category::CommunityReport),
                CandidateEntry::new("CM-2", "Nikolai Petrov", Category::CommunityReport).verified(),
            ],
        )),
    }
}

pub fn record(source_id: &str, name: &str, category: Category, severity: Severity) -> SourceRecord {
    SourceRecord {
        source_id: source_id.to_string(),
        candidate_name: name.to_string(),
        candidate_aliases: Default::default(),
        category,
        severity,
        match_score: 1.0,
        match_kind: MatchKind::Exact,
        evidence_refs: vec![format!("{source_id}:{name}")],
    }
}

pub fn finding(source_id: &str, score: f64, records: Vec<SourceRecord>) -> SourceFinding {
    SourceFinding::with_records(source_id, records, score, Vec::new())
}

/// Returns a canned finding after an optional delay, counting calls.
pub struct FixedAdapter {
    pub id: String,
    pub finding: SourceFinding,
    pub delay: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl FixedAdapter {
    pub fn new(id: &str, finding: SourceFinding) -> Self {
        Self {
            id: id.to_string(),
            finding,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn clean(id: &str) -> Self {
        Self::new(id, SourceFinding::clean(id))
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SourceAdapter for FixedAdapter {
    fn source_id(&self) -> &str {
        &self.id
    }

    async fn check(&self, _subject: &Subject) -> SourceFinding {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finding.clone()
    }
}

/// Breaks the "never panic" rule.
pub struct PanickingAdapter;

#[async_trait]
impl SourceAdapter for PanickingAdapter {
    fn source_id(&self) -> &str {
        "panicking"
    }

    async fn check(&self, _subject: &Subject) -> SourceFinding {
        panic!("upstream client bug");
    }
}

/// Answers `source_id()` once, at registration, and panics on every later call.
pub struct OneShotIdAdapter {
    asked: std::sync::atomic::AtomicBool,
}

impl OneShotIdAdapter {
    pub fn new() -> Self {
        Self {
            asked: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SourceAdapter for OneShotIdAdapter {
    fn source_id(&self) -> &str {
        if self.asked.swap(true, Ordering::SeqCst) {
            panic!("source id requested twice");
        }
        "one_shot"
    }

    async fn check(&self, _subject: &Subject) -> SourceFinding {
        SourceFinding::clean(self.source_id())
    }
}
