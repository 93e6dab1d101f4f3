//! Per-source adapter scoring and failure handling.

mod common;

use common::{sample_sources, subject};
use duediligence_core::{
    adapter::{SourceAdapter, SAR_ACTION},
    aml_pep_source::AmlPepAdapter,
    config::EngineConfig,
    data_source::{CandidateEntry, StaticTableSource, UnavailableSource},
    finding::{Category, MatchKind, Severity},
    fraud_report_source::FraudReportAdapter,
    sanctions_source::SanctionsAdapter,
    subject::{Subject, SubjectRequest},
    types::source_ids,
};
use std::sync::Arc;

fn table(id: &str, entries: Vec<CandidateEntry>) -> Arc<StaticTableSource> {
    Arc::new(StaticTableSource::new(id, entries))
}

// ── Sanctions ───────────────────────────────────────────────────────

#[tokio::test]
async fn exact_sanctions_hit_scores_full_and_is_high_severity() {
    let config = EngineConfig::default();
    let adapter = SanctionsAdapter::new(sample_sources().sanctions, &config);

    let finding = adapter.check(&subject("Viktor Petrov Volkov")).await;
    assert!(!finding.source_failed);
    assert_eq!(finding.records.len(), 1);
    let hit = &finding.records[0];
    assert_eq!(hit.match_kind, MatchKind::Exact);
    assert_eq!(hit.severity, Severity::High);
    assert_eq!(hit.evidence_refs[0], "sanctions:SDN-1");
    assert_eq!(finding.source_risk_score, 1.0);
    assert!(finding.escalations.iter().any(|a| a == SAR_ACTION));
}

#[tokio::test]
async fn partial_sanctions_hit_reaches_high_tier_floor() {
    let config = EngineConfig::default();
    let adapter = SanctionsAdapter::new(sample_sources().sanctions, &config);

    let finding = adapter.check(&subject("Petrov Volkov")).await;
    assert_eq!(finding.records.len(), 1);
    assert_eq!(finding.records[0].match_kind, MatchKind::Partial);
    assert!(finding.source_risk_score * 10.0 >= config.tiers.high_score);
    assert!(finding.source_risk_score * 10.0 < config.tiers.critical_score);
}

#[tokio::test]
async fn sanctions_alias_hit_uses_alias_score() {
    let config = EngineConfig::default();
    let adapter = SanctionsAdapter::new(
        table(
            source_ids::SANCTIONS,
            vec![CandidateEntry::new("SDN-9", "Ivan Drago", Category::Sanction).with_alias("The Siberian Express")],
        ),
        &config,
    );
    let finding = adapter.check(&subject("The Siberian Express")).await;
    assert_eq!(finding.records[0].match_kind, MatchKind::AliasExact);
    assert!((finding.source_risk_score - config.sanctions.alias_exact_score).abs() < 1e-12);
}

#[tokio::test]
async fn clean_sanctions_lookup_scores_zero() {
    let adapter = SanctionsAdapter::new(sample_sources().sanctions, &EngineConfig::default());
    let finding = adapter.check(&subject("Maria Garcia")).await;
    assert!(!finding.source_failed);
    assert!(finding.records.is_empty());
    assert_eq!(finding.source_risk_score, 0.0);
}

// ── AML / PEP ───────────────────────────────────────────────────────

#[tokio::test]
async fn pep_hit_adds_jurisdiction_and_industry_modifiers() {
    let adapter = AmlPepAdapter::new(sample_sources().aml_pep, &EngineConfig::default());
    let subject = Subject::from_request(
        SubjectRequest::named("Elena Dubois")
            .with_jurisdiction("ru")
            .with_industry("Casino"),
    )
    .unwrap();

    let finding = adapter.check(&subject).await;
    assert_eq!(finding.records.len(), 1);
    assert_eq!(finding.records[0].category, Category::Pep);
    assert_eq!(finding.records[0].severity, Severity::Medium);
    assert!((finding.source_risk_score - (0.35 + 0.15 + 0.15)).abs() < 1e-9);
    assert!(finding.escalations.iter().any(|a| a.contains("RU")));
}

#[tokio::test]
async fn risky_jurisdiction_alone_is_not_a_finding() {
    let adapter = AmlPepAdapter::new(sample_sources().aml_pep, &EngineConfig::default());
    let subject = Subject::from_request(SubjectRequest::named("Maria Garcia").with_jurisdiction("KP")).unwrap();

    let finding = adapter.check(&subject).await;
    assert!(finding.records.is_empty());
    assert_eq!(finding.source_risk_score, 0.0);
}

#[tokio::test]
async fn aml_score_is_capped() {
    let config = EngineConfig::default();
    let adapter = AmlPepAdapter::new(
        table(
            source_ids::AML_PEP,
            vec![
                CandidateEntry::new("CR-1", "Nikolai Petrov", Category::CriminalRecord),
                CandidateEntry::new("PEP-1", "Nikolai Petrov", Category::Pep),
            ],
        ),
        &config,
    );
    let subject = Subject::from_request(SubjectRequest::named("Nikolai Petrov").with_jurisdiction("KP")).unwrap();

    let finding = adapter.check(&subject).await;
    assert_eq!(finding.records.len(), 2);
    assert_eq!(finding.source_risk_score, config.aml_pep.max_contribution);
}

// ── Fraud reports ───────────────────────────────────────────────────

#[tokio::test]
async fn verified_fraud_report_is_high_severity() {
    let adapter = FraudReportAdapter::criminal_fraud_site(sample_sources().criminal_fraud_site, &EngineConfig::default());
    assert_eq!(adapter.source_id(), source_ids::CRIMINAL_FRAUD_SITE);

    let finding = adapter.check(&subject("Nikolai Petrov")).await;
    assert_eq!(finding.records.len(), 1);
    assert_eq!(finding.records[0].severity, Severity::High);
    assert!((finding.source_risk_score - 0.7).abs() < 1e-12);
    assert!(finding.escalations.iter().any(|a| a == SAR_ACTION));
}

#[tokio::test]
async fn unverified_reports_are_capped_at_medium() {
    let adapter = FraudReportAdapter::community_fraud_db(
        table(
            source_ids::COMMUNITY_FRAUD_DB,
            vec![CandidateEntry::new("CM-7", "Maria Garcia", Category::CommunityReport).with_severity(Severity::High)],
        ),
        &EngineConfig::default(),
    );
    let finding = adapter.check(&subject("Maria Garcia")).await;
    assert_eq!(finding.records[0].severity, Severity::Medium);
}

/// Any number of unverified mentions stays below one verified report.
#[tokio::test]
async fn unverified_pile_never_outweighs_one_verified_report() {
    let config = EngineConfig::default();
    let many: Vec<CandidateEntry> = (0..25)
        .map(|i| CandidateEntry::new(format!("CM-{i}"), "Maria Garcia", Category::CommunityReport))
        .collect();
    let unverified = FraudReportAdapter::community_fraud_db(table(source_ids::COMMUNITY_FRAUD_DB, many), &config)
        .check(&subject("Maria Garcia"))
        .await;

    let verified = FraudReportAdapter::community_fraud_db(
        table(
            source_ids::COMMUNITY_FRAUD_DB,
            vec![CandidateEntry::new("CM-V", "Maria Garcia", Category::CommunityReport).verified()],
        ),
        &config,
    )
    .check(&subject("Maria Garcia"))
    .await;

    assert_eq!(unverified.records.len(), 25);
    assert!(unverified.source_risk_score < verified.source_risk_score);
}

#[tokio::test]
async fn corroborating_verified_reports_stay_within_cap() {
    let config = EngineConfig::default();
    let entries = (0..4)
        .map(|i| CandidateEntry::new(format!("FR-{i}"), "Nikolai Petrov", Category::CriminalRecord).verified())
        .collect();
    let finding = FraudReportAdapter::criminal_fraud_site(table(source_ids::CRIMINAL_FRAUD_SITE, entries), &config)
        .check(&subject("Nikolai Petrov"))
        .await;
    assert!(finding.source_risk_score > 0.7);
    assert!(finding.source_risk_score <= config.fraud_reports.max_contribution);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn upstream_failure_becomes_failed_finding() {
    let adapter = SanctionsAdapter::new(
        Arc::new(UnavailableSource::new("ofac-mirror", "connection refused")),
        &EngineConfig::default(),
    );
    let finding = adapter.check(&subject("Viktor Petrov Volkov")).await;
    assert!(finding.source_failed);
    assert_eq!(finding.source_risk_score, 0.0);
    assert!(finding.records.is_empty());
    assert!(finding
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("connection refused"));
}

/// A subject with no hits anywhere is clean in every source.
#[tokio::test]
async fn japanese_subject_is_clean_everywhere() {
    let config = EngineConfig::default();
    let sources = sample_sources();
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(SanctionsAdapter::new(sources.sanctions, &config)),
        Box::new(AmlPepAdapter::new(sources.aml_pep, &config)),
        Box::new(FraudReportAdapter::criminal_fraud_site(sources.criminal_fraud_site, &config)),
        Box::new(FraudReportAdapter::community_fraud_db(sources.community_fraud_db, &config)),
    ];
    let subject = subject("山田花子");
    for adapter in adapters {
        let finding = adapter.check(&subject).await;
        assert!(!finding.source_failed, "{} failed", adapter.source_id());
        assert!(finding.records.is_empty(), "{} had hits", adapter.source_id());
    }
}
