//! Risk aggregation: determinism, tiers, blocking and invariants.

mod common;

use common::{finding, record};
use duediligence_core::{
    aggregator::{RiskAggregator, RiskTier},
    config::EngineConfig,
    error::CheckError,
    finding::{Category, Severity, SourceFinding},
    types::source_ids,
};

fn aggregator() -> RiskAggregator {
    RiskAggregator::new(EngineConfig::default().tiers)
}

fn exact_sanction() -> SourceFinding {
    finding(
        source_ids::SANCTIONS,
        1.0,
        vec![record(source_ids::SANCTIONS, "Viktor Petrov Volkov", Category::Sanction, Severity::High)],
    )
}

#[test]
fn no_findings_is_low() {
    let verdict = aggregator().aggregate(&[]).unwrap();
    assert_eq!(verdict.tier, RiskTier::Low);
    assert_eq!(verdict.overall_score, 0.0);
    assert!(!verdict.block_transaction);
    assert!(!verdict.requires_approval);
}

#[test]
fn exact_sanction_is_critical_and_blocks() {
    let verdict = aggregator()
        .aggregate(&[
            exact_sanction(),
            SourceFinding::clean(source_ids::AML_PEP),
            SourceFinding::clean(source_ids::CRIMINAL_FRAUD_SITE),
            SourceFinding::clean(source_ids::COMMUNITY_FRAUD_DB),
        ])
        .unwrap();
    assert_eq!(verdict.tier, RiskTier::Critical);
    assert_eq!(verdict.overall_score, 10.0);
    assert_eq!(verdict.total_findings, 1);
    assert!(verdict.block_transaction);
    assert!(verdict.requires_approval);
}

#[test]
fn all_sources_failed_is_low_with_every_source_unavailable() {
    let findings: Vec<SourceFinding> = [
        source_ids::SANCTIONS,
        source_ids::AML_PEP,
        source_ids::CRIMINAL_FRAUD_SITE,
        source_ids::COMMUNITY_FRAUD_DB,
    ]
    .into_iter()
    .map(|id| SourceFinding::failed(id, "connection refused"))
    .collect();

    let verdict = aggregator().aggregate(&findings).unwrap();
    assert_eq!(verdict.tier, RiskTier::Low);
    assert_eq!(verdict.overall_score, 0.0);
    assert_eq!(verdict.total_findings, 0);
    assert!(!verdict.block_transaction);
    assert_eq!(verdict.unavailable_sources().count(), 4);
    assert_eq!(verdict.evaluated_sources().count(), 0);
}

/// A failed source never contributes risk, whatever it carries.
#[test]
fn failed_finding_contributes_nothing() {
    let mut broken = exact_sanction();
    broken.source_failed = true;
    broken.failure_reason = Some("timeout".into());

    let verdict = aggregator().aggregate(&[broken]).unwrap();
    assert_eq!(verdict.overall_score, 0.0);
    assert_eq!(verdict.total_findings, 0);
    assert_eq!(verdict.tier, RiskTier::Low);
}

#[test]
fn arrival_order_does_not_change_the_verdict() {
    let a = exact_sanction();
    let b = finding(
        source_ids::AML_PEP,
        0.35,
        vec![record(source_ids::AML_PEP, "Elena Dubois", Category::Pep, Severity::Medium)],
    );
    let c = SourceFinding::failed(source_ids::COMMUNITY_FRAUD_DB, "503");

    let agg = aggregator();
    let first = agg.aggregate(&[a.clone(), b.clone(), c.clone()]).unwrap();
    let second = agg.aggregate(&[c, b, a]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn aggregating_twice_gives_the_same_verdict() {
    let findings = vec![exact_sanction(), SourceFinding::clean(source_ids::AML_PEP)];
    let agg = aggregator();
    assert_eq!(agg.aggregate(&findings).unwrap(), agg.aggregate(&findings).unwrap());
}

#[test]
fn adding_a_finding_never_lowers_the_verdict() {
    let agg = aggregator();
    let base = vec![finding(
        source_ids::AML_PEP,
        0.45,
        vec![record(source_ids::AML_PEP, "Elena Dubois", Category::Pep, Severity::Medium)],
    )];
    let before = agg.aggregate(&base).unwrap();

    let mut more = base.clone();
    more.push(finding(
        source_ids::COMMUNITY_FRAUD_DB,
        0.15,
        vec![record(source_ids::COMMUNITY_FRAUD_DB, "Elena Dubois", Category::CommunityReport, Severity::Low)],
    ));
    let after = agg.aggregate(&more).unwrap();

    assert!(after.overall_score >= before.overall_score);
    assert!(after.tier >= before.tier);
}

/// Overall score is the worst source, not the sum of sources.
#[test]
fn overall_score_is_the_worst_source() {
    let verdict = aggregator()
        .aggregate(&[
            finding(source_ids::AML_PEP, 0.3, Vec::new()),
            finding(source_ids::COMMUNITY_FRAUD_DB, 0.25, Vec::new()),
        ])
        .unwrap();
    assert!((verdict.overall_score - 3.0).abs() < 1e-9);
    assert_eq!(verdict.tier, RiskTier::Low);
}

#[test]
fn one_high_severity_record_is_at_least_medium() {
    let verdict = aggregator()
        .aggregate(&[finding(
            source_ids::CRIMINAL_FRAUD_SITE,
            0.2,
            vec![record(source_ids::CRIMINAL_FRAUD_SITE, "Li Chen", Category::CriminalRecord, Severity::High)],
        )])
        .unwrap();
    assert_eq!(verdict.tier, RiskTier::Medium);
    assert!(!verdict.requires_approval);
}

#[test]
fn high_tier_requires_approval_without_blocking() {
    let verdict = aggregator()
        .aggregate(&[finding(source_ids::AML_PEP, 0.65, Vec::new())])
        .unwrap();
    assert_eq!(verdict.tier, RiskTier::High);
    assert!(verdict.requires_approval);
    assert!(!verdict.block_transaction);
}

/// Critical reached on moderate findings alone calls for review, not a block.
#[test]
fn critical_without_high_severity_findings_does_not_block() {
    let verdict = aggregator()
        .aggregate(&[finding(
            source_ids::AML_PEP,
            0.85,
            vec![record(source_ids::AML_PEP, "Elena Dubois", Category::Pep, Severity::Medium)],
        )])
        .unwrap();
    assert_eq!(verdict.tier, RiskTier::Critical);
    assert_eq!(verdict.total_findings, 0);
    assert!(!verdict.block_transaction);
    assert!(verdict.requires_approval);
    assert!(verdict
        .recommended_actions
        .iter()
        .any(|a| a.starts_with("Hold for senior compliance review")));
}

#[test]
fn duplicate_records_within_a_source_count_once() {
    let verdict = aggregator()
        .aggregate(&[finding(
            source_ids::CRIMINAL_FRAUD_SITE,
            0.7,
            vec![
                record(source_ids::CRIMINAL_FRAUD_SITE, "Nikolai Petrov", Category::CriminalRecord, Severity::High),
                record(source_ids::CRIMINAL_FRAUD_SITE, "NIKOLAI  PETROV", Category::CriminalRecord, Severity::High),
            ],
        )])
        .unwrap();
    assert_eq!(verdict.total_findings, 1);
}

#[test]
fn five_high_severity_findings_are_critical() {
    let names = ["A Alpha", "B Bravo", "C Charlie", "D Delta", "E Echo"];
    let records = names
        .iter()
        .map(|n| record(source_ids::AML_PEP, n, Category::CriminalRecord, Severity::High))
        .collect();
    let verdict = aggregator()
        .aggregate(&[finding(source_ids::AML_PEP, 0.5, records)])
        .unwrap();
    assert_eq!(verdict.total_findings, 5);
    assert_eq!(verdict.tier, RiskTier::Critical);
    assert!(verdict.block_transaction);
}

#[test]
fn escalations_are_folded_into_actions_once() {
    let mut a = finding(source_ids::AML_PEP, 0.5, Vec::new());
    a.escalations = vec!["Call the MLRO".into()];
    let mut b = finding(source_ids::COMMUNITY_FRAUD_DB, 0.1, Vec::new());
    b.escalations = vec!["Call the MLRO".into()];

    let verdict = aggregator().aggregate(&[a, b]).unwrap();
    let count = verdict
        .recommended_actions
        .iter()
        .filter(|x| x.as_str() == "Call the MLRO")
        .count();
    assert_eq!(count, 1);
}

#[test]
fn out_of_range_source_score_is_an_invariant_violation() {
    let result = aggregator().aggregate(&[finding(source_ids::AML_PEP, 1.5, Vec::new())]);
    assert!(matches!(result, Err(CheckError::AggregationInvariantViolation(_))));
}

#[test]
fn nan_source_score_is_an_invariant_violation() {
    let result = aggregator().aggregate(&[finding(source_ids::AML_PEP, f64::NAN, Vec::new())]);
    assert!(matches!(result, Err(CheckError::AggregationInvariantViolation(_))));
}
