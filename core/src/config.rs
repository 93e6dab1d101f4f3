//! Engine configuration — every scoring constant lives here.
//!
//! Literal weights and thresholds are tunable; the qualitative orderings
//! they must respect are enforced by `EngineConfig::validate()`.

use crate::aggregator::OVERALL_SCALE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

// ── Name matching ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub exact_score: f64,
    pub alias_exact_score: f64,
    pub partial_score: f64,
}

// ── Per-source scoring ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SanctionsScoring {
    /// Exact match on the primary name of any listed entry.
    pub exact_score: f64,
    pub alias_exact_score: f64,
    pub partial_score: f64,
    /// Floor applied to any hit at all.
    pub minimum_hit_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmlPepScoring {
    pub criminal_record_weight: f64,
    pub pep_weight: f64,
    pub watch_list_weight: f64,
    /// ISO country code (upper case) → additive modifier.
    pub jurisdiction_risk: BTreeMap<String, f64>,
    /// Industry key (lower case) → additive modifier.
    pub industry_risk: BTreeMap<String, f64>,
    pub max_contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudReportScoring {
    pub verified_weight: f64,
    pub unverified_weight: f64,
    /// Each further corroborating hit counts `decay` times the previous one.
    pub corroboration_decay: f64,
    pub max_contribution: f64,
}

// ── Aggregation ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub critical_score: f64,
    pub critical_findings: usize,
    pub high_score: f64,
    pub high_findings: usize,
    pub medium_score: f64,
    pub medium_findings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub adapter_timeout_ms: u64,
}

impl PipelineConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub sanctions: SanctionsScoring,
    pub aml_pep: AmlPepScoring,
    pub fraud_reports: FraudReportScoring,
    pub tiers: TierThresholds,
    pub pipeline: PipelineConfig,
}

impl EngineConfig {
    /// Load from `<data_dir>/engine_config.json`.
    /// In tests, use `EngineConfig::default()`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the orderings the engine relies on.
    pub fn validate(&self) -> anyhow::Result<()> {
        let m = &self.matcher;
        if !(m.exact_score > m.alias_exact_score && m.alias_exact_score > m.partial_score) {
            anyhow::bail!("matcher scores must satisfy exact > alias_exact > partial");
        }
        for (label, v) in [
            ("matcher.exact_score", m.exact_score),
            ("matcher.partial_score", m.partial_score),
            ("sanctions.exact_score", self.sanctions.exact_score),
            ("sanctions.minimum_hit_score", self.sanctions.minimum_hit_score),
            ("aml_pep.max_contribution", self.aml_pep.max_contribution),
            ("fraud_reports.max_contribution", self.fraud_reports.max_contribution),
            ("fraud_reports.corroboration_decay", self.fraud_reports.corroboration_decay),
        ] {
            if !(0.0..=1.0).contains(&v) {
                anyhow::bail!("{label} must be in [0, 1], got {v}");
            }
        }
        if m.partial_score <= 0.0 {
            anyhow::bail!("matcher.partial_score must be positive");
        }

        let s = &self.sanctions;
        if !(s.exact_score > s.alias_exact_score && s.alias_exact_score > s.partial_score) {
            anyhow::bail!("sanctions scores must satisfy exact > alias_exact > partial");
        }

        let a = &self.aml_pep;
        if !(a.criminal_record_weight >= a.pep_weight && a.pep_weight >= a.watch_list_weight) {
            anyhow::bail!("aml_pep weights must satisfy criminal_record >= pep >= watch_list");
        }
        for (label, v) in [
            ("aml_pep.criminal_record_weight", a.criminal_record_weight),
            ("aml_pep.watch_list_weight", a.watch_list_weight),
        ] {
            if !(0.0..=1.0).contains(&v) {
                anyhow::bail!("{label} must be in [0, 1], got {v}");
            }
        }
        for (table, risks) in [("jurisdiction_risk", &a.jurisdiction_risk), ("industry_risk", &a.industry_risk)] {
            if let Some((key, v)) = risks.iter().find(|(_, v)| !(0.0..=1.0).contains(*v)) {
                anyhow::bail!("aml_pep.{table}[{key}] must be in [0, 1], got {v}");
            }
        }

        let f = &self.fraud_reports;
        if f.verified_weight <= f.unverified_weight / (1.0 - f.corroboration_decay).max(f64::EPSILON) {
            anyhow::bail!(
                "fraud_reports.verified_weight must exceed the total any number of unverified mentions can reach"
            );
        }

        let t = &self.tiers;
        if !(t.critical_score > t.high_score && t.high_score > t.medium_score && t.medium_score > 0.0) {
            anyhow::bail!("tier score thresholds must be strictly descending and positive");
        }
        if !(t.critical_findings > t.high_findings && t.high_findings > t.medium_findings) {
            anyhow::bail!("tier finding-count thresholds must be strictly descending");
        }

        if s.exact_score * OVERALL_SCALE < t.critical_score {
            anyhow::bail!("an exact sanction hit must reach the critical tier");
        }
        if s.minimum_hit_score * OVERALL_SCALE < t.high_score {
            anyhow::bail!("any sanctions hit must reach at least the high tier");
        }

        if self.pipeline.adapter_timeout_ms == 0 {
            anyhow::bail!("pipeline.adapter_timeout_ms must be positive");
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig {
                exact_score: 1.0,
                alias_exact_score: 0.95,
                partial_score: 0.7,
            },
            sanctions: SanctionsScoring {
                exact_score: 1.0,
                alias_exact_score: 0.9,
                partial_score: 0.65,
                minimum_hit_score: 0.6,
            },
            aml_pep: AmlPepScoring {
                criminal_record_weight: 0.5,
                pep_weight: 0.35,
                watch_list_weight: 0.2,
                jurisdiction_risk: [
                    ("KP", 0.30),
                    ("IR", 0.30),
                    ("MM", 0.25),
                    ("SY", 0.25),
                    ("AF", 0.20),
                    ("RU", 0.15),
                    ("VE", 0.15),
                    ("PA", 0.10),
                    ("AE", 0.05),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
                industry_risk: [
                    ("casino", 0.15),
                    ("crypto", 0.15),
                    ("money_services", 0.10),
                    ("precious_metals", 0.10),
                    ("real_estate", 0.05),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
                max_contribution: 0.9,
            },
            fraud_reports: FraudReportScoring {
                verified_weight: 0.7,
                unverified_weight: 0.15,
                corroboration_decay: 0.5,
                max_contribution: 0.9,
            },
            tiers: TierThresholds {
                critical_score: 8.0,
                critical_findings: 5,
                high_score: 6.0,
                high_findings: 3,
                medium_score: 4.0,
                medium_findings: 1,
            },
            pipeline: PipelineConfig {
                adapter_timeout_ms: 10_000,
            },
        }
    }
}
