//! Source adapter trait and the helpers every adapter shares.
//!
//! RULE: `check()` never fails. "Nothing found" is a clean finding,
//! an upstream error is a failed finding. Nothing else leaves an adapter.

use crate::{
    data_source::{CandidateEntry, RecordSource},
    finding::{Category, Severity, SourceFinding, SourceRecord},
    name_matcher::{NameMatch, NameMatcher},
    subject::Subject,
};
use async_trait::async_trait;

pub const SAR_ACTION: &str =
    "File a suspicious-activity report (SAR) with the financial intelligence unit";

/// The contract every source must fulfil to plug into the pipeline.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable id the adapter is registered under.
    fn source_id(&self) -> &str;

    /// Screen one subject. Must not panic or error for expected outcomes.
    async fn check(&self, subject: &Subject) -> SourceFinding;
}

/// Fetch candidates, or the failed finding to return instead.
pub(crate) async fn fetch_candidates(
    source_id: &str,
    source: &dyn RecordSource,
    subject: &Subject,
) -> Result<Vec<CandidateEntry>, SourceFinding> {
    source.lookup(subject).await.map_err(|e| {
        log::warn!("Source '{source_id}' ({}) failed: {e}", source.name());
        SourceFinding::failed(source_id, e.to_string())
    })
}

/// Match every candidate against the subject; non-matching candidates are
/// dropped. Output order follows the upstream order.
pub(crate) fn match_candidates(
    matcher: &NameMatcher,
    subject: &Subject,
    candidates: Vec<CandidateEntry>,
) -> Vec<(CandidateEntry, NameMatch)> {
    candidates
        .into_iter()
        .filter_map(|entry| {
            let found = matcher.match_names(
                subject.all_names(),
                &entry.name,
                entry.aliases.iter().map(String::as_str),
            )?;
            Some((entry, found))
        })
        .collect()
}

pub(crate) fn to_record(
    source_id: &str,
    entry: &CandidateEntry,
    found: NameMatch,
    severity: Severity,
) -> SourceRecord {
    let mut evidence_refs = vec![format!("{source_id}:{}", entry.entry_id)];
    evidence_refs.extend(entry.evidence_refs.iter().cloned());
    SourceRecord {
        source_id: source_id.to_string(),
        candidate_name: entry.name.clone(),
        candidate_aliases: entry.aliases.iter().cloned().collect(),
        category: entry.category,
        severity,
        match_score: found.score.clamp(0.0, 1.0),
        match_kind: found.kind,
        evidence_refs,
    }
}

/// True when any record is a sanction or a criminal record.
pub(crate) fn requires_sar(records: &[SourceRecord]) -> bool {
    records
        .iter()
        .any(|r| matches!(r.category, Category::Sanction | Category::CriminalRecord))
}

/// Sum weights with geometric decay, largest first:
/// w0 + w1·d + w2·d² + …  Bounded by max(w)/(1-d).
pub(crate) fn diminishing_sum(mut weights: Vec<f64>, decay: f64) -> f64 {
    weights.sort_by(|a, b| b.total_cmp(a));
    weights
        .iter()
        .fold((0.0, 1.0), |(sum, factor), w| (sum + w * factor, factor * decay))
        .0
}
