//! Injectable record sources — where adapters get their raw candidates.
//!
//! RULE: A record source only fetches. It never matches names and never
//! scores; that is the adapter's job. Swapping a static table for a remote
//! API or a test double must not change any adapter code.

use crate::{
    error::SourceError,
    finding::{Category, Severity},
    rng::{SourceRng, SourceSlot},
    subject::Subject,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One raw row as returned by an upstream list or database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub entry_id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub category: Category,
    /// Upstream severity, when the list publishes one.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Corroborated by the upstream's own review process.
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
}

impl CandidateEntry {
    pub fn new(entry_id: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            entry_id: entry_id.into(),
            name: name.into(),
            aliases: Vec::new(),
            category,
            severity: None,
            verified: false,
            country: None,
            evidence_refs: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    pub fn with_evidence(mut self, reference: impl Into<String>) -> Self {
        self.evidence_refs.push(reference.into());
        self
    }
}

/// The contract every upstream must fulfil.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Name used in logs and failure reasons.
    fn name(&self) -> &str;

    /// Return every candidate the upstream considers relevant for the
    /// subject. An empty list is a normal "no data" outcome.
    async fn lookup(&self, subject: &Subject) -> Result<Vec<CandidateEntry>, SourceError>;
}

// ── Static table ─────────────────────────────────────────────────────

/// An in-memory table, returned whole on every lookup.
#[derive(Debug, Clone)]
pub struct StaticTableSource {
    name: String,
    entries: Vec<CandidateEntry>,
}

impl StaticTableSource {
    pub fn new(name: impl Into<String>, entries: Vec<CandidateEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Load the `table` key from `<data_dir>/watchlists.json`.
    /// A missing key yields an empty table.
    pub fn load(data_dir: &str, table: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/watchlists.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let mut tables: HashMap<String, Vec<CandidateEntry>> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        let entries = tables.remove(table).unwrap_or_default();
        log::debug!("Loaded {} entries for table '{table}' from {path}", entries.len());
        Ok(Self::new(table, entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RecordSource for StaticTableSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, _subject: &Subject) -> Result<Vec<CandidateEntry>, SourceError> {
        Ok(self.entries.clone())
    }
}

// ── Simulated remote ─────────────────────────────────────────────────

/// Wraps another source and behaves like a remote API: every lookup
/// waits a seeded, random latency and may fail with an outage.
pub struct SimulatedRemoteSource {
    inner: Arc<dyn RecordSource>,
    rng: Mutex<SourceRng>,
    latency_ms: (u64, u64),
    outage_probability: f64,
}

impl SimulatedRemoteSource {
    pub fn new(inner: Arc<dyn RecordSource>, seed: u64, slot: SourceSlot) -> Self {
        Self {
            inner,
            rng: Mutex::new(SourceRng::new(seed, slot)),
            latency_ms: (20, 250),
            outage_probability: 0.0,
        }
    }

    pub fn with_latency_ms(mut self, min: u64, max: u64) -> Self {
        self.latency_ms = (min, max.max(min));
        self
    }

    pub fn with_outage_probability(mut self, p: f64) -> Self {
        self.outage_probability = p.clamp(0.0, 1.0);
        self
    }
}

#[async_trait]
impl RecordSource for SimulatedRemoteSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn lookup(&self, subject: &Subject) -> Result<Vec<CandidateEntry>, SourceError> {
        let (delay, outage) = {
            let mut rng = self.rng.lock().await;
            let delay = rng.next_in_range(self.latency_ms.0, self.latency_ms.1);
            (delay, rng.chance(self.outage_probability))
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        if outage {
            return Err(SourceError::Unavailable(format!(
                "{} returned 503 after {delay}ms",
                self.inner.name()
            )));
        }
        self.inner.lookup(subject).await
    }
}

// ── Unavailable ──────────────────────────────────────────────────────

/// A source that always fails. Used to switch a source off without
/// removing it from the report.
#[derive(Debug, Clone)]
pub struct UnavailableSource {
    name: String,
    reason: String,
}

impl UnavailableSource {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl RecordSource for UnavailableSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, _subject: &Subject) -> Result<Vec<CandidateEntry>, SourceError> {
        Err(SourceError::Unavailable(self.reason.clone()))
    }
}
