//! The check pipeline — runs every source adapter concurrently and streams
//! progress as they complete.
//!
//! STATE MACHINE:
//!   Pending → Running            valid subject received
//!   Running → PartiallyComplete  first adapter reported
//!   … → Complete                 every adapter reported (ok or failed)
//!   Pending → Failed             subject rejected at intake
//!   … → Failed                   aggregation invariant violated
//!   … → Cancelled                caller cancelled or dropped the handle
//!
//! RULES:
//!   - Adapters never see each other's output. Each runs in its own task
//!     under the check's timeout; a timeout or panic becomes a failed
//!     finding, never a clean one.
//!   - The verdict is recomputed from the full list of completed findings
//!     after every completion. It is never patched in place.
//!   - Events are delivered in completion order, and the terminal event
//!     is always last.

use crate::{
    adapter::SourceAdapter,
    aggregator::{AggregateVerdict, RiskAggregator},
    aml_pep_source::AmlPepAdapter,
    config::EngineConfig,
    data_source::{RecordSource, SimulatedRemoteSource, StaticTableSource},
    error::{CheckError, CheckResult, SourceError},
    event::{CaseLogEntry, CheckState, ProgressEvent},
    finding::SourceFinding,
    fraud_report_source::FraudReportAdapter,
    report::{Report, VerdictReportBuilder},
    rng::SourceSlot,
    sanctions_source::SanctionsAdapter,
    store::CaseRecorder,
    subject::{Subject, SubjectRequest},
    types::{source_ids, CheckId, SourceId},
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

// ── Sources ─────────────────────────────────────────────────────────

/// The record sources behind the four built-in adapters.
#[derive(Clone)]
pub struct SourceSet {
    pub sanctions: Arc<dyn RecordSource>,
    pub aml_pep: Arc<dyn RecordSource>,
    pub criminal_fraud_site: Arc<dyn RecordSource>,
    pub community_fraud_db: Arc<dyn RecordSource>,
}

impl SourceSet {
    /// Static tables from `<data_dir>/watchlists.json`, one key per source id.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        Ok(Self {
            sanctions: Arc::new(StaticTableSource::load(data_dir, source_ids::SANCTIONS)?),
            aml_pep: Arc::new(StaticTableSource::load(data_dir, source_ids::AML_PEP)?),
            criminal_fraud_site: Arc::new(StaticTableSource::load(
                data_dir,
                source_ids::CRIMINAL_FRAUD_SITE,
            )?),
            community_fraud_db: Arc::new(StaticTableSource::load(
                data_dir,
                source_ids::COMMUNITY_FRAUD_DB,
            )?),
        })
    }

    /// Four empty tables.
    pub fn empty() -> Self {
        Self {
            sanctions: Arc::new(StaticTableSource::empty(source_ids::SANCTIONS)),
            aml_pep: Arc::new(StaticTableSource::empty(source_ids::AML_PEP)),
            criminal_fraud_site: Arc::new(StaticTableSource::empty(source_ids::CRIMINAL_FRAUD_SITE)),
            community_fraud_db: Arc::new(StaticTableSource::empty(source_ids::COMMUNITY_FRAUD_DB)),
        }
    }

    /// Put every source behind a simulated remote with seeded latency.
    pub fn simulated(self, seed: u64, latency_ms: (u64, u64), outage_probability: f64) -> Self {
        let wrap = |inner: Arc<dyn RecordSource>, slot: SourceSlot| -> Arc<dyn RecordSource> {
            Arc::new(
                SimulatedRemoteSource::new(inner, seed, slot)
                    .with_latency_ms(latency_ms.0, latency_ms.1)
                    .with_outage_probability(outage_probability),
            )
        };
        Self {
            sanctions: wrap(self.sanctions, SourceSlot::Sanctions),
            aml_pep: wrap(self.aml_pep, SourceSlot::AmlPep),
            criminal_fraud_site: wrap(self.criminal_fraud_site, SourceSlot::CriminalFraudSite),
            community_fraud_db: wrap(self.community_fraud_db, SourceSlot::CommunityFraudDb),
        }
    }
}

// ── Pipeline ────────────────────────────────────────────────────────

/// Per-check overrides.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Timeout applied to each adapter call. Defaults to the config value.
    pub adapter_timeout: Option<Duration>,
}

/// An adapter with the id it was registered under.
type Registered = (SourceId, Arc<dyn SourceAdapter>);

pub struct CheckPipeline {
    adapters: Vec<Registered>,
    aggregator: RiskAggregator,
    adapter_timeout: Duration,
    recorder: Option<Arc<dyn CaseRecorder>>,
}

impl CheckPipeline {
    /// An empty pipeline. Register adapters before starting checks.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            adapters: Vec::new(),
            aggregator: RiskAggregator::new(config.tiers.clone()),
            adapter_timeout: config.pipeline.adapter_timeout(),
            recorder: None,
        }
    }

    /// Build a fully wired pipeline with the four built-in adapters.
    pub fn build(config: &EngineConfig, sources: SourceSet) -> Self {
        let adapters: [Arc<dyn SourceAdapter>; 4] = [
            Arc::new(SanctionsAdapter::new(sources.sanctions, config)),
            Arc::new(AmlPepAdapter::new(sources.aml_pep, config)),
            Arc::new(FraudReportAdapter::criminal_fraud_site(sources.criminal_fraud_site, config)),
            Arc::new(FraudReportAdapter::community_fraud_db(sources.community_fraud_db, config)),
        ];
        let mut pipeline = Self::new(config);
        pipeline.adapters = adapters
            .into_iter()
            .map(|a| (a.source_id().to_string(), a))
            .collect();
        pipeline
    }

    /// Register an adapter under its stable source id.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> CheckResult<()> {
        let source_id = adapter.source_id().to_string();
        if self.adapters.iter().any(|(id, _)| *id == source_id) {
            return Err(CheckError::DuplicateSource { source_id });
        }
        log::debug!("Registered source '{source_id}'");
        self.adapters.push((source_id, adapter));
        Ok(())
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn CaseRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.adapters.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Validate the subject and start a check. Must be called from within
    /// a tokio runtime. Validation errors are returned before any adapter
    /// runs.
    pub fn start(&self, request: SubjectRequest) -> CheckResult<CheckHandle> {
        self.start_with(request, CheckOptions::default())
    }

    pub fn start_with(&self, request: SubjectRequest, options: CheckOptions) -> CheckResult<CheckHandle> {
        let check_id: CheckId = uuid::Uuid::new_v4().to_string();

        let subject = match Subject::from_request(request) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("[check {check_id}] rejected at intake: {e}");
                self.note_transition(&check_id, CheckState::Pending, CheckState::Failed);
                return Err(e);
            }
        };

        let (state_tx, state_rx) = watch::channel(CheckState::Pending);
        let (events_tx, events_rx) = mpsc::channel(self.adapters.len() + 1);
        let cancel = CancellationToken::new();

        let run = CheckRun {
            check_id: check_id.clone(),
            subject: Arc::new(subject),
            adapters: self.adapters.clone(),
            aggregator: self.aggregator.clone(),
            adapter_timeout: options.adapter_timeout.unwrap_or(self.adapter_timeout),
            recorder: self.recorder.clone(),
            events: events_tx,
            state: state_tx,
            cancel: cancel.clone(),
            seq: 0,
        };
        run.transition(CheckState::Running);
        tokio::spawn(run.drive());

        Ok(CheckHandle {
            check_id,
            events: events_rx,
            state: state_rx,
            cancel,
            finished: false,
        })
    }

    /// Run a check to completion and return only the final report.
    pub async fn run(&self, request: SubjectRequest) -> CheckResult<Report> {
        self.start(request)?.wait_report().await
    }

    /// Blocking variant of `run`. Builds its own current-thread runtime,
    /// so it must not be called from inside an async context.
    pub fn run_blocking(&self, request: SubjectRequest) -> CheckResult<Report> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run(request))
    }

    fn note_transition(&self, check_id: &str, from: CheckState, to: CheckState) {
        log::info!("[check {check_id}] {} -> {}", from.name(), to.name());
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record_transition(check_id, from, to) {
                log::warn!("[check {check_id}] failed to record transition: {e}");
            }
        }
    }
}

// ── Handle ──────────────────────────────────────────────────────────

/// Caller's side of a running check. Dropping it before the terminal
/// event cancels the check.
pub struct CheckHandle {
    check_id: CheckId,
    events: mpsc::Receiver<ProgressEvent>,
    state: watch::Receiver<CheckState>,
    cancel: CancellationToken,
    finished: bool,
}

impl CheckHandle {
    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    pub fn state(&self) -> CheckState {
        *self.state.borrow()
    }

    /// Request cancellation. Still-running adapters are aborted and the
    /// stream ends with a `Cancelled` event instead of `Final`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event in completion order; `None` after the terminal event.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }

    /// Drain the stream and return the final report.
    pub async fn wait_report(mut self) -> CheckResult<Report> {
        while let Some(event) = self.next_event().await {
            match event {
                ProgressEvent::Partial { .. } => continue,
                ProgressEvent::Final { report, .. } => return Ok(report),
                ProgressEvent::Cancelled { check_id, .. } => {
                    return Err(CheckError::Cancelled { check_id })
                }
                ProgressEvent::Error { message, .. } => {
                    return Err(CheckError::AggregationInvariantViolation(message))
                }
            }
        }
        Err(CheckError::Cancelled {
            check_id: self.check_id.clone(),
        })
    }
}

impl Drop for CheckHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
        }
    }
}

// ── Driver ──────────────────────────────────────────────────────────

/// Whether the driver keeps going after handling one finding.
enum Step {
    Continue,
    Stop,
}

struct CheckRun {
    check_id: CheckId,
    subject: Arc<Subject>,
    adapters: Vec<Registered>,
    aggregator: RiskAggregator,
    adapter_timeout: Duration,
    recorder: Option<Arc<dyn CaseRecorder>>,
    events: mpsc::Sender<ProgressEvent>,
    state: watch::Sender<CheckState>,
    cancel: CancellationToken,
    seq: u64,
}

impl CheckRun {
    async fn drive(mut self) {
        let total = self.adapters.len();
        let mut tasks = JoinSet::new();
        for (source_id, adapter) in &self.adapters {
            tasks.spawn(run_adapter(
                source_id.clone(),
                Arc::clone(adapter),
                Arc::clone(&self.subject),
                self.adapter_timeout,
                self.cancel.child_token(),
            ));
        }

        let cancel = self.cancel.clone();
        let mut completed: Vec<SourceFinding> = Vec::with_capacity(total);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                joined = tasks.join_next() => Some(joined),
            };
            let Some(joined) = next else {
                tasks.abort_all();
                self.finish_cancelled(&completed).await;
                return;
            };

            let finding = match joined {
                None => break,
                Some(Ok(finding)) => finding,
                Some(Err(e)) => {
                    log::error!("[check {}] adapter task lost: {e}", self.check_id);
                    continue;
                }
            };
            if let Step::Stop = self.accept(&mut completed, finding).await {
                tasks.abort_all();
                return;
            }
        }

        if self.cancel.is_cancelled() {
            self.finish_cancelled(&completed).await;
            return;
        }

        // A task that died without reporting still owes the report a finding.
        let missing: Vec<SourceId> = self
            .adapters
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !completed.iter().any(|f| &f.source_id == *id))
            .cloned()
            .collect();
        for source_id in missing {
            let finding = SourceFinding::failed(source_id, "adapter task lost");
            if let Step::Stop = self.accept(&mut completed, finding).await {
                return;
            }
        }

        match self.aggregator.aggregate(&completed) {
            Ok(verdict) => self.finish_complete(verdict).await,
            Err(e) => self.finish_failed(e).await,
        }
    }

    /// Add one finding, recompute the verdict and emit a partial event.
    async fn accept(&mut self, completed: &mut Vec<SourceFinding>, finding: SourceFinding) -> Step {
        let total = self.adapters.len();
        log::info!(
            "[check {}] source '{}' reported ({}/{total}){}",
            self.check_id,
            finding.source_id,
            completed.len() + 1,
            if finding.source_failed { " as unavailable" } else { "" }
        );
        completed.push(finding.clone());

        let verdict = match self.aggregator.aggregate(completed) {
            Ok(v) => v,
            Err(e) => {
                self.finish_failed(e).await;
                return Step::Stop;
            }
        };

        self.transition(CheckState::PartiallyComplete);
        let delivered = self
            .emit(ProgressEvent::Partial {
                check_id: self.check_id.clone(),
                source_id: finding.source_id.clone(),
                finding,
                verdict,
                completed: completed.len(),
                total,
            })
            .await;
        if !delivered {
            self.cancel.cancel();
            self.finish_cancelled(completed).await;
            return Step::Stop;
        }
        Step::Continue
    }

    async fn finish_complete(&mut self, verdict: AggregateVerdict) {
        let report = VerdictReportBuilder::for_check(self.check_id.clone()).build(&self.subject, &verdict);
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record_report(&report) {
                log::warn!("[check {}] failed to record report: {e}", self.check_id);
            }
        }
        log::info!(
            "[check {}] verdict {} (score {:.1}, {} high-severity finding(s))",
            self.check_id,
            verdict.tier.label(),
            verdict.overall_score,
            verdict.total_findings
        );
        self.transition(CheckState::Complete);
        self.emit(ProgressEvent::Final {
            check_id: self.check_id.clone(),
            verdict,
            report,
        })
        .await;
    }

    async fn finish_cancelled(&mut self, completed: &[SourceFinding]) {
        log::warn!(
            "[check {}] cancelled with {}/{} source(s) reported",
            self.check_id,
            completed.len(),
            self.adapters.len()
        );
        self.transition(CheckState::Cancelled);
        self.emit(ProgressEvent::Cancelled {
            check_id: self.check_id.clone(),
            completed_sources: completed.iter().map(|f| f.source_id.clone()).collect(),
        })
        .await;
    }

    async fn finish_failed(&mut self, error: CheckError) {
        log::error!("[check {}] {error}", self.check_id);
        self.transition(CheckState::Failed);
        self.emit(ProgressEvent::Error {
            check_id: self.check_id.clone(),
            message: error.to_string(),
        })
        .await;
    }

    fn transition(&self, to: CheckState) {
        let from = *self.state.borrow();
        if from == to {
            return;
        }
        log::info!("[check {}] {} -> {}", self.check_id, from.name(), to.name());
        self.state.send_replace(to);
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record_transition(&self.check_id, from, to) {
                log::warn!("[check {}] failed to record transition: {e}", self.check_id);
            }
        }
    }

    /// Record and send one event. Returns false when nobody is listening.
    async fn emit(&mut self, event: ProgressEvent) -> bool {
        self.seq += 1;
        if let Some(recorder) = &self.recorder {
            let entry = serde_json::to_string(&event).map(|payload| CaseLogEntry {
                id: None,
                check_id: self.check_id.clone(),
                seq: self.seq,
                event_kind: event.kind().to_string(),
                source_id: event.source_id().map(str::to_string),
                payload,
            });
            let recorded = match entry {
                Ok(entry) => recorder.record_event(&entry),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = recorded {
                log::warn!("[check {}] failed to record event: {e}", self.check_id);
            }
        }
        self.events.send(event).await.is_ok()
    }
}

/// One adapter call under timeout, panic guard and cancellation. The
/// registered id is passed in so nothing outside the guard calls into the
/// adapter.
async fn run_adapter(
    source_id: SourceId,
    adapter: Arc<dyn SourceAdapter>,
    subject: Arc<Subject>,
    timeout: Duration,
    cancel: CancellationToken,
) -> SourceFinding {
    let guarded = AssertUnwindSafe(async move { adapter.check(&subject).await }).catch_unwind();

    let mut finding = tokio::select! {
        _ = cancel.cancelled() => SourceFinding::failed(source_id.as_str(), "check cancelled"),
        outcome = tokio::time::timeout(timeout, guarded) => match outcome {
            Ok(Ok(finding)) => finding,
            Ok(Err(_)) => {
                log::warn!("Source '{source_id}' panicked");
                SourceFinding::failed(source_id.as_str(), "adapter panicked")
            }
            Err(_) => {
                log::warn!("Source '{source_id}' timed out after {timeout:?}");
                SourceFinding::failed(source_id.as_str(), SourceError::Timeout(timeout).to_string())
            }
        },
    };

    if finding.source_id != source_id {
        log::warn!(
            "Source '{source_id}' reported as '{}'; using the registered id",
            finding.source_id
        );
        finding.source_id = source_id;
    }
    finding
}
