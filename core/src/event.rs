//! Progress events and pipeline states.
//!
//! RULE: A check emits zero or more `Partial` events followed by exactly
//! one terminal event (`Final`, `Cancelled` or `Error`). Nothing follows
//! the terminal event.

use crate::{
    aggregator::AggregateVerdict,
    finding::SourceFinding,
    report::Report,
    types::{CheckId, SourceId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Pending,
    Running,
    PartiallyComplete,
    Complete,
    Failed,
    Cancelled,
}

impl CheckState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::PartiallyComplete => "partially_complete",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Every event a check emits, in completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Partial {
        check_id: CheckId,
        source_id: SourceId,
        finding: SourceFinding,
        verdict: AggregateVerdict,
        completed: usize,
        total: usize,
    },
    Final {
        check_id: CheckId,
        verdict: AggregateVerdict,
        report: Report,
    },
    Cancelled {
        check_id: CheckId,
        completed_sources: Vec<SourceId>,
    },
    Error {
        check_id: CheckId,
        message: String,
    },
}

impl ProgressEvent {
    /// Stable name used for the event_kind column in the case log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Partial { .. } => "partial",
            Self::Final { .. } => "final",
            Self::Cancelled { .. } => "cancelled",
            Self::Error { .. } => "error",
        }
    }

    pub fn check_id(&self) -> &str {
        match self {
            Self::Partial { check_id, .. }
            | Self::Final { check_id, .. }
            | Self::Cancelled { check_id, .. }
            | Self::Error { check_id, .. } => check_id,
        }
    }

    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::Partial { source_id, .. } => Some(source_id),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Partial { .. })
    }
}

/// The case log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseLogEntry {
    pub id: Option<i64>,
    pub check_id: CheckId,
    pub seq: u64,
    pub event_kind: String,
    pub source_id: Option<SourceId>,
    pub payload: String, // JSON-serialized ProgressEvent
}
