//! Engine-facing records: work items, reports and session summaries.
//!
//! This module does not assume any particular engine. It only defines the
//! "shape" of what the engine hands to the worker and what the worker relays.

use serde::{Deserialize, Serialize};

use super::errors::EngineError;

/// Source location of a test: `(path, line, domain)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub line: Option<u32>,
    pub domain: String,
}

impl Location {
    pub fn new(path: impl Into<String>, line: Option<u32>, domain: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            domain: domain.into(),
        }
    }
}

/// One collected work item.
///
/// `chain` is the node-id chain from the session root down to the item
/// itself. The engine compares chains to decide which scoped fixtures can be
/// torn down before the next item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub nodeid: String,
    pub location: Location,
    pub chain: Vec<String>,

    /// Load-group name, if the item was marked with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl WorkItem {
    pub fn new(nodeid: impl Into<String>, location: Location, chain: Vec<String>) -> Self {
        Self {
            nodeid: nodeid.into(),
            location,
            chain,
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Suffix the node id with `@<group>` so the controller can keep a
    /// group on one worker.
    pub fn apply_group_suffix(&mut self) {
        if let Some(group) = &self.group {
            self.nodeid = format!("{}@{}", self.nodeid, group);
        }
    }
}

/// Result of a successful collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub topdir: String,
    pub items: Vec<WorkItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportOutcome {
    Passed,
    Failed,
    Skipped,
}

/// An engine-defined report, already converted to its serializable form.
///
/// `data` is relayed verbatim; the worker only appends its own bookkeeping
/// keys (item index, worker id, run id) for test reports.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReport {
    pub nodeid: String,
    pub outcome: ReportOutcome,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl EngineReport {
    pub fn new(nodeid: impl Into<String>, outcome: ReportOutcome) -> Self {
        let nodeid = nodeid.into();
        let mut data = serde_json::Map::new();
        data.insert("nodeid".into(), serde_json::Value::String(nodeid.clone()));
        data.insert("outcome".into(), serde_json::to_value(outcome).unwrap_or_default());
        Self {
            nodeid,
            outcome,
            data,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn passed(&self) -> bool {
        self.outcome == ReportOutcome::Passed
    }
}

/// Phase in which a warning was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningWhen {
    Config,
    Collect,
    Runtest,
}

/// Description of the worker process, sent with `workerready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub version: String,
    pub platform: String,
    pub family: String,
    pub executable: String,
    pub cwd: String,
    pub pid: u32,
}

impl WorkerInfo {
    pub fn current() -> Self {
        let executable = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            family: std::env::consts::FAMILY.to_string(),
            executable,
            cwd,
            pid: std::process::id(),
        }
    }
}

/// Session exit status values (same numbering the controller expects).
pub mod exit_status {
    pub const OK: i32 = 0;
    pub const TESTS_FAILED: i32 = 1;
    pub const INTERRUPTED: i32 = 2;
    pub const INTERNAL_ERROR: i32 = 3;
}

/// Payload of `workerfinished`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerOutput {
    pub exitstatus: i32,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Opaque, transport-safe form of a failure raised out of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub kind: String,
    pub message: String,
    pub detail: String,
}

impl FailureReport {
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            detail: detail.into(),
        }
    }
}

impl From<&EngineError> for FailureReport {
    fn from(err: &EngineError) -> Self {
        Self::new(err.kind(), err.to_string(), format!("{err:?}"))
    }
}
