//! Log record snapshot sent with `runtest_logmessage`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable copy of a log record.
///
/// `message` is already rendered (fields folded in). Error values and raw
/// field values are not carried: only their rendered text survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecordSnapshot {
    pub level: String,
    pub target: String,
    pub message: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub thread: Option<String>,
    pub created: DateTime<Utc>,
}

impl LogRecordSnapshot {
    /// Level name in the controller's spelling (`WARNING` rather than `WARN`).
    pub fn level_name(level: &tracing::Level) -> &'static str {
        match *level {
            tracing::Level::TRACE => "TRACE",
            tracing::Level::DEBUG => "DEBUG",
            tracing::Level::INFO => "INFO",
            tracing::Level::WARN => "WARNING",
            tracing::Level::ERROR => "ERROR",
        }
    }
}
