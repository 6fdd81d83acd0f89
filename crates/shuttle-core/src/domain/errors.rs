//! Errors - エラー型と分類
//!
//! 境界ごとに 1 つの enum を持ちます。
//! - `EncodeError`: 値を wire に載せられない（transport encode failure）
//! - `ChannelError`: transport 自体の失敗
//! - `EngineError`: engine が item 実行中に返した失敗
//! - `WorkerError`: worker 境界（observer / session）でまとめて返すエラー

use serde_json::error::Category;
use thiserror::Error;

use super::ids::ItemIndex;

#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder's own "cannot encode this value" class. Callers degrade
    /// the field (null or textual form) instead of dropping the message.
    #[error("value cannot be encoded for transport: {0}")]
    Unencodable(String),

    /// Any other encoder failure. This one propagates.
    #[error("encoder failure: {0}")]
    Encoder(String),
}

impl EncodeError {
    pub fn is_unencodable(&self) -> bool {
        matches!(self, EncodeError::Unencodable(_))
    }
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Data | Category::Syntax => EncodeError::Unencodable(err.to_string()),
            Category::Io | Category::Eof => EncodeError::Encoder(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,

    #[error("inbound callback is already set")]
    CallbackAlreadySet,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("channel io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Failed(String),

    #[error("item index {index} is outside the collected item list (len={count})")]
    UnknownItem { index: ItemIndex, count: usize },

    #[error("engine io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Worker(#[from] Box<WorkerError>),
}

impl EngineError {
    /// Short class name used when the failure is reported over the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Failed(_) => "failed",
            EngineError::UnknownItem { .. } => "unknown_item",
            EngineError::Io(_) => "io",
            EngineError::Worker(_) => "worker",
        }
    }
}

impl From<WorkerError> for EngineError {
    fn from(err: WorkerError) -> Self {
        EngineError::Worker(Box::new(err))
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("report for nodeid={got} does not belong to the running item nodeid={expected}")]
    ReportMismatch { expected: String, got: String },

    #[error("report for nodeid={nodeid} arrived while no item is running")]
    NoActiveItem { nodeid: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn non_string_map_keys_are_unencodable() {
        let mut map = HashMap::new();
        map.insert((1, 2), "x");
        let err: EncodeError = serde_json::to_value(&map).unwrap_err().into();
        assert!(err.is_unencodable());
    }

    struct BrokenWriter;

    impl std::io::Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn io_failures_are_not_unencodable() {
        let err: EncodeError = serde_json::to_writer(BrokenWriter, &"payload")
            .unwrap_err()
            .into();
        assert!(!err.is_unencodable());
    }

    #[test]
    fn engine_error_wraps_worker_error() {
        let err: EngineError = WorkerError::NoActiveItem {
            nodeid: "t::a".into(),
        }
        .into();
        assert_eq!(err.kind(), "worker");
        assert!(err.to_string().contains("t::a"));
    }
}
