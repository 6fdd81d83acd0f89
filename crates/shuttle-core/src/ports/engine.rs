//! TestEngine port - 実際にテストを実行する外部コンポーネント
//!
//! worker は engine を「item を 1 件実行し、結果を callback で報告する」
//! 能力としてだけ扱います。
//!
//! # 二層構造
//! - **TestEngine**: collect / run_item / finish_session
//! - **EngineObserver**: engine が決まった時点で同期的に呼ぶ callback の閉じた集合

use async_trait::async_trait;

use crate::config::WorkerConfig;
use crate::domain::{
    CapturedWarning, Collection, EngineError, EngineReport, ItemIndex, Location, WarningWhen,
    WorkItem, WorkerError,
};

/// Lazily-resolved "next item" handed to the engine with every run.
///
/// The engine asks for the chain right before tearing down scoped fixtures.
/// An empty chain means there is no further item.
#[async_trait]
pub trait NextItemHint: Send + Sync {
    async fn chain(&self) -> Vec<String>;
}

#[async_trait]
pub trait TestEngine: Send + Sync {
    /// Receives the run id, worker id and worker count before anything else.
    async fn start_session(&self, _config: &WorkerConfig) -> Result<(), EngineError> {
        Ok(())
    }

    /// Collect the ordered item list for the session.
    async fn collect(&self, observer: &dyn EngineObserver) -> Result<Collection, EngineError>;

    /// Run one item. `next` must only be resolved when the engine really
    /// needs to know what follows.
    async fn run_item(
        &self,
        index: ItemIndex,
        item: &WorkItem,
        next: &dyn NextItemHint,
        observer: &dyn EngineObserver,
    ) -> Result<(), EngineError>;

    /// Tear the session down and return its exit status.
    async fn finish_session(&self) -> Result<i32, EngineError>;
}

/// Callbacks the engine invokes at defined points of the session.
///
/// Every method follows the same policy: transport problems are logged by the
/// implementation and swallowed, so an `Err` means the callback itself was
/// invalid (e.g. a report for the wrong item).
pub trait EngineObserver: Send + Sync {
    fn session_start(&self) -> Result<(), WorkerError>;

    fn collection_start(&self) -> Result<(), WorkerError>;

    fn collection_finish(&self, collection: &Collection) -> Result<(), WorkerError>;

    fn collect_report(&self, report: &EngineReport) -> Result<(), WorkerError>;

    fn log_start(&self, nodeid: &str, location: &Location) -> Result<(), WorkerError>;

    fn log_finish(&self, nodeid: &str, location: &Location) -> Result<(), WorkerError>;

    fn test_report(&self, report: &EngineReport) -> Result<(), WorkerError>;

    fn warning_recorded(
        &self,
        warning: &CapturedWarning,
        when: WarningWhen,
        nodeid: &str,
        location: Option<&Location>,
    ) -> Result<(), WorkerError>;

    fn internal_error(&self, formatted_error: &str) -> Result<(), WorkerError>;
}
