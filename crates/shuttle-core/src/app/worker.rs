//! Worker - セッション全体と main loop
//!
//! # フロー
//! 1. session start → `workerready`
//! 2. collection → `collectionstart` → `collectionfinish`（失敗時は `collect_error`）
//! 3. inbound callback を設定（CommandDispatcher）
//! 4. main loop: dequeue → engine 実行 → `runtest_protocol_complete` → DeferredNext 解決
//! 5. session finish → `workerfinished`
//!
//! # main loop の状態遷移
//! `AwaitingFirstItem → Running → AwaitingNext → Running → … → Terminated`
//! - 最初の dequeue が sentinel なら何も実行せずに終わる
//! - item 実行中の失敗（engine の Err も panic も）は `exception` イベントにして続行
//! - 終了するのは sentinel を受け取ったときだけ
//! - item 実行中はプロセスタイトルに node id を出す（best-effort）

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinError;

use crate::app::deferred_next::DeferredNext;
use crate::app::dispatcher::CommandDispatcher;
use crate::app::emitter::EventEmitter;
use crate::app::observer::WorkerObserver;
use crate::config::WorkerConfig;
use crate::domain::{
    EngineError, Event, FailureReport, ItemIndex, WorkItem, WorkerError, WorkerOutput,
    exit_status,
};
use crate::impls::OsProcessTitle;
use crate::ports::{
    Channel, EngineObserver, IDLE_TITLE, ProcessTitle, TestEngine, running_title,
};
use crate::queue::{QueueEntry, WorkQueue};

pub struct Worker {
    config: WorkerConfig,
    channel: Arc<dyn Channel>,
    engine: Arc<dyn TestEngine>,
    queue: Arc<WorkQueue>,
    emitter: EventEmitter,
    observer: Arc<WorkerObserver>,
    title: Arc<dyn ProcessTitle>,
}

impl Worker {
    pub fn new(
        config: WorkerConfig,
        channel: Arc<dyn Channel>,
        engine: Arc<dyn TestEngine>,
    ) -> Self {
        let emitter =
            EventEmitter::new(channel.clone(), config.worker_id.clone(), config.verbose);
        let observer = Arc::new(WorkerObserver::new(emitter.clone(), config.clone()));
        Self {
            config,
            channel,
            engine,
            queue: Arc::new(WorkQueue::new()),
            emitter,
            observer,
            title: Arc::new(OsProcessTitle),
        }
    }

    /// Replace where the per-item status line goes.
    pub fn with_process_title(mut self, title: Arc<dyn ProcessTitle>) -> Self {
        self.title = title;
        self
    }

    /// Emitter bound to this worker's channel (for the log relay).
    pub fn emitter(&self) -> EventEmitter {
        self.emitter.clone()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run one whole session. Returns after the shutdown sentinel has been
    /// consumed (or after a failed collection).
    pub async fn run(self) -> Result<WorkerOutput, WorkerError> {
        tracing::info!(
            worker_id = %self.config.worker_id,
            testrun_uid = %self.config.testrun_uid,
            worker_count = self.config.worker_count,
            "worker session starting"
        );
        self.observer.session_start()?;

        let mut exitstatus = match self.engine.start_session(&self.config).await {
            Ok(()) => self.collect_and_run().await?,
            Err(e) => {
                self.observer.internal_error(&e.to_string())?;
                exit_status::INTERNAL_ERROR
            }
        };

        match self.engine.finish_session().await {
            Ok(status) => exitstatus = exitstatus.max(status),
            Err(e) => {
                self.observer.internal_error(&e.to_string())?;
                exitstatus = exit_status::INTERNAL_ERROR;
            }
        }

        let output = WorkerOutput {
            exitstatus,
            extra: serde_json::Map::new(),
        };
        self.emitter.emit(Event::WorkerFinished {
            workeroutput: output.clone(),
        });
        tracing::info!(worker_id = %self.config.worker_id, exitstatus, "worker session finished");
        Ok(output)
    }

    async fn collect_and_run(&self) -> Result<i32, WorkerError> {
        self.observer.collection_start()?;
        let mut collection = match self.engine.collect(self.observer.as_ref()).await {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!(worker_id = %self.config.worker_id, error = %e, "collection failed");
                self.emitter.emit(Event::CollectError {
                    formatted_error: e.to_string(),
                });
                return Ok(exit_status::INTERRUPTED);
            }
        };
        if self.config.loadgroup {
            for item in &mut collection.items {
                item.apply_group_suffix();
            }
        }
        self.observer.collection_finish(&collection)?;

        let items: Arc<[WorkItem]> = collection.items.into();
        let dispatcher = Arc::new(CommandDispatcher::new(
            self.queue.clone(),
            self.emitter.clone(),
            items.len(),
        ));
        self.channel.set_callback(dispatcher.into_callback())?;

        self.run_loop(items).await;
        Ok(exit_status::OK)
    }

    /// The main loop. Returns exactly once, after the first sentinel.
    async fn run_loop(&self, items: Arc<[WorkItem]>) {
        tracing::debug!(worker_id = %self.config.worker_id, "entering main loop");
        let mut current = self.queue.dequeue().await;
        while let QueueEntry::Item(index) = current {
            current = self.run_one(index, &items).await;
        }
        tracing::debug!(worker_id = %self.config.worker_id, "main loop finished");
    }

    /// Run one item and return whatever the deferred next resolved to.
    async fn run_one(&self, index: ItemIndex, items: &Arc<[WorkItem]>) -> QueueEntry {
        let next = Arc::new(DeferredNext::new(
            self.queue.clone(),
            self.emitter.clone(),
            items.clone(),
        ));

        let start = Instant::now();
        let result = self.execute(index, items, next.clone()).await;
        let duration = start.elapsed().as_secs_f64();

        if let Err(failure) = result {
            tracing::warn!(
                worker_id = %self.config.worker_id,
                item_index = %index,
                kind = %failure.kind,
                message = %failure.message,
                "item execution failed"
            );
            self.emitter.emit(Event::Exception { exception: failure });
        }
        self.emitter.emit(Event::RuntestProtocolComplete {
            item_index: index,
            duration,
        });

        next.next_entry().await
    }

    /// Invoke the engine on its own task so that a panic is contained the
    /// same way as an error.
    async fn execute(
        &self,
        index: ItemIndex,
        items: &Arc<[WorkItem]>,
        next: Arc<DeferredNext>,
    ) -> Result<(), FailureReport> {
        let Some(item) = items.get(index.get()).cloned() else {
            let err = EngineError::UnknownItem {
                index,
                count: items.len(),
            };
            return Err(FailureReport::from(&err));
        };
        tracing::debug!(
            worker_id = %self.config.worker_id,
            item_index = %index,
            nodeid = %item.nodeid,
            "running"
        );

        self.title.set(&running_title(&item.nodeid));
        self.observer.begin_item(index, &item.nodeid);
        let engine = self.engine.clone();
        let observer = self.observer.clone();
        let handle = tokio::spawn(async move {
            engine
                .run_item(index, &item, next.as_ref(), observer.as_ref())
                .await
        });
        let result = match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(FailureReport::from(&e)),
            Err(e) => Err(join_failure(e)),
        };
        self.observer.end_item();
        self.title.set(IDLE_TITLE);
        result
    }
}

fn join_failure(err: JoinError) -> FailureReport {
    if err.is_panic() {
        let detail = format!("{err:?}");
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        FailureReport::new("panic", message, detail)
    } else {
        FailureReport::new("cancelled", err.to_string(), format!("{err:?}"))
    }
}
