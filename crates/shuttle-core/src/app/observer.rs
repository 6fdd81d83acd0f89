//! WorkerObserver - engine の callback をイベントに変換する
//!
//! engine は決まった時点でこの observer を同期的に呼びます。
//! 送信失敗は `EventEmitter::emit` がログに残して握りつぶすので、
//! ここで `Err` を返すのは callback 自体が不正なとき（別 item の report など）だけです。

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::app::emitter::EventEmitter;
use crate::config::WorkerConfig;
use crate::domain::{
    CapturedWarning, Collection, EngineReport, Event, ItemIndex, Location, WarningWhen,
    WorkerError, WorkerInfo, serialize_warning,
};
use crate::ports::EngineObserver;

#[derive(Debug, Clone)]
struct ActiveItem {
    index: ItemIndex,
    nodeid: String,
}

pub struct WorkerObserver {
    emitter: EventEmitter,
    config: WorkerConfig,
    active: Mutex<Option<ActiveItem>>,
}

impl WorkerObserver {
    pub fn new(emitter: EventEmitter, config: WorkerConfig) -> Self {
        Self {
            emitter,
            config,
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveItem>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the item whose reports are expected next.
    pub fn begin_item(&self, index: ItemIndex, nodeid: &str) {
        *self.active() = Some(ActiveItem {
            index,
            nodeid: nodeid.to_string(),
        });
    }

    pub fn end_item(&self) {
        self.active().take();
    }
}

impl EngineObserver for WorkerObserver {
    fn session_start(&self) -> Result<(), WorkerError> {
        self.emitter.emit(Event::WorkerReady {
            workerinfo: WorkerInfo::current(),
        });
        Ok(())
    }

    fn collection_start(&self) -> Result<(), WorkerError> {
        self.emitter.emit(Event::CollectionStart);
        Ok(())
    }

    fn collection_finish(&self, collection: &Collection) -> Result<(), WorkerError> {
        self.emitter.emit(Event::CollectionFinish {
            topdir: collection.topdir.clone(),
            ids: collection.items.iter().map(|item| item.nodeid.clone()).collect(),
        });
        Ok(())
    }

    fn collect_report(&self, report: &EngineReport) -> Result<(), WorkerError> {
        // passed collection reports are never needed by the controller
        if !report.passed() {
            self.emitter.emit(Event::CollectReport {
                data: report.data.clone(),
            });
        }
        Ok(())
    }

    fn log_start(&self, nodeid: &str, location: &Location) -> Result<(), WorkerError> {
        self.emitter.emit(Event::LogStart {
            nodeid: nodeid.to_string(),
            location: location.clone(),
        });
        Ok(())
    }

    fn log_finish(&self, nodeid: &str, location: &Location) -> Result<(), WorkerError> {
        self.emitter.emit(Event::LogFinish {
            nodeid: nodeid.to_string(),
            location: location.clone(),
        });
        Ok(())
    }

    fn test_report(&self, report: &EngineReport) -> Result<(), WorkerError> {
        let active = self.active().clone().ok_or_else(|| WorkerError::NoActiveItem {
            nodeid: report.nodeid.clone(),
        })?;
        if active.nodeid != report.nodeid {
            return Err(WorkerError::ReportMismatch {
                expected: active.nodeid,
                got: report.nodeid.clone(),
            });
        }

        let mut data = report.data.clone();
        data.insert("item_index".into(), Value::from(active.index.get()));
        data.insert(
            "worker_id".into(),
            Value::String(self.config.worker_id.to_string()),
        );
        data.insert(
            "testrun_uid".into(),
            Value::String(self.config.testrun_uid.clone()),
        );
        self.emitter.emit(Event::TestReport { data });
        Ok(())
    }

    fn warning_recorded(
        &self,
        warning: &CapturedWarning,
        when: WarningWhen,
        nodeid: &str,
        location: Option<&Location>,
    ) -> Result<(), WorkerError> {
        let warning_message_data = serialize_warning(warning)?;
        self.emitter.emit(Event::WarningRecorded {
            warning_message_data,
            when,
            nodeid: nodeid.to_string(),
            location: location.cloned(),
        });
        Ok(())
    }

    fn internal_error(&self, formatted_error: &str) -> Result<(), WorkerError> {
        for line in formatted_error.lines() {
            tracing::error!(worker_id = %self.config.worker_id, "IERROR> {line}");
        }
        self.emitter.emit(Event::InternalError {
            formatted_error: formatted_error.to_string(),
        });
        Ok(())
    }
}
