//! Test support: a scripted engine and item fixtures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{
    Collection, EngineError, EngineReport, ItemIndex, Location, ReportOutcome, WorkItem,
    exit_status,
};
use crate::ports::{EngineObserver, NextItemHint, ProcessTitle, TestEngine};

/// Keeps every title it was given.
#[derive(Default)]
pub(crate) struct RecordingTitle {
    titles: Mutex<Vec<String>>,
}

impl RecordingTitle {
    pub(crate) fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

impl ProcessTitle for RecordingTitle {
    fn set(&self, title: &str) {
        self.titles.lock().unwrap().push(title.to_string());
    }
}

/// `n` items, two per module, each with a `session / module / test` chain.
pub(crate) fn sample_items(n: usize) -> Vec<WorkItem> {
    (0..n)
        .map(|i| {
            let module = format!("mod_{}.rs", i / 2);
            let nodeid = format!("{module}::test_{i}");
            WorkItem::new(
                nodeid.clone(),
                Location::new(module.clone(), Some(i as u32), format!("test_{i}")),
                vec!["session".into(), module, nodeid],
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Fail(&'static str),
    Panic(&'static str),
    /// Report under a node id that is not the running item's.
    WrongReport,
    /// Pass after sleeping inside the engine call.
    Sleep(Duration),
}

/// One recorded `run_item` call: the index and the next chain the engine saw.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunRecord {
    pub index: ItemIndex,
    pub next_chain: Vec<String>,
}

pub(crate) struct ScriptedEngine {
    items: Vec<WorkItem>,
    behaviors: HashMap<usize, Behavior>,
    collect_error: Option<&'static str>,
    runs: Mutex<Vec<RunRecord>>,
}

impl ScriptedEngine {
    pub(crate) fn new(items: Vec<WorkItem>) -> Self {
        Self {
            items,
            behaviors: HashMap::new(),
            collect_error: None,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_behavior(mut self, index: usize, behavior: Behavior) -> Self {
        self.behaviors.insert(index, behavior);
        self
    }

    pub(crate) fn failing_collection(mut self, message: &'static str) -> Self {
        self.collect_error = Some(message);
        self
    }

    pub(crate) fn runs(&self) -> Vec<RunRecord> {
        self.runs.lock().unwrap().clone()
    }

    pub(crate) fn ran(&self) -> Vec<usize> {
        self.runs().iter().map(|r| r.index.get()).collect()
    }
}

#[async_trait]
impl TestEngine for ScriptedEngine {
    async fn collect(&self, observer: &dyn EngineObserver) -> Result<Collection, EngineError> {
        if let Some(message) = self.collect_error {
            return Err(EngineError::Failed(message.to_string()));
        }
        for item in &self.items {
            let report = EngineReport::new(item.nodeid.clone(), ReportOutcome::Passed);
            observer.collect_report(&report)?;
        }
        Ok(Collection {
            topdir: "/project".into(),
            items: self.items.clone(),
        })
    }

    async fn run_item(
        &self,
        index: ItemIndex,
        item: &WorkItem,
        next: &dyn NextItemHint,
        observer: &dyn EngineObserver,
    ) -> Result<(), EngineError> {
        observer.log_start(&item.nodeid, &item.location)?;
        match self.behaviors.get(&index.get()) {
            Some(Behavior::Fail(message)) => {
                self.runs.lock().unwrap().push(RunRecord {
                    index,
                    next_chain: Vec::new(),
                });
                return Err(EngineError::Failed(message.to_string()));
            }
            Some(Behavior::Panic(message)) => panic!("{message}"),
            Some(Behavior::WrongReport) => {
                observer.test_report(&EngineReport::new("elsewhere::x", ReportOutcome::Passed))?;
            }
            Some(Behavior::Sleep(duration)) => {
                tokio::time::sleep(*duration).await;
                let report = EngineReport::new(item.nodeid.clone(), ReportOutcome::Passed);
                observer.test_report(&report)?;
            }
            None => {
                let report = EngineReport::new(item.nodeid.clone(), ReportOutcome::Passed);
                observer.test_report(&report)?;
            }
        }

        // teardown: ask twice, the way an engine comparing several scopes would
        let next_chain = next.chain().await;
        let again = next.chain().await;
        assert_eq!(next_chain, again);

        self.runs.lock().unwrap().push(RunRecord { index, next_chain });
        observer.log_finish(&item.nodeid, &item.location)?;
        Ok(())
    }

    async fn finish_session(&self) -> Result<i32, EngineError> {
        let failed = self
            .behaviors
            .values()
            .any(|b| matches!(b, Behavior::Fail(_) | Behavior::Panic(_)));
        Ok(if failed {
            exit_status::TESTS_FAILED
        } else {
            exit_status::OK
        })
    }
}
