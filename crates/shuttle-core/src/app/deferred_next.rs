//! DeferredNext - 「次の item」を遅延解決するハンドル
//!
//! engine は scope 付き fixture を片付ける直前に、次の item が同じ fixture を
//! 使うかどうかを知る必要があります。worker はその瞬間まで controller に
//! 追加の仕事を要求しません（2 件を同時に抱え込まないため）。
//!
//! # 学習ポイント
//! - `tokio::sync::OnceCell` で「最初の 1 回だけ解決」を保証
//! - 2 回目以降の問い合わせは通信せずキャッシュを返す

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::app::emitter::EventEmitter;
use crate::domain::{Event, WorkItem};
use crate::ports::NextItemHint;
use crate::queue::{QueueEntry, WorkQueue};

pub struct DeferredNext {
    queue: Arc<WorkQueue>,
    emitter: EventEmitter,
    items: Arc<[WorkItem]>,
    resolved: OnceCell<QueueEntry>,
}

impl DeferredNext {
    pub fn new(queue: Arc<WorkQueue>, emitter: EventEmitter, items: Arc<[WorkItem]>) -> Self {
        Self {
            queue,
            emitter,
            items,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve (at most once) and return the next queue entry.
    ///
    /// The first call announces `runtest_need_work` and then blocks on the
    /// queue until an index or the sentinel arrives.
    pub async fn next_entry(&self) -> QueueEntry {
        *self
            .resolved
            .get_or_init(|| async {
                self.emitter.emit(Event::RuntestNeedWork);
                self.queue.dequeue().await
            })
            .await
    }

    /// The cached entry, if resolution already happened.
    pub fn peek(&self) -> Option<QueueEntry> {
        self.resolved.get().copied()
    }
}

#[async_trait]
impl NextItemHint for DeferredNext {
    async fn chain(&self) -> Vec<String> {
        match self.next_entry().await {
            QueueEntry::Item(index) => match self.items.get(index.get()) {
                Some(item) => item.chain.clone(),
                None => {
                    tracing::warn!(
                        item_index = %index,
                        item_count = self.items.len(),
                        "next index is outside the item list"
                    );
                    Vec::new()
                }
            },
            QueueEntry::Shutdown => Vec::new(),
        }
    }
}

impl std::fmt::Debug for DeferredNext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DeferredNext").field(&self.peek()).finish()
    }
}
