//! Work queue: thread-safe FIFO of pending item indices.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::domain::ItemIndex;

/// Queue element.
///
/// Shutdown is an explicit variant rather than a magic value, so "is this the
/// sentinel" is a pattern match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueEntry {
    Item(ItemIndex),
    Shutdown,
}

impl QueueEntry {
    pub fn item(self) -> Option<ItemIndex> {
        match self {
            QueueEntry::Item(index) => Some(index),
            QueueEntry::Shutdown => None,
        }
    }

    pub fn is_shutdown(self) -> bool {
        matches!(self, QueueEntry::Shutdown)
    }
}

struct QueueState {
    /// Current queue instance.
    entries: VecDeque<QueueEntry>,

    /// Set once a shutdown sentinel has been created. Survives swaps.
    shutdown_requested: bool,
}

/// Pending work for the main loop.
///
/// # 実装詳細
/// - `std::sync::Mutex` で排他制御（ロック中に await しない）
/// - `Notify` で dequeue 待ちを起こす（consumer は main loop 1 本）
/// - enqueue 系は同期・非ブロッキングなので transport の callback から呼べる
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                entries: VecDeque::new(),
                shutdown_requested: false,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, index: ItemIndex) {
        self.push_entry(QueueEntry::Item(index));
    }

    /// Enqueue the shutdown sentinel.
    ///
    /// Returns `false` (and enqueues nothing) if a sentinel was already
    /// created for this queue.
    pub fn enqueue_sentinel(&self) -> bool {
        {
            let mut state = self.lock();
            if state.shutdown_requested {
                return false;
            }
            state.shutdown_requested = true;
            state.entries.push_back(QueueEntry::Shutdown);
        }
        self.notify.notify_one();
        true
    }

    /// Push without the one-sentinel bookkeeping; used when moving entries
    /// between queue instances.
    pub(crate) fn push_entry(&self, entry: QueueEntry) {
        self.lock().entries.push_back(entry);
        self.notify.notify_one();
    }

    /// Wait until an item or the sentinel is available. No timeout.
    pub async fn dequeue(&self) -> QueueEntry {
        loop {
            if let Some(entry) = self.try_dequeue() {
                return entry;
            }
            self.notify.notified().await;
        }
    }

    pub fn try_dequeue(&self) -> Option<QueueEntry> {
        self.lock().entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of what is currently pending, in order.
    pub fn pending(&self) -> Vec<QueueEntry> {
        self.lock().entries.iter().copied().collect()
    }

    /// Swap the current instance for a fresh empty one in a single step and
    /// hand back the old instance.
    pub(crate) fn replace(&self) -> DetachedQueue {
        let old = std::mem::take(&mut self.lock().entries);
        DetachedQueue { entries: old }
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// A queue instance that has been swapped out. Draining it never blocks.
pub(crate) struct DetachedQueue {
    entries: VecDeque<QueueEntry>,
}

impl Iterator for DetachedQueue {
    type Item = QueueEntry;

    fn next(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }
}
