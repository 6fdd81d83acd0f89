//! CommandDispatcher - 受信したコマンドを WorkQueue への操作に変換
//!
//! transport 側の context（callback）から呼ばれるため、main loop と並行に動きます。
//! WorkQueue は enqueue が同期・非ブロッキングなので、ここでは await しません。

use std::collections::HashSet;
use std::sync::Arc;

use crate::app::emitter::{EventEmitter, WIRE_TARGET};
use crate::domain::{Command, Event, Inbound, ItemIndex};
use crate::ports::InboundCallback;
use crate::queue::{WorkQueue, steal};

pub struct CommandDispatcher {
    queue: Arc<WorkQueue>,
    emitter: EventEmitter,

    /// Number of collected items (for `runtests_all`).
    item_count: usize,
}

impl CommandDispatcher {
    pub fn new(queue: Arc<WorkQueue>, emitter: EventEmitter, item_count: usize) -> Self {
        Self {
            queue,
            emitter,
            item_count,
        }
    }

    pub fn handle(&self, inbound: Inbound) {
        match inbound {
            Inbound::Command(command) => self.dispatch(command),
            Inbound::Closed => {
                tracing::debug!(
                    target: WIRE_TARGET,
                    worker_id = %self.emitter.worker_id(),
                    "channel closed, shutting down"
                );
                self.queue.enqueue_sentinel();
            }
        }
    }

    pub fn dispatch(&self, command: Command) {
        if self.emitter.verbose() {
            tracing::debug!(
                target: WIRE_TARGET,
                worker_id = %self.emitter.worker_id(),
                command = command.name(),
                args = ?command,
                "received command"
            );
        }

        match command {
            Command::RunTests { indices } => {
                for index in indices {
                    self.queue.enqueue(index);
                }
            }
            Command::RunTestsAll => {
                for index in ItemIndex::range(self.item_count) {
                    self.queue.enqueue(index);
                }
            }
            Command::Shutdown => {
                if !self.queue.enqueue_sentinel() && self.emitter.verbose() {
                    tracing::debug!(
                        target: WIRE_TARGET,
                        worker_id = %self.emitter.worker_id(),
                        "shutdown already requested"
                    );
                }
            }
            Command::Steal { indices } => {
                let requested: HashSet<ItemIndex> = indices.into_iter().collect();
                let reclaimed = steal(&self.queue, &requested);
                self.emitter.emit(Event::Unscheduled { indices: reclaimed });
            }
        }
    }

    /// Wrap the dispatcher as the channel's inbound callback.
    pub fn into_callback(self: Arc<Self>) -> InboundCallback {
        Box::new(move |inbound| self.handle(inbound))
    }
}
