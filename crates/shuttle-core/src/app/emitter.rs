//! EventEmitter - イベントを encode して channel に流す
//!
//! # ポイント
//! - `send` は結果を返す。`emit` は失敗をログに残して続行する
//! - verbose 時のローカルログは `WIRE_TARGET` に出す（log relay はこの target を転送しない）

use std::sync::Arc;

use crate::domain::{ChannelError, Event, WorkerId};
use crate::ports::Channel;

/// tracing target for the emitter's own diagnostics.
pub const WIRE_TARGET: &str = "shuttle::wire";

#[derive(Clone)]
pub struct EventEmitter {
    channel: Arc<dyn Channel>,
    worker_id: WorkerId,
    verbose: bool,
}

impl EventEmitter {
    pub fn new(channel: Arc<dyn Channel>, worker_id: WorkerId, verbose: bool) -> Self {
        Self {
            channel,
            worker_id,
            verbose,
        }
    }

    pub fn worker_id(&self) -> &WorkerId {
        &self.worker_id
    }

    /// Whether wire-level traffic is logged locally.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Encode and send one event. Events sent from one thread keep their
    /// order on the wire.
    pub fn send(&self, event: Event) -> Result<(), ChannelError> {
        if self.verbose {
            tracing::debug!(
                target: WIRE_TARGET,
                worker_id = %self.worker_id,
                event = event.name(),
                payload = ?event,
                "sending"
            );
        }
        let wire = event.to_wire()?;
        self.channel.send(wire)
    }

    /// Send, logging instead of returning a failure.
    pub fn emit(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event) {
            tracing::warn!(
                target: WIRE_TARGET,
                worker_id = %self.worker_id,
                event = name,
                error = %e,
                "failed to send event"
            );
        }
    }
}
