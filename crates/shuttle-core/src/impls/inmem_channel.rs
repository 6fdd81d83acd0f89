//! InMemoryChannel - プロセス内で完結する channel
//!
//! # 学習ポイント
//! - worker 側（`InMemoryChannel`）と controller 側（`ControllerHandle`）のペア
//! - イベントは tokio の unbounded mpsc で流す（`send` は同期・非ブロッキング）
//! - コマンドは呼び出し元のスレッドで callback を直接呼ぶ（transport の context を模倣）
//! - callback 設定前に届いたコマンドはバッファして、設定時に順番通り渡す

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::domain::{ChannelError, Command, Event, Inbound, WireMessage};
use crate::ports::{Channel, InboundCallback};

struct InboundState {
    callback: Option<InboundCallback>,
    buffered: Vec<Inbound>,
    closed: bool,
}

/// Shared inbound side.
///
/// Deliveries happen while the lock is held, so the callback sees commands
/// strictly one at a time and in send order.
struct InboundSlot {
    state: Mutex<InboundState>,
}

impl InboundSlot {
    fn lock(&self) -> MutexGuard<'_, InboundState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, inbound: Inbound) {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return;
        }
        if matches!(inbound, Inbound::Closed) {
            state.closed = true;
        }
        match &state.callback {
            Some(callback) => callback(inbound),
            None => state.buffered.push(inbound),
        }
    }
}

/// Worker side of an in-process channel.
pub struct InMemoryChannel {
    events: mpsc::UnboundedSender<WireMessage>,
    inbound: Arc<InboundSlot>,
}

impl InMemoryChannel {
    /// 新しい channel と、その相手側の `ControllerHandle` を作成
    pub fn pair() -> (InMemoryChannel, ControllerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let inbound = Arc::new(InboundSlot {
            state: Mutex::new(InboundState {
                callback: None,
                buffered: Vec::new(),
                closed: false,
            }),
        });
        (
            InMemoryChannel {
                events: tx,
                inbound: inbound.clone(),
            },
            ControllerHandle { events: rx, inbound },
        )
    }
}

impl Channel for InMemoryChannel {
    fn send(&self, message: WireMessage) -> Result<(), ChannelError> {
        self.events.send(message).map_err(|_| ChannelError::Closed)
    }

    fn set_callback(&self, callback: InboundCallback) -> Result<(), ChannelError> {
        let mut state = self.inbound.lock();
        if state.callback.is_some() {
            return Err(ChannelError::CallbackAlreadySet);
        }
        for inbound in std::mem::take(&mut state.buffered) {
            callback(inbound);
        }
        state.callback = Some(callback);
        Ok(())
    }
}

/// Controller side of an `InMemoryChannel`.
///
/// Dropping the handle closes the inbound side.
pub struct ControllerHandle {
    events: mpsc::UnboundedReceiver<WireMessage>,
    inbound: Arc<InboundSlot>,
}

impl ControllerHandle {
    pub fn send_command(&self, command: Command) {
        self.inbound.deliver(Inbound::Command(command));
    }

    /// Deliver the end marker. Later commands are ignored.
    pub fn close(&self) {
        self.inbound.deliver(Inbound::Closed);
    }

    pub async fn recv(&mut self) -> Option<WireMessage> {
        self.events.recv().await
    }

    /// Receive and decode the next event.
    pub async fn recv_event(&mut self) -> Option<Event> {
        let message = self.events.recv().await?;
        message.to_event().ok()
    }

    /// Everything sent so far, without waiting.
    pub fn drain_events(&mut self) -> Vec<WireMessage> {
        let mut drained = Vec::new();
        while let Ok(message) = self.events.try_recv() {
            drained.push(message);
        }
        drained
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemIndex;

    fn recording_callback() -> (InboundCallback, Arc<Mutex<Vec<Inbound>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: InboundCallback = Box::new(move |inbound| sink.lock().unwrap().push(inbound));
        (callback, seen)
    }

    #[test]
    fn commands_before_callback_are_buffered_in_order() {
        let (channel, controller) = InMemoryChannel::pair();
        controller.send_command(Command::RunTestsAll);
        controller.send_command(Command::Shutdown);

        let (callback, seen) = recording_callback();
        channel.set_callback(callback).unwrap();
        controller.send_command(Command::Steal {
            indices: vec![ItemIndex::new(0)],
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], Inbound::Command(Command::RunTestsAll));
        assert_eq!(seen[1], Inbound::Command(Command::Shutdown));
    }

    #[test]
    fn close_is_delivered_once_and_ends_inbound() {
        let (channel, controller) = InMemoryChannel::pair();
        let (callback, seen) = recording_callback();
        channel.set_callback(callback).unwrap();

        controller.close();
        controller.send_command(Command::RunTestsAll);
        drop(controller);

        assert_eq!(*seen.lock().unwrap(), vec![Inbound::Closed]);
    }

    #[test]
    fn second_callback_is_rejected() {
        let (channel, _controller) = InMemoryChannel::pair();
        channel.set_callback(Box::new(|_| {})).unwrap();
        assert!(matches!(
            channel.set_callback(Box::new(|_| {})),
            Err(ChannelError::CallbackAlreadySet)
        ));
    }
}
