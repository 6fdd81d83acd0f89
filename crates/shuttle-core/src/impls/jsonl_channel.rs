//! JsonLinesChannel - 1 行 1 JSON の channel
//!
//! - 受信: 1 行が 1 つの `Command`（`{"name": "runtests", "kwargs": {...}}`）
//! - 送信: 1 行が 1 つの `WireMessage`（`{"name": ..., "payload": {...}}`）
//!
//! stdin/stdout に限らず、任意の `AsyncBufRead` / `AsyncWrite` で動きます。

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::{ChannelError, Command, EncodeError, Inbound, WireMessage};
use crate::ports::{Channel, InboundCallback};

type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;

pub struct JsonLinesChannel {
    outbound: Mutex<Option<mpsc::UnboundedSender<WireMessage>>>,
    reader: Mutex<Option<BoxedReader>>,
}

impl JsonLinesChannel {
    /// Build the channel and spawn its writer task.
    ///
    /// The reader is only consumed once `set_callback` is called; until then
    /// inbound lines stay unread in the transport.
    pub fn spawn<R, W>(reader: R, writer: W) -> (Self, JoinHandle<Result<(), ChannelError>>)
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_lines(writer, rx));
        let channel = Self {
            outbound: Mutex::new(Some(tx)),
            reader: Mutex::new(Some(Box::new(reader))),
        };
        (channel, writer_task)
    }

    /// Stop accepting events. The writer task drains what is already queued
    /// and then finishes.
    pub fn close_outbound(&self) {
        lock(&self.outbound).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Channel for JsonLinesChannel {
    fn send(&self, message: WireMessage) -> Result<(), ChannelError> {
        match lock(&self.outbound).as_ref() {
            Some(tx) => tx.send(message).map_err(|_| ChannelError::Closed),
            None => Err(ChannelError::Closed),
        }
    }

    fn set_callback(&self, callback: InboundCallback) -> Result<(), ChannelError> {
        let reader = lock(&self.reader)
            .take()
            .ok_or(ChannelError::CallbackAlreadySet)?;
        tokio::spawn(read_lines(reader, callback));
        Ok(())
    }
}

async fn write_lines<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<WireMessage>,
) -> Result<(), ChannelError>
where
    W: AsyncWrite + Send + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_vec(&message).map_err(EncodeError::from)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn read_lines(reader: BoxedReader, callback: InboundCallback) {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Command>(line) {
                    Ok(command) => callback(Inbound::Command(command)),
                    Err(e) => tracing::warn!(error = %e, line, "ignoring undecodable command"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "inbound read failed, closing channel");
                break;
            }
        }
    }
    callback(Inbound::Closed);
}
