//! LogRelayLayer - ログレコードを `runtest_logmessage` として controller に転送
//!
//! tracing-subscriber の `Layer` として組み込みます。
//!
//! # ルール
//! - `level` 以上の重大度のレコードだけを転送
//! - `WIRE_TARGET` のレコード（emitter 自身の診断）は転送しない
//! - 転送中に発生したレコードは転送しない（再入ガード）
//! - 転送に失敗したら stderr に書いて続行

use std::cell::Cell;
use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event as TracingEvent, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::app::emitter::{EventEmitter, WIRE_TARGET};
use crate::config::WorkerConfig;
use crate::domain::{Event, LogRecordSnapshot};

thread_local! {
    static RELAYING: Cell<bool> = const { Cell::new(false) };
}

/// Clears the thread's relay flag on drop.
struct RelayGuard;

impl RelayGuard {
    fn enter() -> Option<Self> {
        RELAYING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(RelayGuard)
            }
        })
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        RELAYING.with(|flag| flag.set(false));
    }
}

pub struct LogRelayLayer {
    emitter: EventEmitter,
    level: Level,
}

impl LogRelayLayer {
    pub fn new(emitter: EventEmitter, level: Level) -> Self {
        Self { emitter, level }
    }

    /// `None` when the config leaves the relay off.
    pub fn from_config(config: &WorkerConfig, emitter: EventEmitter) -> Option<Self> {
        config.log_relay_level.map(|level| Self::new(emitter, level))
    }

    fn relays(&self, level: &Level, target: &str) -> bool {
        // tracing orders levels by verbosity: ERROR is the smallest
        *level <= self.level && !target.starts_with(WIRE_TARGET)
    }
}

impl<S: Subscriber> Layer<S> for LogRelayLayer {
    fn on_event(&self, event: &TracingEvent<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !self.relays(meta.level(), meta.target()) {
            return;
        }
        let Some(_guard) = RelayGuard::enter() else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let record = LogRecordSnapshot {
            level: LogRecordSnapshot::level_name(meta.level()).to_string(),
            target: meta.target().to_string(),
            message: visitor.finish(),
            module_path: meta.module_path().map(str::to_string),
            file: meta.file().map(str::to_string),
            line: meta.line(),
            thread: std::thread::current().name().map(str::to_string),
            created: chrono::Utc::now(),
        };

        if let Err(e) = self.emitter.send(Event::LogMessage { record }) {
            eprintln!(
                "[{}] failed to relay log record: {e}",
                self.emitter.worker_id()
            );
        }
    }
}

/// Renders `message` followed by `key=value` for every other field.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push_field(field.name(), format_args!("{value}"));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}
