//! App - アプリケーション層
//!
//! ports を組み合わせて worker のセッションを実装します。
//!
//! # 主要コンポーネント
//! - **Worker**: セッション全体と main loop（dequeue→run→complete→next）
//! - **CommandDispatcher**: inbound コマンド → WorkQueue 操作
//! - **DeferredNext**: engine が必要としたときだけ解決される「次の item」
//! - **WorkerObserver**: engine の callback → イベント
//! - **EventEmitter**: イベントの encode と送信
//! - **LogRelayLayer**: ログレコードの転送

pub mod deferred_next;
pub mod dispatcher;
pub mod emitter;
pub mod log_relay;
pub mod observer;
pub mod worker;

// 主要な型を再エクスポート
pub use self::deferred_next::DeferredNext;
pub use self::dispatcher::CommandDispatcher;
pub use self::emitter::{EventEmitter, WIRE_TARGET};
pub use self::log_relay::LogRelayLayer;
pub use self::observer::WorkerObserver;
pub use self::worker::Worker;
