//! Ports - 抽象化レイヤー
//!
//! worker の外側にあるもの（transport, test engine, プロセスタイトル）へのインターフェースです。
//! 実装の詳細は `impls` や利用側の crate に置きます。

pub mod channel;
pub mod engine;
pub mod process_title;

pub use self::channel::{Channel, InboundCallback};
pub use self::engine::{EngineObserver, NextItemHint, TestEngine};
pub use self::process_title::{IDLE_TITLE, ProcessTitle, running_title};
