//! shuttle-core
//!
//! Worker side of a distributed test runner.
//!
//! controller から item index の割り当てを受け取り、テスト engine で 1 件ずつ
//! 実行して、結果をイベントとして送り返します。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, command, events, report, warning, log_record, errors）
//! - **ports**: 抽象化レイヤー（Channel, TestEngine, EngineObserver, NextItemHint, ProcessTitle）
//! - **queue**: WorkQueue と steal
//! - **app**: Worker, CommandDispatcher, DeferredNext, WorkerObserver, LogRelayLayer
//! - **impls**: InMemoryChannel, JsonLinesChannel, OsProcessTitle
//! - **config**: WorkerConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

#[cfg(test)]
mod testing;
