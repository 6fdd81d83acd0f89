//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryChannel**: プロセス内の channel（テスト・組み込み用）
//! - **JsonLinesChannel**: 1 行 1 メッセージの JSON を任意の byte stream 上で扱う
//! - **OsProcessTitle**: OS のプロセスタイトル

pub mod inmem_channel;
pub mod jsonl_channel;
pub mod os_title;

// 主要な型を再エクスポート
pub use self::inmem_channel::{ControllerHandle, InMemoryChannel};
pub use self::jsonl_channel::JsonLinesChannel;
pub use self::os_title::OsProcessTitle;
