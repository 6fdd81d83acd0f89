//! Channel port - controller との双方向メッセージ通路
//!
//! transport の framing や接続の確立はこの crate の外側の責務です。
//! worker が必要とするのは次の 2 つだけ：
//! - `send`: イベントを 1 件、原子的に送る（送信者ごとの FIFO）
//! - `set_callback`: 受信したコマンドを渡す callback を設定する

use crate::domain::{ChannelError, Inbound, WireMessage};

/// Invoked from the transport's own context (thread or task), concurrently
/// with the main loop.
pub type InboundCallback = Box<dyn Fn(Inbound) + Send + Sync>;

/// Channel は worker ⇔ controller の通路
///
/// # 設計原則
/// - `send` は同期・非ブロッキング（log relay は任意のスレッドから呼ぶ）
/// - callback が設定される前に届いたコマンドは実装側で保持しておく
/// - 受信側が閉じたら `Inbound::Closed` を 1 回だけ渡す
pub trait Channel: Send + Sync {
    fn send(&self, message: WireMessage) -> Result<(), ChannelError>;

    fn set_callback(&self, callback: InboundCallback) -> Result<(), ChannelError>;
}
