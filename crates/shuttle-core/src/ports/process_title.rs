//! ProcessTitle port - `ps` などに見える worker の状態表示
//!
//! best-effort で、失敗してもセッションには影響しません。

/// Sets the status line shown for the worker process.
pub trait ProcessTitle: Send + Sync {
    fn set(&self, title: &str);
}

/// Title while an item runs.
pub fn running_title(nodeid: &str) -> String {
    format!("[shuttle-worker running] {nodeid}")
}

/// Title between items.
pub const IDLE_TITLE: &str = "[shuttle-worker idle]";

