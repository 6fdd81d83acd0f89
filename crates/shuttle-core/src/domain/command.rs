//! Command - controller から worker への指示
//!
//! wire 形式: `{"name": "runtests", "kwargs": {"indices": [0, 3]}}`
//! 引数のないコマンドは `kwargs` を省略します。

use serde::{Deserialize, Serialize};

use super::ids::ItemIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "kwargs")]
pub enum Command {
    /// Enqueue the given indices in order.
    #[serde(rename = "runtests")]
    RunTests { indices: Vec<ItemIndex> },

    /// Enqueue every collected index `0..N`.
    #[serde(rename = "runtests_all")]
    RunTestsAll,

    /// Enqueue the shutdown sentinel.
    #[serde(rename = "shutdown")]
    Shutdown,

    /// Reclaim the given indices if they are still pending.
    #[serde(rename = "steal")]
    Steal { indices: Vec<ItemIndex> },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::RunTests { .. } => "runtests",
            Command::RunTestsAll => "runtests_all",
            Command::Shutdown => "shutdown",
            Command::Steal { .. } => "steal",
        }
    }
}

/// What the channel's inbound side hands to the dispatcher.
///
/// `Closed` plays the role of the channel's end marker: once the controller
/// side goes away no further commands can arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    Closed,
}

impl From<Command> for Inbound {
    fn from(command: Command) -> Self {
        Inbound::Command(command)
    }
}
