//! Domain identifiers (strongly-typed IDs).
//!
//! プロトコル上を流れるのは item の値ではなく index のみです。
//! item 本体（node id や chain）は engine が収集した一覧が正本で、
//! index はその一覧の位置を指します。
//!
//! ## なぜ newtype にするのか？
//! - `usize` のままだと件数やループ変数と混同しやすい
//! - serde では `transparent` にして wire 上はただの整数として流す

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a work item in the engine's ordered, immutable item list.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIndex(usize);

impl ItemIndex {
    pub fn new(value: usize) -> Self {
        Self(value)
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// `0..count` の index を順番に返す（runtests_all 用）
    pub fn range(count: usize) -> impl Iterator<Item = ItemIndex> {
        (0..count).map(ItemIndex)
    }
}

impl From<usize> for ItemIndex {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier the controller assigned to this worker (e.g. `gw0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
