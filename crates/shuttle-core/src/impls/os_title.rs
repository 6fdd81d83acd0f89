//! OsProcessTitle - OS のプロセスタイトルに書く `ProcessTitle`

use crate::ports::ProcessTitle;

/// Writes through `proctitle`. Platforms without support ignore the call.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProcessTitle;

impl ProcessTitle for OsProcessTitle {
    fn set(&self, title: &str) {
        tracing::trace!(title, "setting process title");
        proctitle::set_title(title);
    }
}
