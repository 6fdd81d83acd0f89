//! Queue module: the work queue and the steal protocol.

mod steal;
mod work_queue;

pub use steal::steal;
pub use work_queue::{QueueEntry, WorkQueue};
