//! Domain model (ids, commands, events, reports, warnings, log records).

pub mod command;
pub mod errors;
pub mod events;
mod finite;
pub mod ids;
pub mod log_record;
pub mod report;
pub mod warning;

pub use command::{Command, Inbound};
pub use errors::{ChannelError, EncodeError, EngineError, WorkerError};
pub use events::{Event, WireMessage};
pub use ids::{ItemIndex, WorkerId};
pub use log_record::LogRecordSnapshot;
pub use report::{
    Collection, EngineReport, FailureReport, Location, ReportOutcome, WarningWhen, WorkItem,
    WorkerInfo, WorkerOutput, exit_status,
};
pub use warning::{
    CapturedWarning, STANDARD_DETAILS, Transportable, WarningCategory, WarningMessage,
    WarningRecord, serialize_warning,
};
