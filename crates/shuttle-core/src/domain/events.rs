//! Events - worker から controller へ送るイベント
//!
//! wire 上は `(name, payload)` の組です。payload は常に JSON object で、
//! 引数のないイベントは空 object になります。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::EncodeError;
use super::ids::ItemIndex;
use super::log_record::LogRecordSnapshot;
use super::report::{FailureReport, Location, WarningWhen, WorkerInfo, WorkerOutput};
use super::warning::WarningRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload")]
pub enum Event {
    #[serde(rename = "workerready")]
    WorkerReady { workerinfo: WorkerInfo },

    #[serde(rename = "collectionstart")]
    CollectionStart,

    #[serde(rename = "collect_error")]
    CollectError { formatted_error: String },

    #[serde(rename = "collectionfinish")]
    CollectionFinish { topdir: String, ids: Vec<String> },

    #[serde(rename = "logstart")]
    LogStart { nodeid: String, location: Location },

    #[serde(rename = "logfinish")]
    LogFinish { nodeid: String, location: Location },

    /// Engine report plus `item_index`, `worker_id` and `testrun_uid`.
    #[serde(rename = "testreport")]
    TestReport { data: Map<String, Value> },

    /// Only sent for collection reports that did not pass.
    #[serde(rename = "collectreport")]
    CollectReport { data: Map<String, Value> },

    #[serde(rename = "warning_recorded")]
    WarningRecorded {
        warning_message_data: WarningRecord,
        when: WarningWhen,
        nodeid: String,
        location: Option<Location>,
    },

    #[serde(rename = "runtest_need_work")]
    RuntestNeedWork,

    #[serde(rename = "runtest_protocol_complete")]
    RuntestProtocolComplete { item_index: ItemIndex, duration: f64 },

    #[serde(rename = "unscheduled")]
    Unscheduled { indices: Vec<ItemIndex> },

    #[serde(rename = "exception")]
    Exception { exception: FailureReport },

    #[serde(rename = "internal_error")]
    InternalError { formatted_error: String },

    #[serde(rename = "workerfinished")]
    WorkerFinished { workeroutput: WorkerOutput },

    #[serde(rename = "runtest_logmessage")]
    LogMessage { record: LogRecordSnapshot },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::WorkerReady { .. } => "workerready",
            Event::CollectionStart => "collectionstart",
            Event::CollectError { .. } => "collect_error",
            Event::CollectionFinish { .. } => "collectionfinish",
            Event::LogStart { .. } => "logstart",
            Event::LogFinish { .. } => "logfinish",
            Event::TestReport { .. } => "testreport",
            Event::CollectReport { .. } => "collectreport",
            Event::WarningRecorded { .. } => "warning_recorded",
            Event::RuntestNeedWork => "runtest_need_work",
            Event::RuntestProtocolComplete { .. } => "runtest_protocol_complete",
            Event::Unscheduled { .. } => "unscheduled",
            Event::Exception { .. } => "exception",
            Event::InternalError { .. } => "internal_error",
            Event::WorkerFinished { .. } => "workerfinished",
            Event::LogMessage { .. } => "runtest_logmessage",
        }
    }

    /// Encode into the `(name, payload)` pair that crosses the channel.
    pub fn to_wire(&self) -> Result<WireMessage, EncodeError> {
        let payload = match serde_json::to_value(self)? {
            Value::Object(mut tagged) => match tagged.remove("payload") {
                Some(Value::Object(payload)) => payload,
                _ => Map::new(),
            },
            _ => Map::new(),
        };
        Ok(WireMessage {
            name: self.name().to_string(),
            payload,
        })
    }
}

/// What actually crosses the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub name: String,
    pub payload: Map<String, Value>,
}

impl WireMessage {
    /// Decode back into an `Event` (controller side, tests).
    pub fn to_event(&self) -> Result<Event, serde_json::Error> {
        let mut tagged = Map::new();
        tagged.insert("name".into(), Value::String(self.name.clone()));
        if !self.payload.is_empty() {
            tagged.insert("payload".into(), Value::Object(self.payload.clone()));
        }
        serde_json::from_value(Value::Object(tagged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unit_events_carry_empty_payload() {
        let wire = Event::RuntestNeedWork.to_wire().unwrap();
        assert_eq!(wire.name, "runtest_need_work");
        assert!(wire.payload.is_empty());
        assert_eq!(wire.to_event().unwrap(), Event::RuntestNeedWork);
    }

    #[test]
    fn protocol_complete_payload_keys() {
        let event = Event::RuntestProtocolComplete {
            item_index: ItemIndex::new(4),
            duration: 0.25,
        };
        let wire = event.to_wire().unwrap();
        assert_eq!(wire.name, "runtest_protocol_complete");
        assert_eq!(Value::Object(wire.payload.clone()), json!({"item_index": 4, "duration": 0.25}));
        assert_eq!(wire.to_event().unwrap(), event);
    }

    #[test]
    fn wire_name_matches_serde_tag() {
        let events = vec![
            Event::CollectionStart,
            Event::Unscheduled { indices: vec![] },
            Event::InternalError {
                formatted_error: "boom".into(),
            },
        ];
        for event in events {
            let tagged = serde_json::to_value(&event).unwrap();
            assert_eq!(tagged["name"], event.name());
        }
    }
}
