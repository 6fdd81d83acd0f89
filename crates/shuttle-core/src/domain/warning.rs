//! Warning serialization
//!
//! 捕捉された warning を transport 可能な形（`WarningRecord`）に射影します。
//!
//! # ポイント
//! - 各フィールドの「送れるかどうか」は実際に encode してみて判定する
//! - 捕まえるのは encoder 自身の「encode できない」失敗（`EncodeError::Unencodable`）だけ
//! - detail は送れなければ `Debug` 表現に落とす（省略すると受信側で復元できない）

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::EncodeError;
use super::finite::find_non_finite;

/// Detail names a captured warning carries besides message and category.
pub const STANDARD_DETAILS: &[&str] = &["filename", "lineno", "file", "line", "source"];

/// A value that may or may not survive the transport encoding.
pub trait Transportable: fmt::Debug + Send + Sync {
    fn to_wire(&self) -> Result<Value, EncodeError>;
}

impl<T> Transportable for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_wire(&self) -> Result<Value, EncodeError> {
        if let Some(value) = find_non_finite(self) {
            return Err(EncodeError::Unencodable(format!("non-finite float {value}")));
        }
        Ok(serde_json::to_value(self)?)
    }
}

/// The warning's message: plain text or an exception-like object.
#[derive(Debug, Clone)]
pub enum WarningMessage {
    Text(String),
    Exception {
        module: String,
        class_name: String,
        text: String,
        args: Vec<Arc<dyn Transportable>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningCategory {
    pub module: String,
    pub class_name: String,
}

impl WarningCategory {
    pub fn new(module: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            class_name: class_name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WarningDetail {
    pub name: String,
    pub value: Arc<dyn Transportable>,
}

/// A warning occurrence as captured by the engine.
#[derive(Debug, Clone)]
pub struct CapturedWarning {
    pub message: WarningMessage,
    pub category: Option<WarningCategory>,
    pub details: Vec<WarningDetail>,
}

impl CapturedWarning {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: WarningMessage::Text(message.into()),
            category: None,
            details: Vec::new(),
        }
    }

    pub fn exception(
        module: impl Into<String>,
        class_name: impl Into<String>,
        text: impl Into<String>,
        args: Vec<Arc<dyn Transportable>>,
    ) -> Self {
        Self {
            message: WarningMessage::Exception {
                module: module.into(),
                class_name: class_name.into(),
                text: text.into(),
                args,
            },
            category: None,
            details: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: WarningCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_detail<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Transportable + 'static,
    {
        self.details.push(WarningDetail {
            name: name.into(),
            value: Arc::new(value),
        });
        self
    }

    /// Fill the standard detail set from a source position.
    pub fn located(self, filename: impl Into<String>, lineno: u32) -> Self {
        self.with_detail(STANDARD_DETAILS[0], filename.into())
            .with_detail(STANDARD_DETAILS[1], lineno)
            .with_detail(STANDARD_DETAILS[2], Value::Null)
            .with_detail(STANDARD_DETAILS[3], Value::Null)
            .with_detail(STANDARD_DETAILS[4], Value::Null)
    }
}

/// Transport-safe projection of a `CapturedWarning`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub message_str: String,
    pub message_module: Option<String>,
    pub message_class_name: Option<String>,
    pub message_args: Option<Vec<Value>>,
    pub category_module: Option<String>,
    pub category_class_name: Option<String>,

    #[serde(flatten)]
    pub details: BTreeMap<String, Value>,
}

/// Project a captured warning onto its wire form.
///
/// Only `EncodeError::Unencodable` degrades a field; any other encoder
/// failure is returned to the caller.
pub fn serialize_warning(warning: &CapturedWarning) -> Result<WarningRecord, EncodeError> {
    let (message_str, message_module, message_class_name, message_args) = match &warning.message
    {
        WarningMessage::Text(text) => (text.clone(), None, None, None),
        WarningMessage::Exception {
            module,
            class_name,
            text,
            args,
        } => (
            text.clone(),
            Some(module.clone()),
            Some(class_name.clone()),
            encode_args(args)?,
        ),
    };

    let (category_module, category_class_name) = match &warning.category {
        Some(category) => (Some(category.module.clone()), Some(category.class_name.clone())),
        None => (None, None),
    };

    let mut details = BTreeMap::new();
    for detail in &warning.details {
        if detail.name == "message" || detail.name == "category" {
            continue;
        }
        let value = match detail.value.to_wire() {
            Ok(value) => value,
            Err(e) if e.is_unencodable() => Value::String(format!("{:?}", detail.value)),
            Err(e) => return Err(e),
        };
        details.insert(detail.name.clone(), value);
    }

    Ok(WarningRecord {
        message_str,
        message_module,
        message_class_name,
        message_args,
        category_module,
        category_class_name,
        details,
    })
}

/// Args travel all-or-nothing: one unencodable arg nulls the whole field.
fn encode_args(args: &[Arc<dyn Transportable>]) -> Result<Option<Vec<Value>>, EncodeError> {
    let mut encoded = Vec::with_capacity(args.len());
    for arg in args {
        match arg.to_wire() {
            Ok(value) => encoded.push(value),
            Err(e) if e.is_unencodable() => return Ok(None),
            Err(e) => return Err(e),
        }
    }
    Ok(Some(encoded))
}
