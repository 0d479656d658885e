use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use super::{SpanContext, SpanExporter, SpanId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    Error,
    Unknown,
}

/// Outcome of the work a span covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub code: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            message: Some(message.into()),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Unknown,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Timestamped message with free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub time: SystemTime,
    pub message: String,
    pub attributes: Vec<Attribute>,
}

/// An ended span, as handed to the exporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanData {
    pub name: String,
    pub context: SpanContext,
    pub parent_span_id: Option<SpanId>,
    pub start: SystemTime,
    pub end: SystemTime,
    pub status: Status,
    pub annotations: Vec<Annotation>,
}

impl SpanData {
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    pub fn duration(&self) -> Duration {
        self.end.duration_since(self.start).unwrap_or_default()
    }
}

/// An open span.
///
/// Mutable until `end`, which consumes it. Dropping an open span ends it; if
/// the drop happens during a panic and no error status was set, the span is
/// ended with `Error("panicked")`.
pub struct Span {
    context: SpanContext,
    parent: Option<SpanId>,
    name: String,
    start: SystemTime,
    status: Status,
    annotations: Vec<Annotation>,
    exporter: Arc<dyn SpanExporter>,
    ended: bool,
}

impl Span {
    pub(crate) fn new(
        name: String,
        context: SpanContext,
        parent: Option<SpanId>,
        exporter: Arc<dyn SpanExporter>,
    ) -> Self {
        Self {
            context,
            parent,
            name,
            start: SystemTime::now(),
            status: Status::ok(),
            annotations: Vec::new(),
            exporter,
            ended: false,
        }
    }

    pub fn context(&self) -> SpanContext {
        self.context
    }

    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Sampled spans record annotations and are exported; the rest only
    /// carry identity for their children.
    pub fn is_recording(&self) -> bool {
        self.context.is_sampled()
    }

    /// Last write wins.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn annotate(&mut self, message: impl Into<String>, attributes: Vec<Attribute>) {
        if !self.is_recording() {
            return;
        }
        self.annotations.push(Annotation {
            time: SystemTime::now(),
            message: message.into(),
            attributes,
        });
    }

    pub fn end(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        if !self.is_recording() {
            return;
        }

        let data = SpanData {
            name: mem::take(&mut self.name),
            context: self.context,
            parent_span_id: self.parent,
            start: self.start,
            end: SystemTime::now(),
            status: mem::take(&mut self.status),
            annotations: mem::take(&mut self.annotations),
        };
        tracing::trace!(trace_id = %data.context.trace_id(), span_id = %data.context.span_id(), name = %data.name, "span ended");
        self.exporter.export(data);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if std::thread::panicking() && self.status.is_ok() {
            self.status = Status::error("panicked");
        }
        self.finish();
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("parent", &self.parent)
            .field("status", &self.status)
            .field("annotations", &self.annotations.len())
            .finish_non_exhaustive()
    }
}
