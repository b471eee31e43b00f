//! Telemetry sink seam
//!
//! The broker client is external; the core hands it a topic and a JSON value.
//! Delivery guarantees belong to the sink.

use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use thiserror::Error;

/// Errors raised while handing a record to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize record for {topic}: {source}")]
    Serialize {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write record for {topic}: {source}")]
    Io {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sink rejected record for {topic}: {reason}")]
    Rejected { topic: String, reason: String },
}

/// Destination for published records
pub trait TelemetrySink {
    fn publish(&mut self, topic: &str, record: &Value) -> Result<(), SinkError>;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn publish(&mut self, topic: &str, record: &Value) -> Result<(), SinkError> {
        (**self).publish(topic, record)
    }
}

/// Serialize `record` and publish it on `topic`
pub fn publish_record<S, R>(sink: &mut S, topic: &str, record: &R) -> Result<(), SinkError>
where
    S: TelemetrySink + ?Sized,
    R: Serialize,
{
    let value = serde_json::to_value(record).map_err(|source| SinkError::Serialize {
        topic: topic.to_string(),
        source,
    })?;
    sink.publish(topic, &value)
}

/// Topic names under a common prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn position(&self) -> String {
        self.topic("position")
    }

    pub fn latency(&self) -> String {
        self.topic("latency")
    }

    pub fn error(&self) -> String {
        self.topic("error")
    }

    pub fn anchors(&self) -> String {
        self.topic("anchors")
    }

    fn topic(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), name)
        }
    }
}

/// Writes one `{"topic": .., "payload": ..}` JSON object per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TelemetrySink for JsonLinesSink<W> {
    fn publish(&mut self, topic: &str, record: &Value) -> Result<(), SinkError> {
        let line = serde_json::json!({ "topic": topic, "payload": record });
        let io_error = |source| SinkError::Io {
            topic: topic.to_string(),
            source,
        };
        writeln!(self.writer, "{}", line).map_err(io_error)?;
        self.writer.flush().map_err(io_error)
    }
}

/// A record captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedRecord {
    pub topic: String,
    pub payload: Value,
}

/// Keeps every published record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<PublishedRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[PublishedRecord] {
        &self.records
    }

    pub fn records_on(&self, topic: &str) -> Vec<&PublishedRecord> {
        self.records.iter().filter(|r| r.topic == topic).collect()
    }
}

impl TelemetrySink for MemorySink {
    fn publish(&mut self, topic: &str, record: &Value) -> Result<(), SinkError> {
        self.records.push(PublishedRecord {
            topic: topic.to_string(),
            payload: record.clone(),
        });
        Ok(())
    }
}
