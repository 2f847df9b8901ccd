//! Measurement result records
//!
//! A result is an append-only ordered field map with fixed required fields
//! (device identity, task type, timestamp, success) plus measurement-specific
//! fields. It serializes to a metrics wire form for the reporting
//! collaborator and renders a human-readable summary for CLI/log display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed metric field value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Integer-valued field
    Integer(i64),
    /// Text-valued field
    Text(String),
    /// Boolean-valued field
    Flag(bool),
}

impl MetricValue {
    /// Integer payload, if this is an [`MetricValue::Integer`]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            MetricValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload, if this is a [`MetricValue::Text`]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean payload, if this is a [`MetricValue::Flag`]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            MetricValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            MetricValue::Integer(v) => serde_json::Value::from(*v),
            MetricValue::Text(v) => serde_json::Value::from(v.clone()),
            MetricValue::Flag(v) => serde_json::Value::from(*v),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Flag(v)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(v) => write!(f, "{v}"),
            MetricValue::Text(v) => write!(f, "{v}"),
            MetricValue::Flag(v) => write!(f, "{v}"),
        }
    }
}

/// Result record for one measurement run
///
/// Owned by the caller once returned; carries no back-reference to the
/// executor that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeasurementResult {
    /// Identity of the device that ran the measurement
    pub device_id: String,
    /// Task type that produced this record (e.g. "http")
    pub task_type: String,
    /// Scheduler key of the task instance, when assigned
    pub task_key: Option<String>,
    /// Wall-clock timestamp the record was assembled
    pub timestamp: DateTime<Utc>,
    /// Whether the run met its success criterion
    pub success: bool,
    /// Measurement fields in insertion order
    fields: Vec<(String, MetricValue)>,
}

impl MeasurementResult {
    /// Create an empty record with the required fields filled in
    pub fn new(
        device_id: impl Into<String>,
        task_type: impl Into<String>,
        task_key: Option<String>,
        timestamp: DateTime<Utc>,
        success: bool,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            task_type: task_type.into(),
            task_key,
            timestamp,
            success,
            fields: Vec::new(),
        }
    }

    /// Append a measurement field; insertion order is preserved
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<MetricValue>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Look up a field by name (first match wins)
    pub fn field(&self, name: &str) -> Option<&MetricValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Measurement fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &(String, MetricValue)> {
        self.fields.iter()
    }

    /// Metrics wire form: one JSON object with the required fields followed
    /// by a `values` object holding every measurement field in insertion
    /// order
    pub fn to_metrics(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "device_id".to_string(),
            serde_json::Value::from(self.device_id.clone()),
        );
        map.insert(
            "task_type".to_string(),
            serde_json::Value::from(self.task_type.clone()),
        );
        if let Some(key) = &self.task_key {
            map.insert("task_key".to_string(), serde_json::Value::from(key.clone()));
        }
        map.insert(
            "timestamp".to_string(),
            serde_json::Value::from(self.timestamp.to_rfc3339()),
        );
        map.insert("success".to_string(), serde_json::Value::from(self.success));

        let mut values = serde_json::Map::new();
        for (name, value) in &self.fields {
            values.insert(name.clone(), value.to_json());
        }
        map.insert("values".to_string(), serde_json::Value::Object(values));

        serde_json::Value::Object(map)
    }
}

impl fmt::Display for MeasurementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{} measurement] device={} success={} at {}",
            self.task_type,
            self.device_id,
            self.success,
            self.timestamp.to_rfc3339()
        )?;
        if let Some(key) = &self.task_key {
            writeln!(f, "  key: {key}")?;
        }
        for (name, value) in &self.fields {
            writeln!(f, "  {name}: {value}")?;
        }
        Ok(())
    }
}
