//! One timestamped row of telemetry.

use serde::{Deserialize, Serialize};

/// Named field values captured in one tick, in declared order.
///
/// `None` means the field could not be read this tick. It is never the same
/// thing as `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    /// Seconds since the session started.
    pub time: f64,
    pub fields: Vec<(String, Option<f64>)>,
}

impl Reading {
    pub fn new(time: f64) -> Self {
        Self {
            time,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.fields.push((name.into(), value));
    }

    pub fn with(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.push(name, value);
        self
    }

    /// Value of `name`, or `None` if the field is absent or unknown.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| *v)
    }

    /// Whether `name` is part of this reading, present or not.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn absent_count(&self) -> usize {
        self.fields.iter().filter(|(_, v)| v.is_none()).count()
    }
}
