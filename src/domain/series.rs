// Market series domain models
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for the instrument being charted (e.g. "bitcoin").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One raw price observation as reported upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp_ms: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// Lookback window requested from the upstream API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    pub days: u32,
}

impl Lookback {
    pub fn days(days: u32) -> Self {
        Self { days }
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self { days: 1 }
    }
}
