// Display series domain model - the windowed, label-formatted series handed to the chart
use super::series::{Sample, SeriesId};
use chrono::{DateTime, Utc};

/// Default number of most-recent samples kept for display.
pub const DEFAULT_WINDOW: usize = 10;

/// The plottable form of a raw series: one label per value, capped at the
/// display window, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub series_id: SeriesId,
}

impl DisplaySeries {
    /// Window a raw series down to the last `window` samples, formatting each
    /// timestamp as a UTC `HH:MM:SS` label. Arrival order is trusted, never
    /// re-sorted. Fewer than `window` samples yields all of them; an empty
    /// input yields an empty series.
    pub fn from_samples(series_id: &SeriesId, samples: &[Sample], window: usize) -> Self {
        let start = samples.len().saturating_sub(window);
        let recent = &samples[start..];

        let mut labels = Vec::with_capacity(recent.len());
        let mut values = Vec::with_capacity(recent.len());
        for sample in recent {
            labels.push(format_label(sample.timestamp_ms));
            values.push(sample.value);
        }

        Self {
            labels,
            values,
            series_id: series_id.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn format_label(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        // Timestamps outside chrono's representable range
        None => "--:--:--".to_string(),
    }
}
