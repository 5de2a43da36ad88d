// Console chart surface - renders the chart lifecycle as structured log lines
use super::renderer::ChartBackend;
use crate::domain::display::DisplaySeries;

/// Chart surface backed by the process log. Each created chart gets a fresh
/// instance id so first draws and in-place updates stay distinguishable.
#[derive(Debug, Default)]
pub struct ConsoleChart {
    next_instance: u64,
}

impl ChartBackend for ConsoleChart {
    type Handle = u64;

    fn show_loading(&mut self) {
        tracing::info!("chart hidden, loading indicator shown");
    }

    fn create(&mut self, series: &DisplaySeries, title: &str) -> u64 {
        self.next_instance += 1;
        tracing::info!(
            chart = self.next_instance,
            title,
            points = series.len(),
            latest = %latest_point(series),
            "drawing new chart"
        );
        self.next_instance
    }

    fn update(&mut self, handle: &mut u64, series: &DisplaySeries, title: &str) {
        tracing::info!(
            chart = *handle,
            title,
            points = series.len(),
            latest = %latest_point(series),
            "updating chart in place"
        );
    }

    fn destroy(&mut self, handle: u64) {
        tracing::debug!(chart = handle, "chart instance destroyed");
    }
}

fn latest_point(series: &DisplaySeries) -> String {
    match (series.labels.last(), series.values.last()) {
        (Some(label), Some(value)) => format!("{label} {value}"),
        _ => "none".to_string(),
    }
}
