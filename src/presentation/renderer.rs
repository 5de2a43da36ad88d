// Chart renderer - applies bridge commands to the persistent chart surface
use crate::domain::display::DisplaySeries;
use crate::infrastructure::bridge::{BridgeView, ChartCommand};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Black-box seam to the charting library: a surface that can show a loading
/// indicator and draw one labeled line series, addressed by an instance
/// handle.
pub trait ChartBackend {
    type Handle;

    fn show_loading(&mut self);
    fn create(&mut self, series: &DisplaySeries, title: &str) -> Self::Handle;
    fn update(&mut self, handle: &mut Self::Handle, series: &DisplaySeries, title: &str);
    fn destroy(&mut self, handle: Self::Handle);
}

enum ChartState<H> {
    Absent,
    Present { handle: H, last: DisplaySeries },
}

/// Owns the one persistent chart instance. The first successful update
/// creates it; later updates mutate it in place, which is what makes the
/// line move instead of flash.
pub struct ChartRenderer<B: ChartBackend> {
    backend: B,
    state: ChartState<B::Handle>,
}

impl<B: ChartBackend> ChartRenderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ChartState::Absent,
        }
    }

    /// Show the loading indicator and destroy any existing chart instance,
    /// so resuming always performs a clean first draw instead of reviving a
    /// stale partial chart.
    pub fn apply_loading(&mut self) {
        self.backend.show_loading();
        if let ChartState::Present { handle, .. } =
            std::mem::replace(&mut self.state, ChartState::Absent)
        {
            self.backend.destroy(handle);
        }
    }

    /// Apply fresh data: lazy first draw, in-place update afterwards.
    /// Tolerates zero-length series.
    pub fn apply(&mut self, series: DisplaySeries) {
        let title = format!("Price Evolution of {} (Real Time)", series.series_id);
        match &mut self.state {
            ChartState::Absent => {
                let handle = self.backend.create(&series, &title);
                self.state = ChartState::Present {
                    handle,
                    last: series,
                };
            }
            ChartState::Present { handle, last } => {
                self.backend.update(handle, &series, &title);
                *last = series;
            }
        }
    }

    pub fn last_applied(&self) -> Option<&DisplaySeries> {
        match &self.state {
            ChartState::Present { last, .. } => Some(last),
            ChartState::Absent => None,
        }
    }
}

/// View-side task: signals readiness, then applies commands in arrival order
/// until the bridge closes. Returns the renderer with its final state.
pub async fn run_chart_view<B: ChartBackend>(
    view: BridgeView,
    mut renderer: ChartRenderer<B>,
) -> ChartRenderer<B> {
    view.confirm_ready();

    let mut commands = ReceiverStream::new(view.commands);
    while let Some(command) = commands.next().await {
        match command {
            ChartCommand::Update(series) => renderer.apply(series),
            ChartCommand::Loading | ChartCommand::Reset => renderer.apply_loading(),
        }
    }

    tracing::debug!("bridge closed, chart view exiting");
    renderer
}
