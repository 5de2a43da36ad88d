// Update scheduler - owns the repeating timer and the fetch-transform-render cycle
use crate::application::market_data::{FetchError, MarketDataSource};
use crate::domain::display::DisplaySeries;
use crate::domain::series::{Lookback, SeriesId};
use crate::infrastructure::bridge::Bridge;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Snapshot of the scheduler's externally visible state.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerState {
    pub running: bool,
    pub interval_ms: u64,
    pub current_series_id: SeriesId,
}

/// Drives periodic fetch-transform-render cycles for the currently selected
/// series. Ticks fire on a fixed wall-clock interval independent of cycle
/// completion; overlapping cycles are allowed and made safe by a per-cycle
/// sequence token: a cycle may touch the view only by atomically claiming
/// `applied_seq` with a strictly newer token, so a slow cycle can never
/// overwrite the output of a faster, later-started one.
pub struct UpdateScheduler {
    source: Arc<dyn MarketDataSource>,
    bridge: Bridge,
    interval: Duration,
    window: usize,
    lookback: Lookback,
    current_series: SeriesId,
    running: Arc<AtomicBool>,
    issued_seq: Arc<AtomicU64>,
    applied_seq: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
}

impl UpdateScheduler {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        bridge: Bridge,
        initial_series: SeriesId,
        interval: Duration,
        window: usize,
        lookback: Lookback,
    ) -> Self {
        Self {
            source,
            bridge,
            interval,
            window,
            lookback,
            current_series: initial_series,
            running: Arc::new(AtomicBool::new(false)),
            issued_seq: Arc::new(AtomicU64::new(0)),
            applied_seq: Arc::new(AtomicU64::new(0)),
            ticker: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState {
            running: self.running.load(Ordering::Acquire),
            interval_ms: self.interval.as_millis() as u64,
            current_series_id: self.current_series.clone(),
        }
    }

    /// Begin (or re-begin) periodic updates for `series_id`. Always re-arms
    /// the timer, so calling this while running resets the tick interval.
    /// Cycles issued before the re-arm are invalidated and can never render
    /// into the new run.
    pub fn start(&mut self, series_id: SeriesId) {
        self.current_series = series_id;
        self.disarm();

        let watermark = self.issued_seq.load(Ordering::Acquire);
        self.applied_seq.fetch_max(watermark, Ordering::AcqRel);
        self.running.store(true, Ordering::Release);

        tracing::info!(
            series = %self.current_series,
            interval_ms = self.interval.as_millis() as u64,
            "starting chart updates"
        );
        if let Err(err) = self.bridge.send_loading() {
            tracing::warn!(error = %err, "loading signal dropped");
        }

        self.ticker = Some(self.arm_ticker());
    }

    /// Disarm the timer and put the view back into its loading state.
    /// In-flight fetches are not cancelled; their render step re-checks the
    /// running flag once the fetch resolves. No-op while idle.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.disarm();

        tracing::info!(series = %self.current_series, "stopping chart updates");
        if let Err(err) = self.bridge.send_loading() {
            tracing::warn!(error = %err, "loading signal dropped");
        }
    }

    /// Switch the charted instrument. While running this re-arms the timer
    /// for the new series; while idle it only records the selection.
    pub fn select_series(&mut self, series_id: SeriesId) {
        if self.running.load(Ordering::Acquire) {
            self.start(series_id);
        } else {
            tracing::info!(series = %series_id, "series selected");
            self.current_series = series_id;
        }
    }

    fn disarm(&mut self) {
        if let Some(task) = self.ticker.take() {
            task.abort();
        }
    }

    fn arm_ticker(&self) -> JoinHandle<()> {
        let source = Arc::clone(&self.source);
        let bridge = self.bridge.clone();
        let series = self.current_series.clone();
        let lookback = self.lookback;
        let window = self.window;
        let period = self.interval;
        let running = Arc::clone(&self.running);
        let issued_seq = Arc::clone(&self.issued_seq);
        let applied_seq = Arc::clone(&self.applied_seq);

        tokio::spawn(async move {
            // First tick one full interval after arming; start() already put
            // the view into its loading state to cover the gap.
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !running.load(Ordering::Acquire) {
                    break;
                }
                let seq = issued_seq.fetch_add(1, Ordering::AcqRel) + 1;
                tokio::spawn(run_cycle(
                    Arc::clone(&source),
                    bridge.clone(),
                    series.clone(),
                    lookback,
                    window,
                    seq,
                    Arc::clone(&applied_seq),
                    Arc::clone(&running),
                ));
            }
        })
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// One fetch-transform-render cycle. The series id was captured by value at
/// tick time, so a mid-flight selection change cannot corrupt this cycle.
#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    source: Arc<dyn MarketDataSource>,
    bridge: Bridge,
    series_id: SeriesId,
    lookback: Lookback,
    window: usize,
    seq: u64,
    applied_seq: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
) {
    tracing::debug!(series = %series_id, seq, "fetching market data");
    let result = source.fetch_market_chart(&series_id, lookback).await;

    // The fetch may have outlived a stop() or a newer cycle; re-check both
    // gates before touching the view.
    if !running.load(Ordering::Acquire) {
        tracing::debug!(seq, "cycle resolved after stop, dropping");
        return;
    }
    if !claim_render_slot(&applied_seq, seq) {
        tracing::debug!(seq, "cycle superseded by a newer one, dropping");
        return;
    }

    match result {
        Ok(samples) => {
            let display = DisplaySeries::from_samples(&series_id, &samples, window);
            let point_count = display.len();
            tracing::info!(
                series = %series_id,
                seq,
                points = point_count,
                "applying chart update"
            );
            if let Err(err) = bridge.send_update(display) {
                tracing::warn!(seq, error = %err, "chart update dropped");
            }
        }
        Err(err) => {
            match &err {
                FetchError::Transport(_) => {
                    tracing::warn!(series = %series_id, seq, error = %err, "cycle failed in transport")
                }
                FetchError::HttpStatus { status } => {
                    tracing::warn!(series = %series_id, seq, status, "cycle failed with upstream status")
                }
                FetchError::Schema(_) => {
                    tracing::error!(series = %series_id, seq, error = %err, "upstream broke the data contract")
                }
            }
            // The user sees an explicit no-fresh-data state instead of a
            // silently stale chart; the next tick retries on its own.
            if let Err(send_err) = bridge.send_loading() {
                tracing::warn!(seq, error = %send_err, "loading signal dropped");
            }
        }
    }
}

/// Claim the render slot for `seq`. Succeeds only if `seq` is strictly newer
/// than the last applied cycle, so out-of-order completions are discarded.
fn claim_render_slot(applied_seq: &AtomicU64, seq: u64) -> bool {
    applied_seq
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            (seq > current).then_some(seq)
        })
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::Sample;
    use crate::infrastructure::bridge::{self, BridgeView, ChartCommand};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::timeout;

    /// Scripted source: the n-th call sleeps, then returns the n-th step.
    /// Calls past the end of the script repeat the last step.
    struct ScriptedSource {
        steps: Vec<(Duration, Option<Vec<Sample>>)>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(steps: Vec<(Duration, Option<Vec<Sample>>)>) -> Self {
            assert!(!steps.is_empty());
            Self {
                steps,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MarketDataSource for ScriptedSource {
        async fn fetch_market_chart(
            &self,
            _series_id: &SeriesId,
            _lookback: Lookback,
        ) -> Result<Vec<Sample>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, outcome) = self
                .steps
                .get(call)
                .unwrap_or_else(|| self.steps.last().unwrap())
                .clone();
            time::sleep(delay).await;
            match outcome {
                Some(samples) => Ok(samples),
                None => Err(FetchError::Schema("missing `prices` field".to_string())),
            }
        }
    }

    fn scheduler_with(
        steps: Vec<(Duration, Option<Vec<Sample>>)>,
        interval: Duration,
    ) -> (UpdateScheduler, BridgeView) {
        let (bridge, view) = bridge::channel(16);
        view.confirm_ready();
        let scheduler = UpdateScheduler::new(
            Arc::new(ScriptedSource::new(steps)),
            bridge,
            SeriesId::new("bitcoin"),
            interval,
            10,
            Lookback::default(),
        );
        (scheduler, view)
    }

    fn sample_batch(value: f64) -> Vec<Sample> {
        vec![Sample::new(0, value), Sample::new(60_000, value + 1.0)]
    }

    async fn expect_command(view: &mut BridgeView) -> ChartCommand {
        timeout(Duration::from_secs(120), view.commands.recv())
            .await
            .expect("timed out waiting for bridge command")
            .expect("bridge closed unexpectedly")
    }

    #[tokio::test(start_paused = true)]
    async fn select_while_idle_records_series_without_side_effects() {
        let (mut scheduler, mut view) =
            scheduler_with(vec![(Duration::from_secs(1), None)], Duration::from_secs(30));

        scheduler.select_series(SeriesId::new("ethereum"));

        let state = scheduler.state();
        assert!(!state.running);
        assert_eq!(state.current_series_id, SeriesId::new("ethereum"));
        assert!(scheduler.ticker.is_none());
        assert!(view.commands.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn start_issues_loading_and_then_applies_updates() {
        let steps = vec![(Duration::from_secs(1), Some(sample_batch(100.0)))];
        let (mut scheduler, mut view) = scheduler_with(steps, Duration::from_secs(30));

        scheduler.start(SeriesId::new("bitcoin"));
        assert!(scheduler.state().running);

        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));
        match expect_command(&mut view).await {
            ChartCommand::Update(series) => {
                assert_eq!(series.series_id, SeriesId::new("bitcoin"));
                assert_eq!(series.values, vec![100.0, 101.0]);
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let steps = vec![(Duration::from_secs(1), Some(sample_batch(1.0)))];
        let (mut scheduler, mut view) = scheduler_with(steps, Duration::from_secs(30));

        scheduler.start(SeriesId::new("bitcoin"));
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));

        scheduler.stop();
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));
        assert!(!scheduler.state().running);

        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.state().running);
        assert!(view.commands.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_switches_series() {
        let steps = vec![(Duration::from_secs(1), Some(sample_batch(1.0)))];
        let (mut scheduler, mut view) = scheduler_with(steps, Duration::from_secs(30));

        scheduler.start(SeriesId::new("bitcoin"));
        scheduler.start(SeriesId::new("cardano"));

        let state = scheduler.state();
        assert!(state.running);
        assert_eq!(state.current_series_id, SeriesId::new("cardano"));

        // One loading command per (re)start
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_signals_loading_and_keeps_running() {
        let steps = vec![(Duration::from_secs(1), None)];
        let (mut scheduler, mut view) = scheduler_with(steps, Duration::from_secs(30));

        scheduler.start(SeriesId::new("bitcoin"));
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));

        // The first tick fails with a schema error and resets to loading.
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));
        assert!(scheduler.state().running);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stale_cycle_never_overwrites_newer_one() {
        // Cycle 1 takes 40s; cycle 2 starts 30s in and takes 5s. The chart
        // must end up with cycle 2's data even though cycle 1 resolves later.
        let steps = vec![
            (Duration::from_secs(40), Some(sample_batch(1.0))),
            (Duration::from_secs(5), Some(sample_batch(2.0))),
        ];
        let (mut scheduler, mut view) = scheduler_with(steps, Duration::from_secs(30));

        scheduler.start(SeriesId::new("bitcoin"));
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));

        // First applied render is cycle 2's (t=65s).
        match expect_command(&mut view).await {
            ChartCommand::Update(series) => assert_eq!(series.values, vec![2.0, 3.0]),
            other => panic!("expected update, got {other:?}"),
        }

        // Cycle 1 resolves at t=70s and must be discarded: nothing further
        // arrives before cycle 3 could possibly report (t=95s).
        let quiet = timeout(Duration::from_secs(20), view.commands.recv()).await;
        assert!(quiet.is_err(), "stale cycle leaked a render: {quiet:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_resolving_after_stop_renders_nothing() {
        let steps = vec![(Duration::from_secs(10), Some(sample_batch(1.0)))];
        let (mut scheduler, mut view) = scheduler_with(steps, Duration::from_secs(30));

        scheduler.start(SeriesId::new("bitcoin"));
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));

        // Let the first tick fire (t=30s), then stop mid-fetch.
        time::sleep(Duration::from_secs(32)).await;
        scheduler.stop();
        assert!(matches!(expect_command(&mut view).await, ChartCommand::Loading));

        // The in-flight fetch resolves at t=40s but must not render.
        let quiet = timeout(Duration::from_secs(60), view.commands.recv()).await;
        assert!(quiet.is_err(), "cycle rendered after stop: {quiet:?}");
    }
}
