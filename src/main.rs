// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post, put},
    Router,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::application::scheduler::UpdateScheduler;
use crate::domain::series::{Lookback, SeriesId};
use crate::infrastructure::bridge;
use crate::infrastructure::coingecko::CoinGeckoClient;
use crate::infrastructure::config::load_chart_config;
use crate::presentation::app_state::AppState;
use crate::presentation::console::ConsoleChart;
use crate::presentation::handlers::{
    chart_status, health_check, select_series, start_updates, stop_updates,
};
use crate::presentation::renderer::{run_chart_view, ChartRenderer};

const BRIDGE_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_chart_config()?;
    let settings = config.chart;

    // Market data client (infrastructure layer)
    let source = Arc::new(CoinGeckoClient::new(
        settings.api_base_url.clone(),
        Duration::from_secs(settings.request_timeout_secs),
    )?);

    // Bridge and the persistent chart view task
    let (bridge, view) = bridge::channel(BRIDGE_CAPACITY);
    tokio::spawn(run_chart_view(view, ChartRenderer::new(ConsoleChart::default())));

    // Scheduler (application layer)
    let default_series = SeriesId::new(settings.default_series.as_str());
    let mut scheduler = UpdateScheduler::new(
        source,
        bridge.clone(),
        default_series.clone(),
        Duration::from_millis(settings.update_interval_ms),
        settings.window_size,
        Lookback::days(settings.lookback_days),
    );

    // Gate the first commands on the view being up, then chart the default
    // series right away.
    bridge.ready().await;
    scheduler.start(default_series);

    // Create application state
    let state = Arc::new(AppState {
        scheduler: Mutex::new(scheduler),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/chart/status", get(chart_status))
        .route("/chart/start", post(start_updates))
        .route("/chart/stop", post(stop_updates))
        .route("/chart/series/:id", put(select_series))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = settings.listen_addr.parse()?;
    tracing::info!(%addr, "starting crypto-chart service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
