// HTTP request handlers - the control surface standing in for the desktop shell
use crate::domain::series::SeriesId;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct StartQuery {
    pub series: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current scheduler state snapshot
pub async fn chart_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let scheduler = state.scheduler.lock().await;
    Json(scheduler.state())
}

/// Begin periodic updates, optionally switching series first
pub async fn start_updates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StartQuery>,
) -> Response {
    let mut scheduler = state.scheduler.lock().await;

    let series_id = match query.series {
        Some(series) => {
            let id = SeriesId::new(series);
            if id.is_empty() {
                return bad_request("series id must not be empty");
            }
            id
        }
        None => scheduler.state().current_series_id,
    };

    scheduler.start(series_id);
    Json(scheduler.state()).into_response()
}

/// Stop periodic updates
pub async fn stop_updates(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut scheduler = state.scheduler.lock().await;
    scheduler.stop();
    Json(scheduler.state())
}

/// Switch the charted series
pub async fn select_series(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let series_id = SeriesId::new(id);
    if series_id.is_empty() {
        return bad_request("series id must not be empty");
    }

    let mut scheduler = state.scheduler.lock().await;
    scheduler.select_series(series_id);
    Json(scheduler.state()).into_response()
}

fn bad_request(message: &'static str) -> Response {
    (StatusCode::BAD_REQUEST, message).into_response()
}
