// HTTP request handlers
use crate::application::calibration_service::{SaveOutcome, SessionSnapshot};
use crate::domain::calibration::CalibrationPoint;
use crate::domain::measurement::{
    Acknowledgement, AnalysisOutcome, AnalysisRequest, BackendHealth, MeasurementCatalog,
    RecordingFinished,
};
use crate::domain::reading::LevelReading;
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
pub struct SignalUpdate {
    pub signal: f64,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn backend_health(State(state): State<Arc<AppState>>) -> ApiResult<BackendHealth> {
    Ok(Json(state.measurements.backend_health().await?))
}

pub async fn get_calibration(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.calibration.snapshot().await)
}

pub async fn reload_calibration(State(state): State<Arc<AppState>>) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.calibration.load().await?))
}

pub async fn arm_point(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.calibration.arm(index).await?))
}

pub async fn disarm_point(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.calibration.disarm().await)
}

/// Measure the armed point with the latest live signal
pub async fn capture_signal(State(state): State<Arc<AppState>>) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.calibration.capture_latest().await?))
}

pub async fn update_point(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
    Json(update): Json<SignalUpdate>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.calibration.set_point_signal(index, update.signal).await?))
}

pub async fn add_point(
    State(state): State<Arc<AppState>>,
    Json(point): Json<CalibrationPoint>,
) -> Json<SessionSnapshot> {
    Json(state.calibration.add_point(point).await)
}

pub async fn remove_point(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.calibration.remove_point(index).await?))
}

pub async fn save_calibration(State(state): State<Arc<AppState>>) -> ApiResult<SaveOutcome> {
    Ok(Json(state.calibration.save().await?))
}

pub async fn current_level(State(state): State<Arc<AppState>>) -> ApiResult<LevelReading> {
    Ok(Json(state.calibration.latest_level().await?))
}

/// Server-sent events carrying a level reading for every new live signal
pub async fn stream_levels(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let calibration = state.calibration.clone();
    let mut signals = calibration.subscribe_signals();
    let mut shutdown = state.shutdown.clone();

    let stream = async_stream::stream! {
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            let sample = *signals.borrow_and_update();
            if let Some(sample) = sample {
                let level = calibration.level_for(&sample).await;
                match Event::default().event("level").json_data(level) {
                    Ok(event) => yield Ok::<_, Infallible>(event),
                    Err(e) => tracing::warn!("Could not encode level event: {}", e),
                }
            }
            tokio::select! {
                changed = signals.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    tracing::debug!("Closing level stream for shutdown");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn start_measurement(State(state): State<Arc<AppState>>) -> ApiResult<Acknowledgement> {
    Ok(Json(state.measurements.start().await?))
}

pub async fn stop_measurement(State(state): State<Arc<AppState>>) -> ApiResult<RecordingFinished> {
    Ok(Json(state.measurements.stop().await?))
}

pub async fn list_measurements(State(state): State<Arc<AppState>>) -> ApiResult<MeasurementCatalog> {
    Ok(Json(state.measurements.list().await?))
}

pub async fn analyse_measurement(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult<AnalysisOutcome> {
    Ok(Json(state.measurements.analyse(request).await?))
}
