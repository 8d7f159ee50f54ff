// Router for the dashboard API
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_point, analyse_measurement, arm_point, backend_health, capture_signal, current_level,
    disarm_point, get_calibration, health_check, list_measurements, reload_calibration,
    remove_point, save_calibration, start_measurement, stop_measurement, stream_levels,
    update_point,
};
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/backend/health", get(backend_health))
        .route("/calibration", get(get_calibration))
        .route("/calibration/reload", post(reload_calibration))
        .route("/calibration/arm/:index", post(arm_point))
        .route("/calibration/disarm", post(disarm_point))
        .route("/calibration/capture", post(capture_signal))
        .route("/calibration/points", post(add_point))
        .route("/calibration/points/:index", delete(remove_point).put(update_point))
        .route("/calibration/save", post(save_calibration))
        .route("/level", get(current_level))
        .route("/level/stream", get(stream_levels))
        .route("/measurements", get(list_measurements))
        .route("/measurements/start", post(start_measurement))
        .route("/measurements/stop", post(stop_measurement))
        .route("/measurements/analyse", post(analyse_measurement))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
