// Application state for HTTP handlers
use crate::application::calibration_service::CalibrationService;
use crate::application::measurement_service::MeasurementService;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub calibration: CalibrationService,
    pub measurements: MeasurementService,
    /// Flips to `true` once the server starts shutting down; long-lived streams end on it.
    pub shutdown: watch::Receiver<bool>,
}
