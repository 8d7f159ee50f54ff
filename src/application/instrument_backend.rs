// Ports for the instrument backend (calibration store, live signal, recordings)
use crate::domain::calibration::CalibrationPoint;
use crate::domain::measurement::{
    Acknowledgement, AnalysisOutcome, AnalysisRequest, BackendHealth, MeasurementCatalog,
    RecordingFinished, RecordingParameters,
};
use crate::domain::reading::CycleTimeReading;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend credentials are missing")]
    Unauthenticated,
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend responded with {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Calibration as the backend stores it. Slope and intercept are absent when
/// nothing has been saved with them yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCalibration {
    #[serde(default)]
    pub calibration_points: Vec<CalibrationPoint>,
    #[serde(default)]
    pub slope: Option<f64>,
    #[serde(default)]
    pub intercept: Option<f64>,
}

#[async_trait]
pub trait CalibrationStore: Send + Sync {
    async fn load_calibration(&self) -> Result<StoredCalibration, BackendError>;

    /// Returns the backend's confirmation message.
    async fn save_calibration(
        &self,
        points: &[CalibrationPoint],
        slope: f64,
        intercept: f64,
    ) -> Result<String, BackendError>;
}

#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Latest averaged cycle time as reported by the backend.
    async fn read_cycle_time(&self) -> Result<CycleTimeReading, BackendError>;
}

#[async_trait]
pub trait MeasurementGateway: Send + Sync {
    async fn start_recording(
        &self,
        parameters: &RecordingParameters,
    ) -> Result<Acknowledgement, BackendError>;

    async fn stop_recording(&self) -> Result<RecordingFinished, BackendError>;

    async fn list_measurements(&self) -> Result<MeasurementCatalog, BackendError>;

    async fn analyse(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, BackendError>;

    async fn health(&self) -> Result<BackendHealth, BackendError>;
}
