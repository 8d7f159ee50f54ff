// Measurement service - use cases for recording and analysing measurements
use crate::application::calibration_service::CalibrationService;
use crate::application::instrument_backend::{BackendError, MeasurementGateway};
use crate::domain::measurement::{
    Acknowledgement, AnalysisOutcome, AnalysisRequest, BackendHealth, MeasurementCatalog,
    RecordingFinished, RecordingParameters,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct MeasurementService {
    gateway: Arc<dyn MeasurementGateway>,
    calibration: CalibrationService,
}

impl MeasurementService {
    pub fn new(gateway: Arc<dyn MeasurementGateway>, calibration: CalibrationService) -> Self {
        Self {
            gateway,
            calibration,
        }
    }

    /// Start recording with the active calibration so the backend can convert
    /// cycle times to levels as it writes rows.
    pub async fn start(&self) -> Result<Acknowledgement, BackendError> {
        let model = self.calibration.active_model().await;
        let parameters = RecordingParameters {
            calibration_slope: model.slope,
            calibration_intercept: model.intercept,
        };
        let ack = self.gateway.start_recording(&parameters).await?;
        tracing::info!(
            slope = model.slope,
            intercept = model.intercept,
            "Measurement recording started"
        );
        Ok(ack)
    }

    pub async fn stop(&self) -> Result<RecordingFinished, BackendError> {
        let finished = self.gateway.stop_recording().await?;
        tracing::info!(
            "Measurement recording finished: {} ({} rows)",
            finished.metadata.filename,
            finished.metadata.row_count
        );
        Ok(finished)
    }

    pub async fn list(&self) -> Result<MeasurementCatalog, BackendError> {
        Ok(self.gateway.list_measurements().await?.sorted())
    }

    pub async fn analyse(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, BackendError> {
        request.validate().map_err(BackendError::InvalidRequest)?;
        self.gateway.analyse(&request).await
    }

    pub async fn backend_health(&self) -> Result<BackendHealth, BackendError> {
        self.gateway.health().await
    }
}
