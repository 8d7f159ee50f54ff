// In-memory instrument backend shared by unit tests
use crate::application::instrument_backend::{
    BackendError, CalibrationStore, MeasurementGateway, SignalSource, StoredCalibration,
};
use crate::domain::calibration::CalibrationPoint;
use crate::domain::measurement::{
    Acknowledgement, AnalysisOutcome, AnalysisRequest, AnalysisResults, BackendHealth,
    Measurement, MeasurementCatalog, RecordingFinished, RecordingParameters,
};
use crate::domain::reading::{CycleTimeReading, SignalSample};
use async_trait::async_trait;
use chrono::DateTime;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn sample(signal_us: f64) -> SignalSample {
    SignalSample {
        signal_us,
        edge_count: 10,
        observed_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    }
}

pub fn reading(average_cycle_time_us: Option<f64>) -> CycleTimeReading {
    CycleTimeReading {
        timestamp: Some(1_700_000_000.0),
        edge_count: Some(if average_cycle_time_us.is_some() { 10 } else { 0 }),
        average_cycle_time_us,
        message: None,
    }
}

#[derive(Default)]
pub struct FakeBackend {
    calibration: Mutex<StoredCalibration>,
    saved: Mutex<Option<StoredCalibration>>,
    failure: Mutex<Option<BackendError>>,
    readings: Mutex<VecDeque<Result<CycleTimeReading, BackendError>>>,
    steady: Mutex<CycleTimeReading>,
    reads: AtomicUsize,
    recording: Mutex<Option<RecordingParameters>>,
    catalog: Mutex<MeasurementCatalog>,
    analysed: Mutex<Vec<AnalysisRequest>>,
}

impl FakeBackend {
    pub fn with_calibration(
        points: Vec<CalibrationPoint>,
        slope: Option<f64>,
        intercept: Option<f64>,
    ) -> Self {
        let backend = Self::default();
        *backend.calibration.lock().unwrap() = StoredCalibration {
            calibration_points: points,
            slope,
            intercept,
        };
        backend
    }

    /// The next backend call of any kind fails with `error`.
    pub fn fail_next_with(&self, error: BackendError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn saved_calibration(&self) -> Option<StoredCalibration> {
        self.saved.lock().unwrap().clone()
    }

    pub fn push_reading(&self, reading: Result<CycleTimeReading, BackendError>) {
        self.readings.lock().unwrap().push_back(reading);
    }

    /// Reading returned once the queued ones run out.
    pub fn set_steady_reading(&self, reading: CycleTimeReading) {
        *self.steady.lock().unwrap() = reading;
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_catalog(&self, catalog: MeasurementCatalog) {
        *self.catalog.lock().unwrap() = catalog;
    }

    pub fn active_recording(&self) -> Option<RecordingParameters> {
        self.recording.lock().unwrap().clone()
    }

    pub fn analysed(&self) -> Vec<AnalysisRequest> {
        self.analysed.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Result<(), BackendError> {
        match self.failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalibrationStore for FakeBackend {
    async fn load_calibration(&self) -> Result<StoredCalibration, BackendError> {
        self.take_failure()?;
        Ok(self.calibration.lock().unwrap().clone())
    }

    async fn save_calibration(
        &self,
        points: &[CalibrationPoint],
        slope: f64,
        intercept: f64,
    ) -> Result<String, BackendError> {
        self.take_failure()?;
        let stored = StoredCalibration {
            calibration_points: points.to_vec(),
            slope: Some(slope),
            intercept: Some(intercept),
        };
        *self.calibration.lock().unwrap() = stored.clone();
        *self.saved.lock().unwrap() = Some(stored);
        Ok("Calibration saved successfully.".to_string())
    }
}

#[async_trait]
impl SignalSource for FakeBackend {
    async fn read_cycle_time(&self) -> Result<CycleTimeReading, BackendError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        match self.readings.lock().unwrap().pop_front() {
            Some(reading) => reading,
            None => Ok(self.steady.lock().unwrap().clone()),
        }
    }
}

#[async_trait]
impl MeasurementGateway for FakeBackend {
    async fn start_recording(
        &self,
        parameters: &RecordingParameters,
    ) -> Result<Acknowledgement, BackendError> {
        self.take_failure()?;
        let mut recording = self.recording.lock().unwrap();
        if recording.is_some() {
            return Err(BackendError::Status {
                status: 400,
                detail: "Measurement already in progress.".to_string(),
            });
        }
        *recording = Some(parameters.clone());
        Ok(Acknowledgement {
            message: "Measurement recording started.".to_string(),
        })
    }

    async fn stop_recording(&self) -> Result<RecordingFinished, BackendError> {
        self.take_failure()?;
        if self.recording.lock().unwrap().take().is_none() {
            return Err(BackendError::Status {
                status: 400,
                detail: "No measurement in progress to stop.".to_string(),
            });
        }
        Ok(RecordingFinished {
            message: "Measurement recording finished.".to_string(),
            file_link: "/api/files/measurement_1700000000.csv".to_string(),
            metadata: Measurement {
                filename: "measurement_1700000000.csv".to_string(),
                created_at: 1_700_000_000.0,
                duration_ms: 5300.0,
                row_count: 53,
                file_link: None,
            },
        })
    }

    async fn list_measurements(&self) -> Result<MeasurementCatalog, BackendError> {
        self.take_failure()?;
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn analyse(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, BackendError> {
        self.take_failure()?;
        self.analysed.lock().unwrap().push(request.clone());
        Ok(AnalysisOutcome {
            message: "Analysis completed successfully.".to_string(),
            analysis_file: "/api/files/analysis_1700000100.png".to_string(),
            results: AnalysisResults {
                ks_linear: Some(0.00012),
                ks_linear_r_squared: Some(0.97),
                ..Default::default()
            },
        })
    }

    async fn health(&self) -> Result<BackendHealth, BackendError> {
        self.take_failure()?;
        Ok(BackendHealth {
            status: "ok".to_string(),
            pigpio_connected: true,
        })
    }
}
