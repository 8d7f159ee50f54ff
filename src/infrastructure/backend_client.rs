// HTTP client for the instrument backend
use crate::application::instrument_backend::{
    BackendError, CalibrationStore, MeasurementGateway, SignalSource, StoredCalibration,
};
use crate::domain::calibration::CalibrationPoint;
use crate::domain::measurement::{
    Acknowledgement, AnalysisOutcome, AnalysisRequest, BackendHealth, MeasurementCatalog,
    RecordingFinished, RecordingParameters,
};
use crate::domain::reading::CycleTimeReading;
use crate::infrastructure::auth::RequestSigner;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    signer: RequestSigner,
}

#[derive(Serialize)]
struct SaveCalibrationBody<'a> {
    calibration_points: &'a [CalibrationPoint],
    slope: f64,
    intercept: f64,
}

/// FastAPI puts error text in `detail`.
#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        signer: RequestSigner,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("perm-dashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            signer,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        self.signer.sign(self.client.request(method, url))
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Transport(format!("request timed out: {}", e))
            } else {
                BackendError::Transport(e.to_string())
            }
        })?;

        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody {
                detail: serde_json::Value::String(detail),
            }) => detail,
            Ok(ErrorBody { detail }) => detail.to_string(),
            Err(_) => body,
        };
        tracing::debug!("Backend returned {}: {}", status, detail);

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthenticated);
        }
        Err(BackendError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let request = self.request(Method::GET, path)?;
        self.execute(request).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, BackendError> {
        let mut request = self.request(Method::POST, path)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await
    }
}

#[async_trait]
impl CalibrationStore for HttpBackend {
    async fn load_calibration(&self) -> Result<StoredCalibration, BackendError> {
        self.get("/api/calibration").await
    }

    async fn save_calibration(
        &self,
        points: &[CalibrationPoint],
        slope: f64,
        intercept: f64,
    ) -> Result<String, BackendError> {
        let body = SaveCalibrationBody {
            calibration_points: points,
            slope,
            intercept,
        };
        let ack: Acknowledgement = self.post("/api/calibration/save", Some(&body)).await?;
        Ok(ack.message)
    }
}

#[async_trait]
impl SignalSource for HttpBackend {
    async fn read_cycle_time(&self) -> Result<CycleTimeReading, BackendError> {
        self.get("/api/cycle_time").await
    }
}

#[async_trait]
impl MeasurementGateway for HttpBackend {
    async fn start_recording(
        &self,
        parameters: &RecordingParameters,
    ) -> Result<Acknowledgement, BackendError> {
        self.post("/api/measurements/start", Some(parameters)).await
    }

    async fn stop_recording(&self) -> Result<RecordingFinished, BackendError> {
        self.post::<(), _>("/api/measurements/stop", None).await
    }

    async fn list_measurements(&self) -> Result<MeasurementCatalog, BackendError> {
        self.get("/api/measurements").await
    }

    async fn analyse(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, BackendError> {
        self.post("/api/measurements/analyse", Some(request)).await
    }

    async fn health(&self) -> Result<BackendHealth, BackendError> {
        self.get("/api/health").await
    }
}
